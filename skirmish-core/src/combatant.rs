//! Combatant types.
//!
//! Player characters, the Dungeon Master and monsters share one
//! representation so the registry can address all of them by name.

use crate::dice::{ability_modifier, DamageDice};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for combatants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatantId(pub Uuid);

impl CombatantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CombatantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Ability Scores
// ============================================================================

/// The six ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

/// Ability scores container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    pub strength: u8,
    pub dexterity: u8,
    pub constitution: u8,
    pub intelligence: u8,
    pub wisdom: u8,
    pub charisma: u8,
}

impl AbilityScores {
    pub fn new(str: u8, dex: u8, con: u8, int: u8, wis: u8, cha: u8) -> Self {
        Self {
            strength: str,
            dexterity: dex,
            constitution: con,
            intelligence: int,
            wisdom: wis,
            charisma: cha,
        }
    }

    pub fn get(&self, ability: Ability) -> u8 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    pub fn set(&mut self, ability: Ability, value: u8) {
        match ability {
            Ability::Strength => self.strength = value,
            Ability::Dexterity => self.dexterity = value,
            Ability::Constitution => self.constitution = value,
            Ability::Intelligence => self.intelligence = value,
            Ability::Wisdom => self.wisdom = value,
            Ability::Charisma => self.charisma = value,
        }
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        ability_modifier(self.get(ability) as i32)
    }
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self::new(10, 10, 10, 10, 10, 10)
    }
}

// ============================================================================
// Hit Points
// ============================================================================

/// Hit points. `current` stays within `[0, maximum]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitPoints {
    pub current: i32,
    pub maximum: i32,
}

impl HitPoints {
    pub fn new(maximum: i32) -> Self {
        let maximum = maximum.max(1);
        Self {
            current: maximum,
            maximum,
        }
    }

    /// Apply damage and return the amount actually removed.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let before = self.current;
        self.current = (before - amount.saturating_abs()).max(0);
        before - self.current
    }

    /// Heal and return the amount actually restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.current;
        self.current = (before.saturating_add(amount.saturating_abs())).min(self.maximum);
        self.current - before
    }

    pub fn is_down(&self) -> bool {
        self.current <= 0
    }

    pub fn restore(&mut self) {
        self.current = self.maximum;
    }
}

// ============================================================================
// Classes
// ============================================================================

/// Character classes available to party members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterClass {
    Barbarian,
    Bard,
    Cleric,
    Druid,
    Fighter,
    Monk,
    Paladin,
    Ranger,
    Rogue,
    Sorcerer,
    Warlock,
    Wizard,
}

impl CharacterClass {
    pub fn all() -> [CharacterClass; 12] {
        use CharacterClass::*;
        [
            Barbarian, Bard, Cleric, Druid, Fighter, Monk, Paladin, Ranger, Rogue, Sorcerer,
            Warlock, Wizard,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            CharacterClass::Barbarian => "Barbarian",
            CharacterClass::Bard => "Bard",
            CharacterClass::Cleric => "Cleric",
            CharacterClass::Druid => "Druid",
            CharacterClass::Fighter => "Fighter",
            CharacterClass::Monk => "Monk",
            CharacterClass::Paladin => "Paladin",
            CharacterClass::Ranger => "Ranger",
            CharacterClass::Rogue => "Rogue",
            CharacterClass::Sorcerer => "Sorcerer",
            CharacterClass::Warlock => "Warlock",
            CharacterClass::Wizard => "Wizard",
        }
    }

    /// Case-insensitive lookup by class name.
    pub fn from_name(name: &str) -> Option<CharacterClass> {
        let name = name.trim();
        Self::all()
            .into_iter()
            .find(|class| class.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Combatant
// ============================================================================

/// What kind of participant a combatant is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatantKind {
    Player,
    DungeonMaster,
    Monster,
}

impl fmt::Display for CombatantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CombatantKind::Player => "Player",
            CombatantKind::DungeonMaster => "Dungeon Master",
            CombatantKind::Monster => "Monster",
        };
        write!(f, "{name}")
    }
}

/// A participant tracked by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    pub id: CombatantId,
    pub name: String,
    pub kind: CombatantKind,
    pub class: Option<CharacterClass>,
    pub level: u8,
    pub ability_scores: AbilityScores,
    pub hit_points: HitPoints,
    pub armor_class: i32,
    pub damage: DamageDice,
}

impl Combatant {
    pub fn new(
        name: impl Into<String>,
        kind: CombatantKind,
        ability_scores: AbilityScores,
        max_hp: i32,
        armor_class: i32,
        damage: DamageDice,
    ) -> Self {
        Self {
            id: CombatantId::new(),
            name: name.into(),
            kind,
            class: None,
            level: 1,
            ability_scores,
            hit_points: HitPoints::new(max_hp),
            armor_class,
            damage,
        }
    }

    pub fn with_class(mut self, class: CharacterClass) -> Self {
        self.class = Some(class);
        self
    }

    pub fn is_alive(&self) -> bool {
        self.hit_points.current > 0
    }

    /// Attack modifier: the better of the STR and DEX modifiers.
    pub fn attack_modifier(&self) -> i32 {
        self.ability_scores
            .modifier(Ability::Strength)
            .max(self.ability_scores.modifier(Ability::Dexterity))
    }

    /// Damage notation in `NdM` form.
    pub fn damage_notation(&self) -> String {
        self.damage.to_string()
    }

    /// Display name of the class, or the kind for classless combatants.
    pub fn class_label(&self) -> String {
        match (self.class, self.kind) {
            (Some(class), _) => class.name().to_string(),
            (None, CombatantKind::DungeonMaster) => "DM".to_string(),
            (None, kind) => kind.to_string(),
        }
    }

    /// `current/max` for log lines.
    pub fn hp_display(&self) -> String {
        format!("{}/{}", self.hit_points.current, self.hit_points.maximum)
    }
}
