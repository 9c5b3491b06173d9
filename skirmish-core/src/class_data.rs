//! Level 1 class data used to build party members.
//!
//! Each class carries its hit die, a signature weapon, an armour profile,
//! the order in which the standard array is assigned, and the actions the
//! narrator may choose from.

use crate::combatant::{Ability, AbilityScores, CharacterClass};
use crate::dice::{ability_modifier, DamageDice};

/// Standard array values (15, 14, 13, 12, 10, 8), assigned by class priority.
pub const STANDARD_ARRAY: [u8; 6] = [15, 14, 13, 12, 10, 8];

/// How a class computes its armor class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmorProfile {
    /// 10 + DEX + the given secondary ability (Unarmored Defense).
    Unarmored(Option<Ability>),
    /// Light armour: base + DEX.
    Light(i32),
    /// Medium armour: base + DEX (max 2).
    Medium(i32),
    /// Heavy armour: flat base.
    Heavy(i32),
}

impl ArmorProfile {
    pub fn armor_class(&self, scores: &AbilityScores) -> i32 {
        let dex = scores.modifier(Ability::Dexterity);
        match *self {
            ArmorProfile::Unarmored(None) => 10 + dex,
            ArmorProfile::Unarmored(Some(extra)) => 10 + dex + scores.modifier(extra),
            ArmorProfile::Light(base) => base + dex,
            ArmorProfile::Medium(base) => base + dex.min(2),
            ArmorProfile::Heavy(base) => base,
        }
    }
}

/// Class-specific data for building a level 1 character.
#[derive(Debug, Clone)]
pub struct ClassData {
    /// Hit die maximum; level 1 HP is this plus the CON modifier.
    pub hit_die: i32,
    /// Signature weapon or cantrip.
    pub weapon: &'static str,
    /// Damage notation of the signature weapon.
    pub damage: DamageDice,
    pub armor: ArmorProfile,
    /// Abilities from most to least important.
    pub ability_priority: [Ability; 6],
    /// Actions offered to the narrator.
    pub actions: &'static [&'static str],
}

impl CharacterClass {
    /// Get class data for character creation.
    pub fn data(&self) -> ClassData {
        use Ability::*;
        match self {
            CharacterClass::Barbarian => ClassData {
                hit_die: 12,
                weapon: "Greataxe",
                damage: DamageDice::new(1, 12),
                armor: ArmorProfile::Unarmored(Some(Constitution)),
                ability_priority: [Strength, Constitution, Dexterity, Wisdom, Charisma, Intelligence],
                actions: &["Attack", "Rage", "Reckless Attack", "Dodge"],
            },
            CharacterClass::Bard => ClassData {
                hit_die: 8,
                weapon: "Rapier",
                damage: DamageDice::new(1, 8),
                armor: ArmorProfile::Light(11),
                ability_priority: [Charisma, Dexterity, Constitution, Wisdom, Intelligence, Strength],
                actions: &["Attack", "Cast Spell", "Bardic Inspiration", "Hide"],
            },
            CharacterClass::Cleric => ClassData {
                hit_die: 8,
                weapon: "Mace",
                damage: DamageDice::new(1, 6),
                armor: ArmorProfile::Medium(14),
                ability_priority: [Wisdom, Constitution, Strength, Charisma, Dexterity, Intelligence],
                actions: &["Attack", "Cast Spell", "Channel Divinity", "Heal"],
            },
            CharacterClass::Druid => ClassData {
                hit_die: 8,
                weapon: "Scimitar",
                damage: DamageDice::new(1, 6),
                armor: ArmorProfile::Light(11),
                ability_priority: [Wisdom, Constitution, Dexterity, Intelligence, Charisma, Strength],
                actions: &["Attack", "Cast Spell", "Wild Shape", "Hide"],
            },
            CharacterClass::Fighter => ClassData {
                hit_die: 10,
                weapon: "Longsword",
                damage: DamageDice::new(1, 8),
                armor: ArmorProfile::Heavy(16),
                ability_priority: [Strength, Constitution, Dexterity, Wisdom, Charisma, Intelligence],
                actions: &["Attack", "Second Wind", "Action Surge", "Dodge"],
            },
            CharacterClass::Monk => ClassData {
                hit_die: 8,
                weapon: "Quarterstaff",
                damage: DamageDice::new(1, 6),
                armor: ArmorProfile::Unarmored(Some(Wisdom)),
                ability_priority: [Dexterity, Wisdom, Constitution, Strength, Charisma, Intelligence],
                actions: &["Attack", "Flurry of Blows", "Dodge", "Dash"],
            },
            CharacterClass::Paladin => ClassData {
                hit_die: 10,
                weapon: "Greatsword",
                damage: DamageDice::new(2, 6),
                armor: ArmorProfile::Heavy(16),
                ability_priority: [Strength, Charisma, Constitution, Wisdom, Dexterity, Intelligence],
                actions: &["Attack", "Cast Spell", "Lay on Hands", "Smite"],
            },
            CharacterClass::Ranger => ClassData {
                hit_die: 10,
                weapon: "Longbow",
                damage: DamageDice::new(1, 8),
                armor: ArmorProfile::Medium(14),
                ability_priority: [Dexterity, Wisdom, Constitution, Strength, Intelligence, Charisma],
                actions: &["Attack", "Cast Spell", "Hide", "Track"],
            },
            CharacterClass::Rogue => ClassData {
                hit_die: 8,
                weapon: "Shortsword",
                damage: DamageDice::new(1, 6),
                armor: ArmorProfile::Light(11),
                ability_priority: [Dexterity, Constitution, Charisma, Intelligence, Wisdom, Strength],
                actions: &["Attack", "Sneak Attack", "Hide", "Dash"],
            },
            CharacterClass::Sorcerer => ClassData {
                hit_die: 6,
                weapon: "Fire Bolt",
                damage: DamageDice::new(1, 10),
                armor: ArmorProfile::Unarmored(None),
                ability_priority: [Charisma, Constitution, Dexterity, Wisdom, Intelligence, Strength],
                actions: &["Attack", "Cast Spell", "Metamagic", "Dodge"],
            },
            CharacterClass::Warlock => ClassData {
                hit_die: 8,
                weapon: "Eldritch Blast",
                damage: DamageDice::new(1, 10),
                armor: ArmorProfile::Light(11),
                ability_priority: [Charisma, Constitution, Dexterity, Wisdom, Intelligence, Strength],
                actions: &["Attack", "Cast Spell", "Eldritch Blast", "Hide"],
            },
            CharacterClass::Wizard => ClassData {
                hit_die: 6,
                weapon: "Fire Bolt",
                damage: DamageDice::new(1, 10),
                armor: ArmorProfile::Unarmored(None),
                ability_priority: [Intelligence, Constitution, Dexterity, Wisdom, Charisma, Strength],
                actions: &["Attack", "Cast Spell", "Arcane Recovery", "Dodge"],
            },
        }
    }
}

impl ClassData {
    /// Assign the standard array following the class priority.
    pub fn standard_scores(&self) -> AbilityScores {
        let mut scores = AbilityScores::default();
        for (value, ability) in STANDARD_ARRAY.iter().zip(self.ability_priority) {
            scores.set(ability, *value);
        }
        scores
    }

    /// Level 1 hit points: hit die maximum plus CON modifier, at least 1.
    pub fn level_one_hp(&self, scores: &AbilityScores) -> i32 {
        (self.hit_die + ability_modifier(scores.constitution as i32)).max(1)
    }
}

/// Actions offered to combatants without a class.
pub const DEFAULT_ACTIONS: &[&str] = &["Attack", "Dodge", "Hide"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fighter_stats() {
        let data = CharacterClass::Fighter.data();
        let scores = data.standard_scores();
        assert_eq!(scores.strength, 15);
        assert_eq!(scores.constitution, 14);
        assert_eq!(scores.intelligence, 8);
        assert_eq!(data.level_one_hp(&scores), 12);
        assert_eq!(data.armor.armor_class(&scores), 16);
    }

    #[test]
    fn test_unarmored_defense() {
        let data = CharacterClass::Monk.data();
        let scores = data.standard_scores();
        // DEX 15 (+2) and WIS 14 (+2)
        assert_eq!(data.armor.armor_class(&scores), 14);
    }

    #[test]
    fn test_medium_armor_caps_dex() {
        let scores = AbilityScores::new(10, 18, 10, 10, 10, 10);
        assert_eq!(ArmorProfile::Medium(14).armor_class(&scores), 16);
        assert_eq!(ArmorProfile::Light(11).armor_class(&scores), 15);
    }

    #[test]
    fn test_every_class_has_attack_action() {
        for class in CharacterClass::all() {
            let data = class.data();
            assert!(data.actions.contains(&"Attack"), "{class} lacks Attack");
            assert!(data.level_one_hp(&data.standard_scores()) >= 1);
        }
    }
}
