//! Monster templates the narrator can introduce into an encounter.

use crate::combatant::{AbilityScores, Combatant, CombatantKind};
use crate::dice::DamageDice;

/// Base stats cloned into every monster spawned from a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonsterTemplate {
    pub name: &'static str,
    pub plural: &'static str,
    pub strength: u8,
    pub dexterity: u8,
    pub constitution: u8,
    pub max_hp: i32,
    pub armor_class: i32,
    pub damage: DamageDice,
}

impl MonsterTemplate {
    /// Create a monster combatant with this template's stats.
    pub fn spawn(&self, name: impl Into<String>) -> Combatant {
        let scores = AbilityScores::new(self.strength, self.dexterity, self.constitution, 10, 10, 10);
        Combatant::new(
            name,
            CombatantKind::Monster,
            scores,
            self.max_hp,
            self.armor_class,
            self.damage,
        )
    }

    /// The name of the `n`th monster of this template (1-based).
    pub fn instance_name(&self, n: usize) -> String {
        if n <= 1 {
            self.name.to_string()
        } else {
            format!("{} {n}", self.name)
        }
    }
}

const fn template(
    name: &'static str,
    plural: &'static str,
    scores: (u8, u8, u8),
    max_hp: i32,
    armor_class: i32,
    damage: DamageDice,
) -> MonsterTemplate {
    MonsterTemplate {
        name,
        plural,
        strength: scores.0,
        dexterity: scores.1,
        constitution: scores.2,
        max_hp,
        armor_class,
        damage,
    }
}

/// All known templates.
pub const BESTIARY: &[MonsterTemplate] = &[
    template("Goblin", "Goblins", (8, 14, 10), 7, 15, DamageDice::new(1, 6)),
    template("Kobold", "Kobolds", (7, 15, 9), 5, 12, DamageDice::new(1, 4)),
    template("Skeleton", "Skeletons", (10, 14, 15), 13, 13, DamageDice::new(1, 6)),
    template("Zombie", "Zombies", (13, 6, 16), 22, 8, DamageDice::new(1, 6)),
    template("Wolf", "Wolves", (12, 15, 12), 11, 13, DamageDice::new(2, 4)),
    template("Bandit", "Bandits", (11, 12, 12), 11, 12, DamageDice::new(1, 6)),
    template("Orc", "Orcs", (16, 12, 16), 15, 13, DamageDice::new(1, 12)),
    template("Gnoll", "Gnolls", (14, 12, 11), 22, 15, DamageDice::new(1, 8)),
    template("Hobgoblin", "Hobgoblins", (13, 12, 12), 11, 18, DamageDice::new(1, 8)),
    template("Bugbear", "Bugbears", (15, 14, 13), 27, 16, DamageDice::new(2, 8)),
    template("Ogre", "Ogres", (19, 8, 16), 59, 11, DamageDice::new(2, 8)),
    template("Troll", "Trolls", (18, 13, 20), 84, 15, DamageDice::new(2, 6)),
];

/// Look up a template by singular or plural name, ignoring case.
pub fn find_template(name: &str) -> Option<&'static MonsterTemplate> {
    let name = name.trim();
    BESTIARY
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(name) || t.plural.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_template() {
        assert_eq!(find_template("goblin").map(|t| t.name), Some("Goblin"));
        assert_eq!(find_template("WOLVES").map(|t| t.name), Some("Wolf"));
        assert!(find_template("dragon").is_none());
    }

    #[test]
    fn test_spawn_clones_stats() {
        let orc = find_template("Orc").unwrap().spawn("Orc 2");
        assert_eq!(orc.name, "Orc 2");
        assert_eq!(orc.kind, CombatantKind::Monster);
        assert_eq!(orc.hit_points.current, 15);
        assert_eq!(orc.armor_class, 13);
        assert_eq!(orc.attack_modifier(), 3);
    }

    #[test]
    fn test_instance_names() {
        let goblin = find_template("Goblin").unwrap();
        assert_eq!(goblin.instance_name(1), "Goblin");
        assert_eq!(goblin.instance_name(3), "Goblin 3");
    }
}
