//! Party and Dungeon Master creation.

use crate::combatant::{AbilityScores, CharacterClass, Combatant, CombatantKind};
use crate::dice::DamageDice;
use rand::seq::SliceRandom;
use rand::Rng;

/// Name of the narrator-controlled combatant.
pub const DUNGEON_MASTER_NAME: &str = "Dungeon Master";

/// Party size when no classes are chosen.
pub const DEFAULT_PARTY_SIZE: usize = 3;

/// Names handed out to generated party members.
pub const PARTY_NAMES: [&str; 20] = [
    "Thorin", "Elara", "Grimjaw", "Lyria", "Kael", "Morgath", "Seraphina", "Draven", "Isolde",
    "Fenric", "Thalia", "Orik", "Nyssa", "Balthazar", "Rowena", "Zephyr", "Astrid", "Cormac",
    "Delphine", "Ragnar",
];

/// Build a level 1 character of the given class.
///
/// Scores follow the standard array in class priority order; HP is the hit
/// die maximum plus the CON modifier.
pub fn build_player(name: impl Into<String>, class: CharacterClass) -> Combatant {
    let data = class.data();
    let scores = data.standard_scores();
    let max_hp = data.level_one_hp(&scores);
    let armor_class = data.armor.armor_class(&scores);
    Combatant::new(name, CombatantKind::Player, scores, max_hp, armor_class, data.damage)
        .with_class(class)
}

/// Generate a party with unique names.
///
/// With no classes given, three distinct classes are picked at random.
pub fn generate_party<R: Rng + ?Sized>(classes: &[CharacterClass], rng: &mut R) -> Vec<Combatant> {
    let classes: Vec<CharacterClass> = if classes.is_empty() {
        CharacterClass::all()
            .choose_multiple(rng, DEFAULT_PARTY_SIZE)
            .copied()
            .collect()
    } else {
        classes.to_vec()
    };

    let mut names: Vec<&str> = PARTY_NAMES.to_vec();
    names.shuffle(rng);

    classes
        .into_iter()
        .enumerate()
        .map(|(i, class)| {
            let name = names
                .get(i)
                .map(|n| n.to_string())
                .unwrap_or_else(|| format!("Adventurer {}", i + 1));
            build_player(name, class)
        })
        .collect()
}

/// The narrator's own combatant: plain scores and a token stat block.
pub fn dungeon_master() -> Combatant {
    Combatant::new(
        DUNGEON_MASTER_NAME,
        CombatantKind::DungeonMaster,
        AbilityScores::default(),
        10,
        10,
        DamageDice::new(1, 4),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_random_party() {
        let mut rng = StdRng::seed_from_u64(99);
        let party = generate_party(&[], &mut rng);
        assert_eq!(party.len(), DEFAULT_PARTY_SIZE);

        let names: HashSet<&str> = party.iter().map(|c| c.name.as_str()).collect();
        let classes: HashSet<_> = party.iter().map(|c| c.class).collect();
        assert_eq!(names.len(), 3);
        assert_eq!(classes.len(), 3);
        assert!(party.iter().all(|c| c.kind == CombatantKind::Player && c.level == 1));
    }

    #[test]
    fn test_chosen_classes_kept_in_order() {
        let mut rng = StdRng::seed_from_u64(5);
        let chosen = [CharacterClass::Wizard, CharacterClass::Wizard, CharacterClass::Rogue];
        let party = generate_party(&chosen, &mut rng);
        let classes: Vec<_> = party.iter().filter_map(|c| c.class).collect();
        assert_eq!(classes, chosen.to_vec());
    }

    #[test]
    fn test_large_party_names_stay_unique() {
        let mut rng = StdRng::seed_from_u64(1);
        let party = generate_party(&[CharacterClass::Fighter; 22], &mut rng);
        let names: HashSet<&str> = party.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names.len(), 22);
    }

    #[test]
    fn test_build_wizard() {
        let wizard = build_player("Isolde", CharacterClass::Wizard);
        // INT 15, CON 14 (+2), DEX 13 (+1)
        assert_eq!(wizard.hit_points.maximum, 8);
        assert_eq!(wizard.armor_class, 11);
        assert_eq!(wizard.damage_notation(), "1d10");
        assert_eq!(wizard.attack_modifier(), 1);
    }

    #[test]
    fn test_dungeon_master() {
        let dm = dungeon_master();
        assert_eq!(dm.name, DUNGEON_MASTER_NAME);
        assert_eq!(dm.kind, CombatantKind::DungeonMaster);
        assert_eq!(dm.class_label(), "DM");
        assert_eq!(dm.hit_points.maximum, 10);
        assert_eq!(dm.armor_class, 10);
    }
}
