//! Single-attack resolution.
//!
//! Resolution is pure: it rolls dice and describes the outcome, but never
//! touches hit points. The rules pipeline applies the damage afterwards.

use crate::dice::{self, RollResult};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Outcome of one attack roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackResolution {
    /// The natural d20 face.
    pub roll: u32,
    pub modifier: i32,
    /// `roll + modifier`, reported even on a miss.
    pub total: i32,
    pub target_ac: i32,
    pub hit: bool,
    pub critical: bool,
    pub fumble: bool,
    /// One entry per damage application: empty on a miss, two on a crit.
    pub damage_rolls: Vec<RollResult>,
    pub damage: i32,
}

impl AttackResolution {
    /// Describe the roll, e.g. `rolls 14 + 2 = 16 vs AC 15: hit for 5 damage`.
    pub fn describe(&self) -> String {
        let roll = format!(
            "rolls {} {} {} = {} vs AC {}",
            self.roll,
            if self.modifier < 0 { '-' } else { '+' },
            self.modifier.abs(),
            self.total,
            self.target_ac
        );

        if self.fumble {
            format!("{roll}: natural 1, a fumble! The attack goes wide")
        } else if self.critical {
            let dice = self
                .damage_rolls
                .iter()
                .map(RollResult::dice_display)
                .collect::<Vec<_>>()
                .join(" + ");
            format!("{roll}: natural 20, CRITICAL HIT for {} damage {dice}", self.damage)
        } else if self.hit {
            let dice = self
                .damage_rolls
                .first()
                .map(RollResult::dice_display)
                .unwrap_or_default();
            format!("{roll}: hit for {} damage {dice}", self.damage)
        } else {
            format!("{roll}: miss")
        }
    }
}

/// Resolve an attack with the thread-local generator.
pub fn resolve_attack(attacker_mod: i32, damage_notation: &str, target_ac: i32) -> AttackResolution {
    resolve_attack_with_rng(attacker_mod, damage_notation, target_ac, &mut rand::thread_rng())
}

/// Resolve an attack, rolling the d20 and damage from `rng`.
pub fn resolve_attack_with_rng<R: Rng + ?Sized>(
    attacker_mod: i32,
    damage_notation: &str,
    target_ac: i32,
    rng: &mut R,
) -> AttackResolution {
    let roll = dice::roll_d20_with_rng(rng);
    resolve_attack_with_roll(roll, attacker_mod, damage_notation, target_ac, rng)
}

/// Resolve an attack for a known d20 face.
///
/// A natural 1 always misses and a natural 20 always hits. A critical hit
/// rolls the damage dice twice, independently, and sums both.
pub fn resolve_attack_with_roll<R: Rng + ?Sized>(
    roll: u32,
    attacker_mod: i32,
    damage_notation: &str,
    target_ac: i32,
    rng: &mut R,
) -> AttackResolution {
    let fumble = dice::is_fumble(roll);
    let critical = dice::is_critical(roll);
    let total = roll as i32 + attacker_mod;
    let hit = !fumble && (critical || total >= target_ac);

    let applications = match (hit, critical) {
        (false, _) => 0,
        (true, false) => 1,
        (true, true) => 2,
    };
    let damage_rolls: Vec<RollResult> = (0..applications)
        .map(|_| dice::roll_dice_with_rng(damage_notation, rng))
        .collect();
    let damage = damage_rolls.iter().map(|r| r.total).sum();

    AttackResolution {
        roll,
        modifier: attacker_mod,
        total,
        target_ac,
        hit,
        critical,
        fumble,
        damage_rolls,
        damage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_natural_one_always_fumbles() {
        let mut rng = StdRng::seed_from_u64(1);
        for modifier in [-5, 0, 5, 30] {
            let result = resolve_attack_with_roll(1, modifier, "2d6", 1, &mut rng);
            assert!(result.fumble);
            assert!(!result.hit);
            assert!(!result.critical);
            assert_eq!(result.damage, 0);
            assert!(result.damage_rolls.is_empty());
        }
    }

    #[test]
    fn test_natural_twenty_always_crits() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..50 {
            let result = resolve_attack_with_roll(20, -5, "2d6", 30, &mut rng);
            assert!(result.hit);
            assert!(result.critical);
            assert!(!result.fumble);
            assert_eq!(result.damage_rolls.len(), 2);
            for application in &result.damage_rolls {
                assert_eq!(application.rolls.len(), 2);
            }
            assert!((4..=24).contains(&result.damage));
            assert_eq!(
                result.damage,
                result.damage_rolls.iter().map(|r| r.total).sum::<i32>()
            );
        }
    }

    #[test]
    fn test_hit_when_total_meets_ac() {
        let mut rng = StdRng::seed_from_u64(3);
        let result = resolve_attack_with_roll(13, 2, "1d8", 15, &mut rng);
        assert_eq!(result.total, 15);
        assert!(result.hit);
        assert_eq!(result.damage_rolls.len(), 1);
        assert!((1..=8).contains(&result.damage));
    }

    #[test]
    fn test_miss_reports_total() {
        let mut rng = StdRng::seed_from_u64(4);
        let result = resolve_attack_with_roll(10, 2, "1d8", 15, &mut rng);
        assert_eq!(result.total, 12);
        assert!(!result.hit);
        assert!(!result.fumble);
        assert_eq!(result.damage, 0);
        assert!(result.describe().ends_with("miss"));
    }

    #[test]
    fn test_bad_notation_hits_for_zero() {
        let mut rng = StdRng::seed_from_u64(5);
        let result = resolve_attack_with_roll(18, 0, "banana", 10, &mut rng);
        assert!(result.hit);
        assert_eq!(result.damage, 0);
    }

    #[test]
    fn test_random_rolls_stay_consistent() {
        let mut rng = StdRng::seed_from_u64(6);
        for _ in 0..200 {
            let result = resolve_attack_with_rng(3, "1d6", 14, &mut rng);
            assert!((1..=20).contains(&result.roll));
            assert!(!(result.critical && result.fumble));
            if result.critical {
                assert_eq!(result.roll, 20);
            }
            if result.fumble {
                assert_eq!(result.roll, 1);
            }
        }
    }

    #[test]
    fn test_describe() {
        let mut rng = StdRng::seed_from_u64(7);
        let fumble = resolve_attack_with_roll(1, -1, "1d4", 10, &mut rng);
        assert!(fumble.describe().starts_with("rolls 1 - 1 = 0 vs AC 10"));
        assert!(fumble.describe().contains("fumble"));

        let crit = resolve_attack_with_roll(20, 2, "1d4", 10, &mut rng);
        assert!(crit.describe().contains("CRITICAL HIT"));
    }
}
