//! Dice rolling.
//!
//! Supports the plain `NdM` notation used for weapon and monster damage,
//! single d20 rolls and ability modifiers. Every roll has a `_with_rng`
//! variant so an encounter can drive all of its dice from one source.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for dice parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("Invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("Dice count must be at least 1 (in {0})")]
    NoDice(String),
    #[error("Die must have at least one side (in {0})")]
    InvalidDieSize(String),
}

/// A parsed `NdM` expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DamageDice {
    pub count: u32,
    pub sides: u32,
}

impl DamageDice {
    pub const fn new(count: u32, sides: u32) -> Self {
        Self { count, sides }
    }

    /// Parse strict `NdM` notation. Surrounding whitespace and an upper-case
    /// `D` are accepted; modifiers and implicit counts are not.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let notation = notation.trim().to_lowercase();
        let invalid = || DiceError::InvalidNotation(notation.clone());

        let (count_str, sides_str) = notation.split_once('d').ok_or_else(invalid)?;
        if count_str.is_empty()
            || sides_str.is_empty()
            || !count_str.bytes().all(|b| b.is_ascii_digit())
            || !sides_str.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let count: u32 = count_str.parse().map_err(|_| invalid())?;
        let sides: u32 = sides_str.parse().map_err(|_| invalid())?;

        if count == 0 {
            return Err(DiceError::NoDice(notation));
        }
        if sides == 0 {
            return Err(DiceError::InvalidDieSize(notation));
        }

        Ok(Self { count, sides })
    }

    /// Roll with the thread-local generator.
    pub fn roll(&self) -> RollResult {
        self.roll_with_rng(&mut rand::thread_rng())
    }

    /// Roll with a specific RNG.
    pub fn roll_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> RollResult {
        let rolls: Vec<u32> = (0..self.count)
            .map(|_| rng.gen_range(1..=self.sides))
            .collect();
        let total = rolls.iter().map(|&r| r as i32).sum();
        RollResult { rolls, total }
    }

    pub fn min(&self) -> i32 {
        self.count as i32
    }

    pub fn max(&self) -> i32 {
        (self.count * self.sides) as i32
    }
}

impl FromStr for DamageDice {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DamageDice::parse(s)
    }
}

impl fmt::Display for DamageDice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)
    }
}

/// Individual dice plus their sum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollResult {
    pub rolls: Vec<u32>,
    pub total: i32,
}

impl RollResult {
    /// The result reported for unparseable notation.
    pub fn zero() -> Self {
        Self {
            rolls: vec![0],
            total: 0,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.total == 0 && self.rolls.iter().all(|&r| r == 0)
    }

    /// Format the dice for display, e.g. `[3, 5]`.
    pub fn dice_display(&self) -> String {
        format!(
            "[{}]",
            self.rolls
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl fmt::Display for RollResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.dice_display(), self.total)
    }
}

/// Roll dice from a notation string.
///
/// Malformed notation never fails: it yields a single zero roll so a bad
/// damage string cannot abort a turn.
pub fn roll_dice(notation: &str) -> RollResult {
    roll_dice_with_rng(notation, &mut rand::thread_rng())
}

pub fn roll_dice_with_rng<R: Rng + ?Sized>(notation: &str, rng: &mut R) -> RollResult {
    match DamageDice::parse(notation) {
        Ok(dice) => dice.roll_with_rng(rng),
        Err(e) => {
            tracing::debug!("{e}; rolling zero");
            RollResult::zero()
        }
    }
}

/// Roll a single d20.
pub fn roll_d20() -> u32 {
    roll_d20_with_rng(&mut rand::thread_rng())
}

pub fn roll_d20_with_rng<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.gen_range(1..=20)
}

/// Check if a d20 roll is a natural 20 (critical hit).
pub fn is_critical(roll: u32) -> bool {
    roll == 20
}

/// Check if a d20 roll is a natural 1 (fumble).
pub fn is_fumble(roll: u32) -> bool {
    roll == 1
}

/// Ability modifier for a score: `floor((score - 10) / 2)`.
pub fn ability_modifier(score: i32) -> i32 {
    // div_euclid floors for a positive divisor: score 9 -> -1, score 1 -> -5
    (score - 10).div_euclid(2)
}
