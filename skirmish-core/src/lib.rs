//! Turn-based combat encounters narrated by a remote text generator.
//!
//! This crate provides:
//! - A combatant registry with fuzzy name resolution
//! - Dice, attack rolls and HP bookkeeping that the code owns, not the narrator
//! - Narrative extraction: spawns, attacks and damage/heal cues found in prose
//! - Intent/Effect rules system for deterministic game state
//! - A turn orchestrator that chains autonomous actors and pauses for humans
//! - Timer driven auto-play on tokio
//!
//! # Quick Start
//!
//! ```ignore
//! use skirmish_core::{EncounterConfig, HaltReason};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EncounterConfig::from_env()?.with_human_players(1);
//!     let orchestrator = config.orchestrator()?;
//!     let mut encounter = config.build_encounter(&mut rand::thread_rng())?;
//!
//!     let report = orchestrator.advance(&mut encounter).await?;
//!     if let HaltReason::AwaitingHuman(_) = report.halt {
//!         orchestrator.submit(&mut encounter, "I attack the Goblin!").await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod bestiary;
pub mod class_data;
pub mod combat;
pub mod combatant;
pub mod config;
pub mod dice;
pub mod encounter;
pub mod narrative;
pub mod orchestrator;
pub mod party;
pub mod registry;
pub mod rules;
pub mod scheduler;
pub mod testing;

// Primary public API
pub use combatant::{CharacterClass, Combatant, CombatantId, CombatantKind};
pub use config::{ConfigError, EncounterConfig};
pub use encounter::{
    Actor, Disposition, Encounter, EncounterBuilder, SetupError, TranscriptEntry, TurnState,
};
pub use orchestrator::{HaltReason, Narrator, Orchestrator, ResolvedTurn, TurnError, TurnReport};
pub use registry::{Registry, RegistryError};
pub use rules::{Effect, Intent, RulesEngine};
pub use scheduler::{AutoPlay, SharedEncounter, StopReason};
pub use testing::{MockNarrator, TestHarness};

// Re-export the wire types narrators speak
pub use narrator::{TurnRequest, Webhook};
