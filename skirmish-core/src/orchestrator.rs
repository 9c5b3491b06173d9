//! Turn orchestration.
//!
//! The orchestrator drives an [`Encounter`] around its turn order:
//!
//! ```text
//! AwaitingActor(i) --human--> AwaitingHuman(i) --submit--> Resolved(i)
//!        |                                                      |
//!        +--autonomous--> CallingNarrator(i) -----------> Resolved(i)
//!                                                               |
//!                                  AwaitingActor(i + 1) <-------+
//! ```
//!
//! Consecutive autonomous actors are chained inside one call, up to one
//! full lap of the turn order plus one. A failed narrator call still
//! resolves the turn, using the error description as narration, and stops
//! the chain.

use crate::combatant::CombatantKind;
use crate::encounter::{Disposition, Encounter, TurnState};
use crate::rules::{self, Effect};
use async_trait::async_trait;
use narrator::{TurnRequest, Webhook};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Produces narration for an autonomous actor.
#[async_trait]
pub trait Narrator: Send + Sync {
    async fn narrate(&self, request: &TurnRequest) -> Result<String, narrator::Error>;
}

#[async_trait]
impl Narrator for Webhook {
    async fn narrate(&self, request: &TurnRequest) -> Result<String, narrator::Error> {
        Webhook::narrate(self, request).await
    }
}

/// Errors that reject a step without changing the encounter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    #[error("No human input is pending ({0})")]
    NotAwaitingHuman(TurnState),

    #[error("No narrator is configured; set NARRATOR_WEBHOOK_URL")]
    NarratorNotConfigured,
}

/// Why an orchestration call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HaltReason {
    /// The actor at this index needs a human submission.
    AwaitingHuman(usize),
    /// The chain bound was reached.
    ChainLimit,
    /// The narrator failed or is missing for the actor at this index.
    NarratorUnavailable(usize),
}

/// One turn resolved during an orchestration call.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedTurn {
    /// Actor index in the turn order.
    pub index: usize,
    /// Turn pointer value of this turn.
    pub turn: u64,
    pub speaker: String,
    pub disposition: Disposition,
    pub narration: String,
    /// The narration is a narrator failure description.
    pub degraded: bool,
    pub log: Vec<String>,
    pub effects: Vec<Effect>,
}

/// Result of one orchestration call.
#[derive(Debug, Clone, Serialize)]
pub struct TurnReport {
    pub turns: Vec<ResolvedTurn>,
    pub halt: HaltReason,
    pub party_defeated: bool,
}

impl TurnReport {
    fn new(turns: Vec<ResolvedTurn>, halt: HaltReason, encounter: &Encounter) -> Self {
        Self {
            turns,
            halt,
            party_defeated: encounter.party_defeated(),
        }
    }
}

/// Drives encounters through their turn order.
#[derive(Clone, Default)]
pub struct Orchestrator {
    narrator: Option<Arc<dyn Narrator>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("has_narrator", &self.narrator.is_some())
            .finish()
    }
}

impl Orchestrator {
    pub fn new(narrator: Arc<dyn Narrator>) -> Self {
        Self {
            narrator: Some(narrator),
        }
    }

    /// An orchestrator that can only resolve human turns.
    pub fn without_narrator() -> Self {
        Self { narrator: None }
    }

    pub fn has_narrator(&self) -> bool {
        self.narrator.is_some()
    }

    /// Run turns until a human is needed, the narrator fails, or the chain
    /// bound is reached.
    ///
    /// A failed narrator call still resolves that actor's turn, then the call
    /// returns [`HaltReason::NarratorUnavailable`] without running the
    /// autonomous actors after it. That halt is not terminal: the pointer has
    /// moved on, and the next `advance` resumes the chain from there.
    ///
    /// Fails with [`TurnError::NarratorNotConfigured`] only if the very first
    /// actor is autonomous and there is no narrator; the encounter is then
    /// left untouched.
    pub async fn advance(&self, encounter: &mut Encounter) -> Result<TurnReport, TurnError> {
        if let TurnState::Resolved(_) = encounter.state() {
            encounter.advance();
        }
        let index = encounter.current_index();
        if let TurnState::AwaitingHuman(i) = encounter.state() {
            return Ok(TurnReport::new(Vec::new(), HaltReason::AwaitingHuman(i), encounter));
        }

        let first_is_autonomous = encounter.actor(index).is_some_and(|a| !a.is_human());
        if first_is_autonomous && self.narrator.is_none() {
            return Err(TurnError::NarratorNotConfigured);
        }

        Ok(self.run_chain(encounter, Vec::new()).await)
    }

    /// Resolve the pending human turn with `text`, then keep chaining.
    pub async fn submit(&self, encounter: &mut Encounter, text: &str) -> Result<TurnReport, TurnError> {
        let TurnState::AwaitingHuman(index) = encounter.state() else {
            return Err(TurnError::NotAwaitingHuman(encounter.state()));
        };

        let turn = resolve_turn(encounter, index, text.trim().to_string(), false);
        encounter.advance();
        Ok(self.run_chain(encounter, vec![turn]).await)
    }

    async fn run_chain(&self, encounter: &mut Encounter, mut turns: Vec<ResolvedTurn>) -> TurnReport {
        let limit = encounter.actors().len() + 1;

        while turns.len() < limit {
            let index = encounter.current_index();
            let Some(actor) = encounter.actor(index) else {
                break;
            };

            if actor.is_human() {
                encounter.set_state(TurnState::AwaitingHuman(index));
                tracing::info!(index, "waiting for human input");
                return TurnReport::new(turns, HaltReason::AwaitingHuman(index), encounter);
            }

            let Some(narrator) = self.narrator.as_ref() else {
                encounter.set_state(TurnState::AwaitingActor(index));
                return TurnReport::new(turns, HaltReason::NarratorUnavailable(index), encounter);
            };

            encounter.set_state(TurnState::CallingNarrator(index));
            let Some(request) = encounter.turn_request(index) else {
                break;
            };
            let (narration, degraded) = match narrator.narrate(&request).await {
                Ok(text) => (text, false),
                Err(e) => {
                    tracing::warn!(index, "narrator failed: {e}");
                    (e.to_string(), true)
                }
            };

            turns.push(resolve_turn(encounter, index, narration, degraded));
            encounter.advance();

            if degraded {
                return TurnReport::new(turns, HaltReason::NarratorUnavailable(index), encounter);
            }
        }

        TurnReport::new(turns, HaltReason::ChainLimit, encounter)
    }
}

/// Record a narration, run it through the rules and mark the turn resolved.
fn resolve_turn(encounter: &mut Encounter, index: usize, narration: String, degraded: bool) -> ResolvedTurn {
    let turn = encounter.turn();
    let (speaker, author, disposition) = match (encounter.actor_combatant(index), encounter.actor(index)) {
        (Some(c), Some(a)) => (c.name.clone(), c.kind, a.disposition),
        _ => (String::new(), CombatantKind::Player, Disposition::Human),
    };

    encounter.record_narration(index, &narration);
    let outcome = {
        let (registry, rng) = encounter.parts_mut();
        rules::process_narration(registry, &narration, author, rng)
    };
    encounter.record_combat_log(&outcome.log);
    encounter.set_state(TurnState::Resolved(index));

    tracing::info!(
        turn,
        speaker = %speaker,
        effects = outcome.effects.len(),
        degraded,
        "turn resolved"
    );

    ResolvedTurn {
        index,
        turn,
        speaker,
        disposition,
        narration,
        degraded,
        log: outcome.log,
        effects: outcome.effects,
    }
}
