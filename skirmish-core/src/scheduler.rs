//! Auto-play: advance an encounter on a timer.
//!
//! The scheduler runs as a tokio task. Every tick it waits for the
//! configured delay, locks the encounter and runs one orchestration call,
//! then publishes the [`TurnReport`] on a channel. Ticks are skipped while
//! a human submission is pending, and the task ends once the party is
//! defeated or the token is cancelled.

use crate::encounter::Encounter;
use crate::orchestrator::{Orchestrator, TurnError, TurnReport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// An encounter shared between the scheduler and whoever submits human turns.
pub type SharedEncounter = Arc<Mutex<Encounter>>;

const REPORT_BUFFER: usize = 16;

/// Why the auto-play task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    PartyDefeated,
    NarratorNotConfigured,
    /// Nobody is listening for reports any more.
    ReceiverDropped,
    /// The task panicked or was aborted.
    Aborted,
}

/// Handle to a running auto-play task.
pub struct AutoPlay {
    cancel: CancellationToken,
    handle: JoinHandle<StopReason>,
    reports: mpsc::Receiver<TurnReport>,
}

impl AutoPlay {
    /// Start advancing `encounter` every `delay`.
    pub fn spawn(orchestrator: Orchestrator, encounter: SharedEncounter, delay: Duration) -> Self {
        let cancel = CancellationToken::new();
        let (tx, reports) = mpsc::channel(REPORT_BUFFER);
        let handle = tokio::spawn(run(orchestrator, encounter, delay, cancel.clone(), tx));
        Self {
            cancel,
            handle,
            reports,
        }
    }

    /// Wait for the next report. `None` once the task has ended.
    pub async fn next_report(&mut self) -> Option<TurnReport> {
        self.reports.recv().await
    }

    /// A token that stops this task when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel and wait for the task to end.
    pub async fn stop(self) -> StopReason {
        self.cancel.cancel();
        self.join().await
    }

    /// Wait for the task to end on its own.
    pub async fn join(self) -> StopReason {
        let Self {
            handle, reports, ..
        } = self;
        drop(reports);
        handle.await.unwrap_or(StopReason::Aborted)
    }
}

async fn run(
    orchestrator: Orchestrator,
    encounter: SharedEncounter,
    delay: Duration,
    cancel: CancellationToken,
    tx: mpsc::Sender<TurnReport>,
) -> StopReason {
    tracing::info!(delay_ms = delay.as_millis() as u64, "auto-play started");

    let reason = loop {
        tokio::select! {
            _ = cancel.cancelled() => break StopReason::Cancelled,
            _ = tokio::time::sleep(delay) => {}
        }

        let report = {
            let mut guard = encounter.lock().await;
            if guard.party_defeated() {
                break StopReason::PartyDefeated;
            }
            if guard.is_awaiting_human() {
                tracing::debug!("auto-play tick skipped; waiting for human input");
                continue;
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => break StopReason::Cancelled,
                result = orchestrator.advance(&mut guard) => result,
            };
            match result {
                Ok(report) => report,
                Err(TurnError::NarratorNotConfigured) => break StopReason::NarratorNotConfigured,
                Err(e) => {
                    tracing::warn!("auto-play step rejected: {e}");
                    continue;
                }
            }
        };

        let defeated = report.party_defeated;
        if tx.send(report).await.is_err() {
            break StopReason::ReceiverDropped;
        }
        if defeated {
            break StopReason::PartyDefeated;
        }
    };

    tracing::info!(?reason, "auto-play stopped");
    reason
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::CharacterClass;
    use crate::encounter::Disposition;
    use crate::orchestrator::HaltReason;
    use crate::party::build_player;
    use crate::testing::MockNarrator;

    fn shared(disposition: Disposition) -> SharedEncounter {
        let encounter = Encounter::builder()
            .dungeon_master("dm")
            .actor(build_player("Thorin", CharacterClass::Fighter), disposition, "p")
            .seed(9)
            .build()
            .unwrap();
        Arc::new(Mutex::new(encounter))
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_pause_for_humans() {
        let narrator = Arc::new(MockNarrator::new());
        let orchestrator = Orchestrator::new(narrator.clone());
        let encounter = shared(Disposition::Human);
        let mut autoplay = AutoPlay::spawn(orchestrator.clone(), encounter.clone(), Duration::from_millis(100));

        let report = autoplay.next_report().await.unwrap();
        assert_eq!(report.turns.len(), 1);
        assert_eq!(report.halt, HaltReason::AwaitingHuman(1));

        // Many ticks pass without the narrator being called again.
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(narrator.call_count(), 1);

        {
            let mut guard = encounter.lock().await;
            orchestrator.submit(&mut guard, "I raise my shield.").await.unwrap();
        }
        assert_eq!(narrator.call_count(), 2);

        assert_eq!(autoplay.stop().await, StopReason::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_party_defeated() {
        let narrator = Arc::new(MockNarrator::with_responses([
            "Lightning cracks. Thorin takes 100 damage.",
        ]));
        let orchestrator = Orchestrator::new(narrator);
        let mut autoplay = AutoPlay::spawn(orchestrator, shared(Disposition::Autonomous), Duration::from_millis(10));

        let report = autoplay.next_report().await.unwrap();
        assert!(report.party_defeated);
        assert_eq!(autoplay.join().await, StopReason::PartyDefeated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_narrator_stops() {
        let autoplay = AutoPlay::spawn(
            Orchestrator::without_narrator(),
            shared(Disposition::Autonomous),
            Duration::from_millis(10),
        );
        assert_eq!(autoplay.join().await, StopReason::NarratorNotConfigured);
    }
}
