//! Testing utilities for encounters.
//!
//! This module provides tools for integration testing:
//! - `MockNarrator` for deterministic turns without a webhook
//! - `TestHarness` for scripted encounter scenarios
//! - Assertion helpers for verifying combatant state

use crate::combatant::{CharacterClass, Combatant};
use crate::encounter::{Disposition, Encounter, SetupError, TranscriptEntry};
use crate::orchestrator::{Narrator, Orchestrator, TurnError, TurnReport};
use crate::party::build_player;
use async_trait::async_trait;
use narrator::TurnRequest;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Narration returned once the script runs out.
pub const DEFAULT_MOCK_NARRATION: &str = "The combatants circle each other warily.";

/// A narrator that returns scripted responses and records every request.
#[derive(Debug, Default)]
pub struct MockNarrator {
    /// Scripted results, returned in order.
    script: Mutex<VecDeque<Result<String, narrator::Error>>>,
    /// Every payload received.
    requests: Mutex<Vec<TurnRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockNarrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that returns these narrations in order.
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mock = Self::new();
        for response in responses {
            mock.push_response(response);
        }
        mock
    }

    /// Queue a narration.
    pub fn push_response(&self, text: impl Into<String>) {
        lock(&self.script).push_back(Ok(text.into()));
    }

    /// Queue a failure.
    pub fn push_error(&self, error: narrator::Error) {
        lock(&self.script).push_back(Err(error));
    }

    /// Payloads received so far.
    pub fn requests(&self) -> Vec<TurnRequest> {
        lock(&self.requests).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Names of the characters the narrator was asked to play, in order.
    pub fn speakers(&self) -> Vec<String> {
        lock(&self.requests)
            .iter()
            .map(|r| r.char_name.clone())
            .collect()
    }
}

#[async_trait]
impl Narrator for MockNarrator {
    async fn narrate(&self, request: &TurnRequest) -> Result<String, narrator::Error> {
        lock(&self.requests).push(request.clone());
        lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| Ok(DEFAULT_MOCK_NARRATION.to_string()))
    }
}

/// Test harness for running encounter scenarios.
pub struct TestHarness {
    pub narrator: Arc<MockNarrator>,
    pub orchestrator: Orchestrator,
    pub encounter: Encounter,
}

impl TestHarness {
    /// Autonomous DM followed by a human Fighter named Thorin.
    pub fn new() -> Result<Self, SetupError> {
        Self::with_actors(vec![(
            build_player("Thorin", CharacterClass::Fighter),
            Disposition::Human,
        )])
    }

    /// Autonomous DM followed by the given actors.
    pub fn with_actors(actors: Vec<(Combatant, Disposition)>) -> Result<Self, SetupError> {
        let builder = actors.into_iter().fold(
            Encounter::builder().dungeon_master("mock-dm").seed(7),
            |builder, (combatant, disposition)| builder.actor(combatant, disposition, "mock-player"),
        );
        Ok(Self::with_encounter(builder.build()?))
    }

    pub fn with_encounter(encounter: Encounter) -> Self {
        let narrator = Arc::new(MockNarrator::new());
        Self {
            orchestrator: Orchestrator::new(narrator.clone()),
            narrator,
            encounter,
        }
    }

    /// Queue a narrator response.
    pub fn expect_narration(&mut self, text: impl Into<String>) -> &mut Self {
        self.narrator.push_response(text);
        self
    }

    pub async fn advance(&mut self) -> Result<TurnReport, TurnError> {
        self.orchestrator.advance(&mut self.encounter).await
    }

    pub async fn submit(&mut self, text: &str) -> Result<TurnReport, TurnError> {
        self.orchestrator.submit(&mut self.encounter, text).await
    }

    /// Current HP of a combatant as (current, max).
    pub fn hp(&self, name: &str) -> Option<(i32, i32)> {
        self.encounter
            .registry()
            .get_by_name(name)
            .map(|c| (c.hit_points.current, c.hit_points.maximum))
    }

    pub fn has_combatant(&self, name: &str) -> bool {
        self.encounter.registry().contains_name(name)
    }

    pub fn last_entry(&self) -> Option<&TranscriptEntry> {
        self.encounter.transcript().last()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert a combatant's HP.
#[track_caller]
pub fn assert_hp(harness: &TestHarness, name: &str, current: i32, max: i32) {
    match harness.hp(name) {
        Some(actual) => assert_eq!(
            actual,
            (current, max),
            "Expected {name} at {current}/{max} HP, got {}/{}",
            actual.0,
            actual.1
        ),
        None => panic!("Expected combatant '{name}' to exist"),
    }
}

/// Assert a combatant is registered.
#[track_caller]
pub fn assert_has_combatant(harness: &TestHarness, name: &str) {
    assert!(
        harness.has_combatant(name),
        "Expected combatant '{name}' to exist"
    );
}

/// Assert a combatant is NOT registered.
#[track_caller]
pub fn assert_no_combatant(harness: &TestHarness, name: &str) {
    assert!(
        !harness.has_combatant(name),
        "Expected combatant '{name}' to NOT exist"
    );
}

/// Assert the encounter waits on the human at `index`.
#[track_caller]
pub fn assert_awaiting_human(harness: &TestHarness, index: usize) {
    assert_eq!(
        harness.encounter.pending_human(),
        Some(index),
        "Expected to wait for human actor {index}, state is {}",
        harness.encounter.state()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::HaltReason;

    #[tokio::test]
    async fn test_mock_narrator_script_then_default() {
        let mock = MockNarrator::with_responses(["first"]);
        let mut harness = TestHarness::new().unwrap();
        let request = harness.encounter.turn_request(0).unwrap();
        assert_eq!(mock.narrate(&request).await.unwrap(), "first");
        assert_eq!(mock.narrate(&request).await.unwrap(), DEFAULT_MOCK_NARRATION);
        assert_eq!(mock.call_count(), 2);

        harness.expect_narration("The door bursts open.");
        let report = harness.advance().await.unwrap();
        assert_eq!(report.halt, HaltReason::AwaitingHuman(1));
        assert_eq!(harness.last_entry().unwrap().text, "The door bursts open.");
    }

    #[tokio::test]
    async fn test_harness_spawn_and_hp() {
        let mut harness = TestHarness::new().unwrap();
        harness.expect_narration("A goblin appears. The Goblin strikes Thorin! Thorin takes 3 damage.");
        harness.advance().await.unwrap();

        assert_has_combatant(&harness, "Goblin");
        assert_no_combatant(&harness, "Goblin 2");
        assert_awaiting_human(&harness, 1);
        let (current, max) = harness.hp("Thorin").unwrap();
        assert_eq!(max, 12);
        assert!(current <= 9);
    }
}
