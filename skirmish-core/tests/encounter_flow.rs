//! End-to-end encounter flows driven by a scripted narrator.
//!
//! Run with: `cargo test -p skirmish-core --test encounter_flow`

use skirmish_core::combatant::{AbilityScores, CharacterClass, Combatant, CombatantKind};
use skirmish_core::dice::DamageDice;
use skirmish_core::encounter::{Disposition, TurnState};
use skirmish_core::orchestrator::{HaltReason, Orchestrator, TurnError};
use skirmish_core::party::{build_player, DUNGEON_MASTER_NAME};
use skirmish_core::testing::{
    assert_awaiting_human, assert_has_combatant, assert_hp, assert_no_combatant, TestHarness,
};
use skirmish_core::Encounter;

fn thorin_with_20_hp() -> Combatant {
    Combatant::new(
        "Thorin",
        CombatantKind::Player,
        AbilityScores::new(16, 12, 14, 10, 10, 8),
        20,
        16,
        DamageDice::new(1, 8),
    )
    .with_class(CharacterClass::Fighter)
}

// =============================================================================
// Turn chaining
// =============================================================================

#[tokio::test]
async fn test_chain_stops_at_first_human() {
    let mut harness = TestHarness::with_actors(vec![
        (build_player("Elara", CharacterClass::Wizard), Disposition::Autonomous),
        (build_player("Thorin", CharacterClass::Fighter), Disposition::Human),
        (build_player("Kael", CharacterClass::Rogue), Disposition::Autonomous),
    ])
    .unwrap();

    let report = harness.advance().await.unwrap();

    assert_eq!(report.turns.len(), 2);
    assert_eq!(report.turns[0].index, 0);
    assert_eq!(report.turns[1].index, 1);
    assert_eq!(report.halt, HaltReason::AwaitingHuman(2));
    assert_awaiting_human(&harness, 2);
    assert_eq!(harness.narrator.speakers(), vec![DUNGEON_MASTER_NAME, "Elara"]);

    // Kael only plays after Thorin's submission.
    let report = harness.submit("  I hold the line.  ").await.unwrap();
    assert_eq!(report.turns[0].narration, "I hold the line.");
    assert_eq!(report.turns[0].speaker, "Thorin");
    assert_eq!(
        harness.narrator.speakers(),
        vec![DUNGEON_MASTER_NAME, "Elara", "Kael", DUNGEON_MASTER_NAME, "Elara"]
    );
    assert_eq!(report.halt, HaltReason::AwaitingHuman(2));
}

#[tokio::test]
async fn test_payload_carries_recent_history() {
    let mut harness = TestHarness::new().unwrap();
    harness.expect_narration("Rain hammers the tavern roof.");
    harness.advance().await.unwrap();
    harness.submit("I order an ale.").await.unwrap();

    let requests = harness.narrator.requests();
    assert_eq!(requests.len(), 2);
    let second = &requests[1];
    assert_eq!(second.char_name, DUNGEON_MASTER_NAME);
    assert_eq!(second.latest_input, "I order an ale.");
    assert!(second.history_summary.contains("[Thorin] I order an ale."));
    assert_eq!(second.conversation_history.len(), 2);
    assert_eq!(second.conversation_history[1].role, "user");
}

// =============================================================================
// Combat through narration
// =============================================================================

#[tokio::test]
async fn test_attack_and_damage_cue_in_one_submission() {
    let mut harness =
        TestHarness::with_actors(vec![(thorin_with_20_hp(), Disposition::Human)]).unwrap();
    harness.expect_narration("A goblin leaps from the shadows!");
    harness.advance().await.unwrap();
    assert_has_combatant(&harness, "Goblin");
    assert_hp(&harness, "Thorin", 20, 20);

    let report = harness
        .submit("Thorin attacks Goblin. Thorin takes 5 damage.")
        .await
        .unwrap();

    let turn = &report.turns[0];
    let attack_lines: Vec<_> = turn.log.iter().filter(|l| l.starts_with("⚔️")).collect();
    assert_eq!(attack_lines.len(), 1, "log was {:?}", turn.log);
    assert!(attack_lines[0].contains("Thorin attacks Goblin"));
    assert!(attack_lines[0].contains("vs AC 15"));
    assert_hp(&harness, "Thorin", 15, 20);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["halt"]["AwaitingHuman"], 1);
    assert_eq!(json["turns"][0]["speaker"], "Thorin");

    let log_entry = harness
        .encounter
        .transcript()
        .iter()
        .find(|e| e.is_combat_log && e.text.contains("Thorin took 5 damage"));
    assert!(log_entry.is_some());
}

#[tokio::test]
async fn test_spawns_are_idempotent() {
    let mut harness = TestHarness::new().unwrap();
    harness
        .expect_narration("Two goblins burst through the door!")
        .expect_narration("The two goblins snarl and circle Thorin.");

    harness.advance().await.unwrap();
    assert_has_combatant(&harness, "Goblin");
    assert_has_combatant(&harness, "Goblin 2");

    harness.submit("I ready my shield.").await.unwrap();
    assert_eq!(harness.encounter.registry().monsters().count(), 2);
    assert_no_combatant(&harness, "Goblin 3");
}

#[tokio::test]
async fn test_players_cannot_spawn_monsters() {
    let mut harness = TestHarness::new().unwrap();
    harness.advance().await.unwrap();
    harness.submit("Three wolves appear at my command!").await.unwrap();
    assert_no_combatant(&harness, "Wolf");
}

#[tokio::test]
async fn test_party_defeat_is_reported() {
    let mut harness = TestHarness::new().unwrap();
    harness.expect_narration("A falling beam crushes the hero. Thorin takes 50 damage.");

    let report = harness.advance().await.unwrap();
    assert!(report.party_defeated);
    assert!(harness.encounter.party_defeated());
    assert_hp(&harness, "Thorin", 0, 12);
}

// =============================================================================
// Failures and rejections
// =============================================================================

#[tokio::test]
async fn test_narrator_failure_becomes_narration() {
    let mut harness = TestHarness::new().unwrap();
    harness.narrator.push_error(narrator::Error::Timeout);

    let report = harness.advance().await.unwrap();

    assert_eq!(report.halt, HaltReason::NarratorUnavailable(0));
    assert_eq!(report.turns.len(), 1);
    assert!(report.turns[0].degraded);
    assert!(report.turns[0].narration.contains("timed out"));
    assert_eq!(harness.encounter.turn(), 1);
    assert_eq!(harness.encounter.state(), TurnState::AwaitingActor(1));

    // The next call carries on with the human turn.
    let report = harness.advance().await.unwrap();
    assert_eq!(report.halt, HaltReason::AwaitingHuman(1));
}

#[tokio::test]
async fn test_missing_narrator_leaves_state_unchanged() {
    let mut encounter = Encounter::builder()
        .dungeon_master("dm")
        .actor(build_player("Thorin", CharacterClass::Fighter), Disposition::Human, "p")
        .seed(3)
        .build()
        .unwrap();
    let orchestrator = Orchestrator::without_narrator();

    let err = orchestrator.advance(&mut encounter).await.unwrap_err();

    assert_eq!(err, TurnError::NarratorNotConfigured);
    assert_eq!(encounter.turn(), 0);
    assert_eq!(encounter.state(), TurnState::AwaitingActor(0));
    assert!(encounter.transcript().is_empty());
}

#[tokio::test]
async fn test_submit_rejected_without_pending_human() {
    let mut harness = TestHarness::new().unwrap();

    let err = harness.submit("I charge!").await.unwrap_err();

    assert_eq!(err, TurnError::NotAwaitingHuman(TurnState::AwaitingActor(0)));
    assert!(harness.encounter.transcript().is_empty());
    assert_eq!(harness.narrator.call_count(), 0);
}

#[tokio::test]
async fn test_reset_restores_setup() {
    let mut harness = TestHarness::new().unwrap();
    harness.expect_narration("A wolf lunges from the trees. Thorin takes 4 damage.");
    harness.advance().await.unwrap();
    assert_has_combatant(&harness, "Wolf");
    assert_hp(&harness, "Thorin", 8, 12);

    harness.encounter.reset();

    assert_no_combatant(&harness, "Wolf");
    assert_hp(&harness, "Thorin", 12, 12);
    assert!(harness.encounter.transcript().is_empty());
    assert_eq!(harness.encounter.turn(), 0);
    assert_eq!(harness.encounter.state(), TurnState::AwaitingActor(0));
    assert_eq!(harness.encounter.pending_human(), None);
}
