//! Line-oriented encounter driver.
//!
//! Protocol:
//! - Lines starting with `#` are commands (play, auto, stop, status, reset, quit)
//! - Any other line is the pending human's action
//! - Output lines are tagged: `[Speaker]` narration, `  ` combat log, `[STATUS]`, `[ERROR]`

use skirmish_core::config::EncounterConfig;
use skirmish_core::encounter::Encounter;
use skirmish_core::orchestrator::{HaltReason, Orchestrator, TurnError, TurnReport};
use skirmish_core::scheduler::{AutoPlay, SharedEncounter};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;

enum Event {
    Line(Option<String>),
    Report(Option<TurnReport>),
}

/// Run an encounter on stdin/stdout until `#quit` or end of input.
pub async fn run(config: EncounterConfig) -> anyhow::Result<()> {
    let orchestrator = config.orchestrator()?;
    let encounter = config.generate_encounter()?;

    println!("=== Skirmish ===");
    print_roster(&encounter);
    println!();
    print_help();
    println!();

    let shared: SharedEncounter = Arc::new(Mutex::new(encounter));
    let mut autoplay: Option<AutoPlay> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    // Kick off so the first human sees the opening scene.
    step(&orchestrator, &shared).await;

    loop {
        let event = tokio::select! {
            line = lines.next_line() => Event::Line(line?),
            report = next_report(&mut autoplay) => Event::Report(report),
        };

        match event {
            Event::Line(None) => break,
            Event::Line(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let Some(command) = line.strip_prefix('#') else {
                    submit(&orchestrator, &shared, line).await;
                    continue;
                };

                let parts: Vec<&str> = command.split_whitespace().collect();
                match parts.first().copied() {
                    Some("quit") | Some("exit") => {
                        println!("Goodbye!");
                        break;
                    }
                    Some("play") => step(&orchestrator, &shared).await,
                    Some("auto") => {
                        if autoplay.is_some() {
                            println!("[ERROR] Auto-play is already running. Use #stop first.");
                            continue;
                        }
                        let delay = match parts.get(1).map(|ms| ms.parse::<u64>()) {
                            Some(Ok(ms)) => Duration::from_millis(ms),
                            Some(Err(_)) => {
                                println!("[ERROR] Usage: #auto [delay-ms]");
                                continue;
                            }
                            None => config.autoplay_delay,
                        };
                        println!("[AUTO] Advancing every {} ms", delay.as_millis());
                        autoplay = Some(AutoPlay::spawn(orchestrator.clone(), shared.clone(), delay));
                    }
                    Some("stop") => match autoplay.take() {
                        Some(running) => println!("[AUTO] Stopped ({:?})", running.stop().await),
                        None => println!("[ERROR] Auto-play is not running."),
                    },
                    Some("status") => print_status(&*shared.lock().await),
                    Some("reset") => {
                        if let Some(running) = autoplay.take() {
                            running.stop().await;
                        }
                        shared.lock().await.reset();
                        println!("[RESET] The encounter starts over.");
                        print_roster(&*shared.lock().await);
                    }
                    Some("help") => print_help(),
                    _ => println!("[ERROR] Unknown command. Type #help for help."),
                }
            }
            Event::Report(Some(report)) => print_report(&*shared.lock().await, &report),
            Event::Report(None) => {
                if let Some(finished) = autoplay.take() {
                    println!("[AUTO] Stopped ({:?})", finished.join().await);
                }
            }
        }
    }

    if let Some(running) = autoplay.take() {
        running.stop().await;
    }
    Ok(())
}

async fn next_report(autoplay: &mut Option<AutoPlay>) -> Option<TurnReport> {
    match autoplay {
        Some(running) => running.next_report().await,
        None => std::future::pending().await,
    }
}

async fn step(orchestrator: &Orchestrator, shared: &SharedEncounter) {
    let mut encounter = shared.lock().await;
    match orchestrator.advance(&mut encounter).await {
        Ok(report) => print_report(&encounter, &report),
        Err(e) => println!("[ERROR] {e}"),
    }
}

async fn submit(orchestrator: &Orchestrator, shared: &SharedEncounter, text: &str) {
    let mut encounter = shared.lock().await;
    match orchestrator.submit(&mut encounter, text).await {
        Ok(report) => print_report(&encounter, &report),
        Err(TurnError::NotAwaitingHuman(state)) => {
            println!("[ERROR] Nobody is waiting for input ({state}). Try #play.")
        }
        Err(e) => println!("[ERROR] {e}"),
    }
}

fn print_report(encounter: &Encounter, report: &TurnReport) {
    for turn in &report.turns {
        println!("[{}]", turn.speaker);
        for para in turn.narration.split("\n\n") {
            println!("{para}");
        }
        for line in &turn.log {
            println!("  {line}");
        }
        println!();
    }

    if report.party_defeated {
        println!("[DEFEAT] The party has fallen. Use #reset to try again.");
        return;
    }
    match report.halt {
        HaltReason::AwaitingHuman(index) => {
            let name = encounter
                .actor_combatant(index)
                .map(|c| c.name.as_str())
                .unwrap_or("Adventurer");
            println!("[YOUR TURN] {name}, what do you do?");
        }
        HaltReason::NarratorUnavailable(_) => {
            println!("[ERROR] The narrator is unavailable. Check the webhook and #play to retry.")
        }
        HaltReason::ChainLimit => {}
    }
}

fn print_roster(encounter: &Encounter) {
    for (i, actor) in encounter.actors().iter().enumerate() {
        if let Some(c) = encounter.actor_combatant(i) {
            let who = if actor.is_human() { "human" } else { "narrator" };
            println!("  {}. {} ({}) - {who}", i + 1, c.name, c.class_label());
        }
    }
}

fn print_status(encounter: &Encounter) {
    println!("[STATUS]");
    println!("  Turn: {} ({})", encounter.turn(), encounter.state());
    for c in encounter.registry().iter() {
        let marker = if c.is_alive() { "" } else { " 💀" };
        println!(
            "  {:<16} {:<10} HP {:>7}  AC {}{marker}",
            c.name,
            c.class_label(),
            c.hp_display(),
            c.armor_class
        );
    }
}

fn print_help() {
    println!("Commands:");
    println!("  #play          - Run turns until a human is needed");
    println!("  #auto [ms]     - Advance on a timer");
    println!("  #stop          - Stop auto-play");
    println!("  #status        - Show combatants and HP");
    println!("  #reset         - Start the encounter over");
    println!("  #quit          - Exit");
    println!("  (anything else is the waiting character's action)");
}
