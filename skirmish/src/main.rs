//! Narrated skirmish driver.
//!
//! Runs an encounter on stdin/stdout: the Dungeon Master and party members
//! are played by a narrator webhook, the first `--humans N` party members
//! by whoever types at the terminal.
//!
//! ```bash
//! NARRATOR_WEBHOOK_URL=http://localhost:5678/webhook/rpg \
//!     cargo run -p skirmish -- --humans 1 --classes fighter,wizard
//! ```

mod headless;

use skirmish_core::config::{parse_classes, EncounterConfig};
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Logs go to stderr so they do not interleave with the transcript.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skirmish=info,skirmish_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let config = apply_args(EncounterConfig::from_env()?, &args)?;
    if config.webhook_url.is_none() {
        tracing::warn!("NARRATOR_WEBHOOK_URL is not set; only human turns can be played");
    }
    tracing::info!(
        dm_model = %config.dm_model,
        player_model = %config.player_model,
        humans = config.human_players,
        "configuration loaded"
    );

    headless::run(config).await
}

/// Command line flags override the environment.
fn apply_args(mut config: EncounterConfig, args: &[String]) -> anyhow::Result<EncounterConfig> {
    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("--webhook", Some(v)) => config = config.with_webhook_url(v.clone()),
            ("--classes", Some(v)) => config = config.with_classes(parse_classes(v)?),
            ("--humans", Some(v)) => config = config.with_human_players(v.parse()?),
            ("--seed", Some(v)) => config = config.with_seed(v.parse()?),
            ("--delay-ms", Some(v)) => config = config.with_autoplay_delay(Duration::from_millis(v.parse()?)),
            ("--adventure", Some(v)) => config = config.with_adventure(v.clone()),
            (flag, _) => anyhow::bail!("Unknown or incomplete argument '{flag}' (try --help)"),
        }
        i += 2;
    }
    Ok(config)
}

fn print_help() {
    println!("skirmish - narrated turn-based encounters");
    println!();
    println!("Usage: skirmish [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --webhook <url>       Narrator webhook (NARRATOR_WEBHOOK_URL)");
    println!("  --classes <list>      Party classes, e.g. fighter,wizard,rogue (PARTY_CLASSES)");
    println!("  --humans <n>          Party members played at the terminal (HUMAN_PLAYERS)");
    println!("  --seed <n>            Seed for party generation and dice (ENCOUNTER_SEED)");
    println!("  --delay-ms <n>        Auto-play delay between steps (AUTOPLAY_DELAY_MS)");
    println!("  --adventure <text>    Adventure premise (ADVENTURE_PREMISE)");
    println!("  -h, --help            Show this help");
}
