//! Encounter configuration.
//!
//! Settings come from code via the `with_*` builder methods or from the
//! environment (a `.env` file is honoured):
//!
//! | variable | default |
//! |---|---|
//! | `NARRATOR_WEBHOOK_URL` | unset: autonomous turns are refused |
//! | `NARRATOR_DM_MODEL` | [`DEFAULT_DM_MODEL`] |
//! | `NARRATOR_PLAYER_MODEL` | [`DEFAULT_PLAYER_MODEL`] |
//! | `NARRATOR_TIMEOUT_SECS` | 90 |
//! | `AUTOPLAY_DELAY_MS` | 1500 |
//! | `ADVENTURE_PREMISE` | [`DEFAULT_ADVENTURE`] |
//! | `PARTY_CLASSES` | three random classes, e.g. `Fighter,Wizard,Rogue` |
//! | `HUMAN_PLAYERS` | 0; the first N party members are played by humans |
//! | `ENCOUNTER_SEED` | random |

use crate::combatant::CharacterClass;
use crate::encounter::{Disposition, Encounter, SetupError, DEFAULT_ADVENTURE};
use crate::orchestrator::{Narrator, Orchestrator};
use crate::party;
use narrator::Webhook;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_DM_MODEL: &str = "anthropic/claude-3.5-sonnet";
pub const DEFAULT_PLAYER_MODEL: &str = "google/gemini-2.0-flash-lite-preview-02-05:free";
pub const DEFAULT_AUTOPLAY_DELAY: Duration = Duration::from_millis(1500);

/// Errors reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} must be a whole number, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },

    #[error("Unknown character class '{0}'")]
    UnknownClass(String),

    #[error("Could not create the narrator client: {0}")]
    Narrator(String),
}

/// Everything needed to set up and run an encounter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncounterConfig {
    pub webhook_url: Option<String>,
    pub dm_model: String,
    pub player_model: String,
    pub narrator_timeout: Duration,
    pub autoplay_delay: Duration,
    pub adventure_context: String,
    /// Party classes; empty picks three at random.
    pub classes: Vec<CharacterClass>,
    /// How many party members, counted from the first, humans play.
    pub human_players: usize,
    pub seed: Option<u64>,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EncounterConfig {
    pub fn new() -> Self {
        Self {
            webhook_url: None,
            dm_model: DEFAULT_DM_MODEL.to_string(),
            player_model: DEFAULT_PLAYER_MODEL.to_string(),
            narrator_timeout: narrator::DEFAULT_TIMEOUT,
            autoplay_delay: DEFAULT_AUTOPLAY_DELAY,
            adventure_context: DEFAULT_ADVENTURE.to_string(),
            classes: Vec::new(),
            human_players: 0,
            seed: None,
        }
    }

    pub fn with_webhook_url(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = Some(url.into());
        self
    }

    pub fn with_dm_model(mut self, model: impl Into<String>) -> Self {
        self.dm_model = model.into();
        self
    }

    pub fn with_player_model(mut self, model: impl Into<String>) -> Self {
        self.player_model = model.into();
        self
    }

    pub fn with_narrator_timeout(mut self, timeout: Duration) -> Self {
        self.narrator_timeout = timeout;
        self
    }

    pub fn with_autoplay_delay(mut self, delay: Duration) -> Self {
        self.autoplay_delay = delay;
        self
    }

    pub fn with_adventure(mut self, premise: impl Into<String>) -> Self {
        self.adventure_context = premise.into();
        self
    }

    pub fn with_classes(mut self, classes: impl IntoIterator<Item = CharacterClass>) -> Self {
        self.classes = classes.into_iter().collect();
        self
    }

    pub fn with_human_players(mut self, count: usize) -> Self {
        self.human_players = count;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Load configuration from the environment, reading `.env` first.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!("no .env loaded: {e}");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through a variable lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::new();

        config.webhook_url = var("NARRATOR_WEBHOOK_URL");
        if let Some(model) = var("NARRATOR_DM_MODEL") {
            config.dm_model = model;
        }
        if let Some(model) = var("NARRATOR_PLAYER_MODEL") {
            config.player_model = model;
        }
        if let Some(secs) = var("NARRATOR_TIMEOUT_SECS") {
            config.narrator_timeout = Duration::from_secs(parse_number("NARRATOR_TIMEOUT_SECS", &secs)?);
        }
        if let Some(ms) = var("AUTOPLAY_DELAY_MS") {
            config.autoplay_delay = Duration::from_millis(parse_number("AUTOPLAY_DELAY_MS", &ms)?);
        }
        if let Some(premise) = var("ADVENTURE_PREMISE") {
            config.adventure_context = premise;
        }
        if let Some(classes) = var("PARTY_CLASSES") {
            config.classes = parse_classes(&classes)?;
        }
        if let Some(count) = var("HUMAN_PLAYERS") {
            config.human_players = parse_number("HUMAN_PLAYERS", &count)? as usize;
        }
        if let Some(seed) = var("ENCOUNTER_SEED") {
            config.seed = Some(parse_number("ENCOUNTER_SEED", &seed)?);
        }

        Ok(config)
    }

    /// The webhook narrator, if a URL is configured.
    pub fn narrator(&self) -> Result<Option<Arc<dyn Narrator>>, ConfigError> {
        let Some(url) = &self.webhook_url else {
            return Ok(None);
        };
        let webhook = Webhook::with_timeout(url.clone(), self.narrator_timeout)
            .map_err(|e| ConfigError::Narrator(e.to_string()))?;
        Ok(Some(Arc::new(webhook)))
    }

    /// An orchestrator using the configured narrator, or none.
    pub fn orchestrator(&self) -> Result<Orchestrator, ConfigError> {
        Ok(match self.narrator()? {
            Some(narrator) => Orchestrator::new(narrator),
            None => Orchestrator::without_narrator(),
        })
    }

    /// Build an encounter, generating the party from `seed` when one is set.
    pub fn generate_encounter(&self) -> Result<Encounter, SetupError> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.build_encounter(&mut rng)
    }

    /// Generate a party and build the encounter: the DM first, then the
    /// party with the first `human_players` members played by humans.
    pub fn build_encounter<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Encounter, SetupError> {
        let members = party::generate_party(&self.classes, rng);

        let mut builder = Encounter::builder()
            .adventure_context(self.adventure_context.clone())
            .dungeon_master(self.dm_model.clone());
        for (i, member) in members.into_iter().enumerate() {
            let disposition = if i < self.human_players {
                Disposition::Human
            } else {
                Disposition::Autonomous
            };
            builder = builder.actor(member, disposition, self.player_model.clone());
        }
        if let Some(seed) = self.seed {
            builder = builder.seed(seed);
        }
        builder.build()
    }
}

fn parse_number(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidNumber {
        name,
        value: value.to_string(),
    })
}

/// Parse a comma separated class list.
pub fn parse_classes(list: &str) -> Result<Vec<CharacterClass>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|name| {
            CharacterClass::from_name(name).ok_or_else(|| ConfigError::UnknownClass(name.to_string()))
        })
        .collect()
}
