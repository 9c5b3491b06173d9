//! Minimal client for a narrator webhook.
//!
//! The narrator is a remote workflow that receives a JSON description of the
//! current turn and answers with a JSON object carrying the narration text.
//! This crate provides:
//! - The wire types for the turn request
//! - A `Webhook` client with timeouts
//! - Response interpretation that turns every malformed answer into a typed
//!   error whose `Display` is readable narration

use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default request timeout. Narrator workflows chain several model calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

const STATUS_BODY_LIMIT: usize = 300;
const RAW_BODY_LIMIT: usize = 500;
const PREVIEW_LIMIT: usize = 300;

/// Response fields that may carry the narration, in lookup order.
const CONTENT_FIELDS: [&str; 3] = ["content", "message", "narration"];

/// Errors that can occur when calling the narrator.
///
/// Every variant renders as a complete sentence so callers can use the
/// error text in place of narration.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Request timed out: is the narrator workflow active?")]
    Timeout,

    #[error("Cannot connect: check the webhook URL and that the narrator service is running.")]
    Connect,

    #[error("Connection failed: {0}")]
    Network(String),

    #[error("Narrator error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Narrator returned non-JSON (content-type: {content_type}): {raw}")]
    NotJson { content_type: String, raw: String },

    #[error(
        "Narrator returned an empty response (content-type: {content_type}). \
         This usually means the workflow failed before reaching its respond step."
    )]
    Empty { content_type: String },

    #[error("Narrator returned JSON but no 'content' key. Keys: {keys:?}. Data: {preview}")]
    MissingContent { keys: Vec<String>, preview: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else if err.is_connect() {
            Error::Connect
        } else {
            Error::Network(err.to_string())
        }
    }
}

/// Narrator webhook client.
#[derive(Clone)]
pub struct Webhook {
    client: reqwest::Client,
    url: String,
}

impl Webhook {
    /// Create a client for the given webhook URL with the default timeout.
    pub fn new(url: impl Into<String>) -> Result<Self, Error> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, Error> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(Error::Config("webhook URL is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, url })
    }

    /// The webhook URL this client posts to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Post a turn request and return the narration text.
    pub async fn narrate(&self, request: &TurnRequest) -> Result<String, Error> {
        tracing::debug!(char_name = %request.char_name, url = %self.url, "posting turn to narrator");

        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(Error::from_transport)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        let body = response.text().await.map_err(Error::from_transport)?;

        interpret_response(status, &content_type, &body)
    }
}

/// Turn a raw HTTP answer into narration text or a descriptive error.
pub fn interpret_response(status: u16, content_type: &str, body: &str) -> Result<String, Error> {
    if status != 200 {
        return Err(Error::Status {
            status,
            body: truncate_chars(body, STATUS_BODY_LIMIT),
        });
    }

    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) if body.trim().is_empty() => {
            return Err(Error::Empty {
                content_type: content_type.to_string(),
            })
        }
        Err(_) => {
            return Err(Error::NotJson {
                content_type: content_type.to_string(),
                raw: truncate_chars(body, RAW_BODY_LIMIT),
            })
        }
    };

    // Workflow engines often wrap a single item in an array.
    let object = match &value {
        serde_json::Value::Array(items) => items.first().unwrap_or(&value),
        _ => &value,
    };

    let content = CONTENT_FIELDS
        .iter()
        .filter_map(|field| object.get(field).and_then(|v| v.as_str()))
        .find(|text| !text.trim().is_empty());

    match content {
        Some(text) => Ok(text.to_string()),
        None => Err(Error::MissingContent {
            keys: object
                .as_object()
                .map(|map| map.keys().cloned().collect())
                .unwrap_or_default(),
            preview: truncate_chars(&value.to_string(), PREVIEW_LIMIT),
        }),
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

// ============================================================================
// Wire types
// ============================================================================

/// Who is speaking this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "DM")]
    Dm,
    #[serde(rename = "PLAYER")]
    Player,
}

/// The acting entity's stat block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatBlock {
    pub hp: i32,
    pub max_hp: i32,
    pub ac: i32,
    pub class: String,
    pub level: u8,
    pub strength: u8,
    pub dexterity: u8,
    pub constitution: u8,
    pub intelligence: u8,
    pub wisdom: u8,
    pub charisma: u8,
}

/// One party member in the party snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyMember {
    pub name: String,
    pub class: String,
    pub hp: i32,
    pub max_hp: i32,
    pub ac: i32,
}

/// One monster in the live monster snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterSnapshot {
    pub name: String,
    pub hp: i32,
    pub max_hp: i32,
    pub ac: i32,
    pub alive: bool,
}

/// A chat-style history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub name: String,
    pub role: String,
    pub content: String,
}

/// The complete payload posted to the narrator for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRequest {
    pub role: Role,
    pub model_id: String,
    pub char_name: String,
    pub char_class: String,
    pub stats: StatBlock,
    pub adventure_context: String,
    pub party_info: Vec<PartyMember>,
    pub monsters: Vec<MonsterSnapshot>,
    pub history_summary: String,
    pub conversation_history: Vec<HistoryMessage>,
    pub valid_actions: Vec<String>,
    pub latest_input: String,
}
