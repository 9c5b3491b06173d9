//! Encounter state.
//!
//! An [`Encounter`] owns everything a running fight needs: the registry, the
//! fixed turn order, the turn pointer and state, the transcript and the
//! random source every roll is drawn from. Orchestration functions take it
//! by `&mut` so exactly one turn is processed at a time.

use crate::class_data::DEFAULT_ACTIONS;
use crate::combatant::{Combatant, CombatantId, CombatantKind};
use crate::party;
use crate::registry::{Registry, RegistryError};
use narrator::{HistoryMessage, MonsterSnapshot, PartyMember, Role, StatBlock, TurnRequest};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Transcript entries condensed into `history_summary`.
pub const SUMMARY_ENTRIES: usize = 8;

/// Character budget of `history_summary`.
pub const SUMMARY_MAX_CHARS: usize = 600;

/// Transcript entries sent as `conversation_history`.
pub const HISTORY_ENTRIES: usize = 20;

/// Sent as `latest_input` when nothing has happened yet.
pub const KICKOFF_PROMPT: &str = "Begin the adventure! Set the scene, describe the environment \
vividly, and introduce a hook that draws the players in. Address the player characters by name \
and involve them.";

/// Premise used when none is configured.
pub const DEFAULT_ADVENTURE: &str = "The party meets at the Rusty Dragon tavern in a small \
village on the edge of a dark forest. Rumors speak of an ancient tomb recently uncovered by a \
landslide, filled with treasure and danger. A mysterious hooded stranger approaches the party \
with a map and a warning.";

const SYSTEM_SPEAKER: &str = "⚙️ System";

// ============================================================================
// Actors and turn state
// ============================================================================

/// Who decides what an actor does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Disposition {
    /// A person types the narration.
    Human,
    /// The narrator service writes the narration.
    Autonomous,
}

/// One slot in the turn order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub combatant_id: CombatantId,
    pub disposition: Disposition,
    /// Model identifier forwarded to the narrator.
    pub model_id: String,
}

impl Actor {
    pub fn is_human(&self) -> bool {
        self.disposition == Disposition::Human
    }
}

/// Where the turn machine is. The index is the actor's position in the
/// turn order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnState {
    AwaitingActor(usize),
    CallingNarrator(usize),
    AwaitingHuman(usize),
    Resolved(usize),
}

impl TurnState {
    pub fn index(&self) -> usize {
        match *self {
            TurnState::AwaitingActor(i)
            | TurnState::CallingNarrator(i)
            | TurnState::AwaitingHuman(i)
            | TurnState::Resolved(i) => i,
        }
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnState::AwaitingActor(i) => write!(f, "awaiting actor {i}"),
            TurnState::CallingNarrator(i) => write!(f, "calling narrator for actor {i}"),
            TurnState::AwaitingHuman(i) => write!(f, "awaiting human input for actor {i}"),
            TurnState::Resolved(i) => write!(f, "resolved actor {i}"),
        }
    }
}

// ============================================================================
// Transcript
// ============================================================================

/// Chat role of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityRole {
    /// Narration by the Dungeon Master.
    Assistant,
    /// Narration by a party member.
    User,
    /// Combat log.
    System,
}

impl VisibilityRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisibilityRole::Assistant => "assistant",
            VisibilityRole::User => "user",
            VisibilityRole::System => "system",
        }
    }

    fn for_author(kind: CombatantKind) -> Self {
        match kind {
            CombatantKind::DungeonMaster => VisibilityRole::Assistant,
            CombatantKind::Player | CombatantKind::Monster => VisibilityRole::User,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: String,
    pub role: VisibilityRole,
    pub text: String,
    pub is_combat_log: bool,
    /// Turn pointer value when the entry was written.
    pub turn: u64,
}

// ============================================================================
// Setup
// ============================================================================

/// Errors building an encounter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("Two combatants are named '{0}'")]
    DuplicateName(String),

    #[error("An encounter needs at least one actor")]
    NoActors,

    #[error(transparent)]
    Registry(RegistryError),
}

impl From<RegistryError> for SetupError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateName(name) => SetupError::DuplicateName(name),
            other => SetupError::Registry(other),
        }
    }
}

/// Builder for [`Encounter`].
#[derive(Debug, Clone, Default)]
pub struct EncounterBuilder {
    adventure_context: Option<String>,
    dungeon_master: Option<(Disposition, String)>,
    actors: Vec<(Combatant, Disposition, String)>,
    seed: Option<u64>,
}

impl EncounterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn adventure_context(mut self, context: impl Into<String>) -> Self {
        self.adventure_context = Some(context.into());
        self
    }

    /// Add an autonomous Dungeon Master. It always acts first.
    pub fn dungeon_master(self, model_id: impl Into<String>) -> Self {
        self.dungeon_master_with(Disposition::Autonomous, model_id)
    }

    pub fn dungeon_master_with(mut self, disposition: Disposition, model_id: impl Into<String>) -> Self {
        self.dungeon_master = Some((disposition, model_id.into()));
        self
    }

    /// Append an actor to the turn order.
    pub fn actor(
        mut self,
        combatant: Combatant,
        disposition: Disposition,
        model_id: impl Into<String>,
    ) -> Self {
        self.actors.push((combatant, disposition, model_id.into()));
        self
    }

    /// Append several actors sharing a disposition and model.
    pub fn party(
        mut self,
        members: impl IntoIterator<Item = Combatant>,
        disposition: Disposition,
        model_id: impl Into<String>,
    ) -> Self {
        let model_id = model_id.into();
        self.actors.extend(
            members
                .into_iter()
                .map(|c| (c, disposition, model_id.clone())),
        );
        self
    }

    /// Seed the encounter's random source.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<Encounter, SetupError> {
        let mut slots = Vec::with_capacity(self.actors.len() + 1);
        if let Some((disposition, model_id)) = self.dungeon_master {
            slots.push((party::dungeon_master(), disposition, model_id));
        }
        slots.extend(self.actors);
        if slots.is_empty() {
            return Err(SetupError::NoActors);
        }

        let mut registry = Registry::new();
        let mut actors = Vec::with_capacity(slots.len());
        let mut setup = Vec::with_capacity(slots.len());
        for (combatant, disposition, model_id) in slots {
            setup.push(combatant.clone());
            let combatant_id = registry.register(combatant)?;
            actors.push(Actor {
                combatant_id,
                disposition,
                model_id,
            });
        }

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        tracing::info!(actors = actors.len(), "encounter ready");

        Ok(Encounter {
            registry,
            actors,
            turn: 0,
            state: TurnState::AwaitingActor(0),
            transcript: Vec::new(),
            pending_human: None,
            adventure_context: self
                .adventure_context
                .unwrap_or_else(|| DEFAULT_ADVENTURE.to_string()),
            rng,
            setup,
        })
    }
}

// ============================================================================
// Encounter
// ============================================================================

/// A running encounter.
#[derive(Debug, Clone)]
pub struct Encounter {
    registry: Registry,
    actors: Vec<Actor>,
    turn: u64,
    state: TurnState,
    transcript: Vec<TranscriptEntry>,
    pending_human: Option<usize>,
    adventure_context: String,
    rng: StdRng,
    setup: Vec<Combatant>,
}

impl Encounter {
    pub fn builder() -> EncounterBuilder {
        EncounterBuilder::new()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn actor(&self, index: usize) -> Option<&Actor> {
        self.actors.get(index)
    }

    /// The combatant behind an actor slot.
    pub fn actor_combatant(&self, index: usize) -> Option<&Combatant> {
        self.actor(index)
            .and_then(|actor| self.registry.get(actor.combatant_id))
    }

    /// Total turns taken since the last reset.
    pub fn turn(&self) -> u64 {
        self.turn
    }

    /// Index of the actor whose turn it is.
    pub fn current_index(&self) -> usize {
        (self.turn % self.actors.len() as u64) as usize
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// Actor index waiting for a human submission, if any.
    pub fn pending_human(&self) -> Option<usize> {
        self.pending_human
    }

    pub fn is_awaiting_human(&self) -> bool {
        matches!(self.state, TurnState::AwaitingHuman(_))
    }

    pub fn adventure_context(&self) -> &str {
        &self.adventure_context
    }

    /// True when the encounter has players and all of them are down.
    pub fn party_defeated(&self) -> bool {
        let mut players = self.registry.players().peekable();
        players.peek().is_some() && players.all(|p| !p.is_alive())
    }

    /// Put the encounter back to its starting point: initial combatants at
    /// full HP, no monsters, empty transcript, first actor up.
    pub fn reset(&mut self) {
        let mut registry = Registry::new();
        for combatant in &self.setup {
            let mut fresh = combatant.clone();
            fresh.hit_points.restore();
            if let Err(e) = registry.register(fresh) {
                tracing::warn!("reset skipped a combatant: {e}");
            }
        }
        self.registry = registry;
        self.turn = 0;
        self.state = TurnState::AwaitingActor(0);
        self.transcript.clear();
        self.pending_human = None;
        tracing::info!("encounter reset");
    }

    // ------------------------------------------------------------------
    // State machine plumbing
    // ------------------------------------------------------------------

    pub(crate) fn set_state(&mut self, state: TurnState) {
        tracing::debug!(turn = self.turn, %state, "turn state");
        self.state = state;
        self.pending_human = match state {
            TurnState::AwaitingHuman(i) => Some(i),
            _ => None,
        };
    }

    /// Move the pointer to the next actor.
    pub(crate) fn advance(&mut self) {
        self.turn += 1;
        let next = self.current_index();
        self.set_state(TurnState::AwaitingActor(next));
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut Registry, &mut StdRng) {
        (&mut self.registry, &mut self.rng)
    }

    /// Append one narration entry by an actor.
    pub(crate) fn record_narration(&mut self, index: usize, text: &str) {
        let Some(author) = self.actor_combatant(index) else {
            return;
        };
        let entry = TranscriptEntry {
            speaker: author.name.clone(),
            role: VisibilityRole::for_author(author.kind),
            text: text.to_string(),
            is_combat_log: false,
            turn: self.turn,
        };
        self.transcript.push(entry);
    }

    /// Append combat-log lines as one system entry.
    pub(crate) fn record_combat_log(&mut self, lines: &[String]) {
        if lines.is_empty() {
            return;
        }
        self.transcript.push(TranscriptEntry {
            speaker: SYSTEM_SPEAKER.to_string(),
            role: VisibilityRole::System,
            text: lines.join("\n"),
            is_combat_log: true,
            turn: self.turn,
        });
    }

    // ------------------------------------------------------------------
    // Narrator payload
    // ------------------------------------------------------------------

    /// Last transcript entries as `[speaker] text`, shortened to a fixed
    /// character budget.
    pub fn history_summary(&self) -> String {
        let start = self.transcript.len().saturating_sub(SUMMARY_ENTRIES);
        let lines = self.transcript[start..]
            .iter()
            .map(|e| format!("[{}] {}", e.speaker, e.text))
            .collect::<Vec<_>>()
            .join("\n");
        shorten(&lines, SUMMARY_MAX_CHARS)
    }

    /// Recent transcript as chat messages.
    pub fn conversation_history(&self) -> Vec<HistoryMessage> {
        let start = self.transcript.len().saturating_sub(HISTORY_ENTRIES);
        self.transcript[start..]
            .iter()
            .map(|e| HistoryMessage {
                name: e.speaker.clone(),
                role: e.role.as_str().to_string(),
                content: e.text.clone(),
            })
            .collect()
    }

    /// The text the next speaker responds to.
    pub fn latest_input(&self) -> String {
        self.transcript
            .last()
            .map(|e| e.text.clone())
            .unwrap_or_else(|| KICKOFF_PROMPT.to_string())
    }

    /// Build the narrator payload for an actor slot.
    pub fn turn_request(&self, index: usize) -> Option<TurnRequest> {
        let actor = self.actor(index)?;
        let combatant = self.registry.get(actor.combatant_id)?;

        let role = match combatant.kind {
            CombatantKind::DungeonMaster => Role::Dm,
            CombatantKind::Player | CombatantKind::Monster => Role::Player,
        };
        let valid_actions = combatant
            .class
            .map(|class| class.data().actions)
            .unwrap_or(DEFAULT_ACTIONS)
            .iter()
            .map(|a| a.to_string())
            .collect();

        Some(TurnRequest {
            role,
            model_id: actor.model_id.clone(),
            char_name: combatant.name.clone(),
            char_class: combatant.class_label(),
            stats: stat_block(combatant),
            adventure_context: self.adventure_context.clone(),
            party_info: self
                .registry
                .players()
                .map(|p| PartyMember {
                    name: p.name.clone(),
                    class: p.class_label(),
                    hp: p.hit_points.current,
                    max_hp: p.hit_points.maximum,
                    ac: p.armor_class,
                })
                .collect(),
            monsters: self
                .registry
                .monsters()
                .map(|m| MonsterSnapshot {
                    name: m.name.clone(),
                    hp: m.hit_points.current,
                    max_hp: m.hit_points.maximum,
                    ac: m.armor_class,
                    alive: m.is_alive(),
                })
                .collect(),
            history_summary: self.history_summary(),
            conversation_history: self.conversation_history(),
            valid_actions,
            latest_input: self.latest_input(),
        })
    }
}

fn stat_block(combatant: &Combatant) -> StatBlock {
    let scores = &combatant.ability_scores;
    StatBlock {
        hp: combatant.hit_points.current,
        max_hp: combatant.hit_points.maximum,
        ac: combatant.armor_class,
        class: combatant.class_label(),
        level: combatant.level,
        strength: scores.strength,
        dexterity: scores.dexterity,
        constitution: scores.constitution,
        intelligence: scores.intelligence,
        wisdom: scores.wisdom,
        charisma: scores.charisma,
    }
}

/// Collapse whitespace and cut at a word boundary so the result, including
/// a trailing `…`, fits in `width` characters.
fn shorten(text: &str, width: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= width {
        return collapsed;
    }

    let mut out = String::new();
    let mut used = 0;
    for word in collapsed.split(' ') {
        let len = word.chars().count();
        let needed = if out.is_empty() { len } else { len + 1 };
        // one char reserved for the ellipsis
        if used + needed + 1 > width {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
        used += needed;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::CharacterClass;
    use crate::party::build_player;

    fn encounter() -> Encounter {
        Encounter::builder()
            .dungeon_master("dm-model")
            .actor(
                build_player("Thorin", CharacterClass::Fighter),
                Disposition::Autonomous,
                "player-model",
            )
            .actor(
                build_player("Elara", CharacterClass::Wizard),
                Disposition::Human,
                "",
            )
            .seed(3)
            .build()
            .unwrap()
    }

    #[test]
    fn test_dungeon_master_acts_first() {
        let encounter = encounter();
        assert_eq!(encounter.actors().len(), 3);
        assert_eq!(
            encounter.actor_combatant(0).unwrap().kind,
            CombatantKind::DungeonMaster
        );
        assert_eq!(encounter.state(), TurnState::AwaitingActor(0));
    }

    #[test]
    fn test_duplicate_party_name_rejected() {
        let result = Encounter::builder()
            .actor(build_player("Kael", CharacterClass::Rogue), Disposition::Human, "")
            .actor(build_player("kael", CharacterClass::Monk), Disposition::Human, "")
            .build();
        assert_eq!(result.unwrap_err(), SetupError::DuplicateName("kael".into()));

        let result = Encounter::builder()
            .actor(build_player("Élodie", CharacterClass::Bard), Disposition::Human, "")
            .actor(build_player("élodie", CharacterClass::Druid), Disposition::Human, "")
            .build();
        assert_eq!(result.unwrap_err(), SetupError::DuplicateName("élodie".into()));
    }

    #[test]
    fn test_empty_encounter_rejected() {
        assert_eq!(Encounter::builder().build().unwrap_err(), SetupError::NoActors);
    }

    #[test]
    fn test_kickoff_prompt_when_empty() {
        let encounter = encounter();
        let request = encounter.turn_request(0).unwrap();
        assert_eq!(request.role, Role::Dm);
        assert_eq!(request.latest_input, KICKOFF_PROMPT);
        assert_eq!(request.char_class, "DM");
        assert_eq!(request.party_info.len(), 2);
        assert!(request.monsters.is_empty());
        assert_eq!(request.history_summary, "");
        assert_eq!(request.adventure_context, DEFAULT_ADVENTURE);
    }

    #[test]
    fn test_player_request_carries_class_actions() {
        let encounter = encounter();
        let request = encounter.turn_request(1).unwrap();
        assert_eq!(request.role, Role::Player);
        assert_eq!(request.model_id, "player-model");
        assert_eq!(request.char_name, "Thorin");
        assert_eq!(request.stats.hp, 12);
        assert_eq!(request.stats.ac, 16);
        assert!(request.valid_actions.contains(&"Second Wind".to_string()));
    }

    #[test]
    fn test_history_windows() {
        let mut encounter = encounter();
        for i in 0..25 {
            encounter.record_narration(0, &format!("line {i}"));
        }
        let history = encounter.conversation_history();
        assert_eq!(history.len(), HISTORY_ENTRIES);
        assert_eq!(history[0].content, "line 5");
        assert_eq!(history[0].role, "assistant");

        let summary = encounter.history_summary();
        assert!(summary.starts_with("[Dungeon Master] line 17"));
        assert!(summary.ends_with("[Dungeon Master] line 24"));
        assert_eq!(encounter.latest_input(), "line 24");
    }

    #[test]
    fn test_summary_is_shortened() {
        let mut encounter = encounter();
        let long = "word ".repeat(400);
        encounter.record_narration(1, &long);
        let summary = encounter.history_summary();
        assert!(summary.chars().count() <= SUMMARY_MAX_CHARS);
        assert!(summary.ends_with('…'));
        assert!(summary.starts_with("[Thorin] word"));
    }

    #[test]
    fn test_shorten_keeps_short_text() {
        assert_eq!(shorten("a  b\nc", 10), "a b c");
        assert_eq!(shorten("Hello world", 8), "Hello…");
    }

    #[test]
    fn test_reset() {
        let mut encounter = encounter();
        let thorin = encounter.actors()[1].combatant_id;
        let (registry, _) = encounter.parts_mut();
        registry.apply_damage(thorin, 5).unwrap();
        registry
            .register(crate::bestiary::find_template("Orc").unwrap().spawn("Orc"))
            .unwrap();
        encounter.record_narration(1, "I charge!");
        encounter.advance();

        encounter.reset();
        assert_eq!(encounter.turn(), 0);
        assert_eq!(encounter.state(), TurnState::AwaitingActor(0));
        assert!(encounter.transcript().is_empty());
        assert_eq!(encounter.registry().monsters().count(), 0);
        let thorin = encounter.registry().get(thorin).unwrap();
        assert_eq!(thorin.hit_points.current, thorin.hit_points.maximum);
    }

    #[test]
    fn test_party_defeated() {
        let mut encounter = encounter();
        assert!(!encounter.party_defeated());
        let ids: Vec<_> = encounter.registry().players().map(|p| p.id).collect();
        let (registry, _) = encounter.parts_mut();
        for id in ids {
            registry.apply_damage(id, 100).unwrap();
        }
        assert!(encounter.party_defeated());
    }

    #[test]
    fn test_transcript_roles() {
        let mut encounter = encounter();
        encounter.record_narration(0, "A door creaks.");
        encounter.record_narration(2, "I look around.");
        encounter.record_combat_log(&["💥 something".to_string()]);
        encounter.record_combat_log(&[]);
        let roles: Vec<_> = encounter.transcript().iter().map(|e| e.role).collect();
        assert_eq!(
            roles,
            vec![
                VisibilityRole::Assistant,
                VisibilityRole::User,
                VisibilityRole::System
            ]
        );
        assert!(encounter.transcript()[2].is_combat_log);
    }
}
