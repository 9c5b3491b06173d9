//! Intent extraction from free-form narration.
//!
//! Three independent passes scan a narration string:
//!
//! - **spawn**: creature introductions such as "two goblins" or "an ogre"
//! - **attack**: "<name> attacks|strikes|casts ... at <name>"
//! - **cue**: explicit numbers such as "Thorin takes 5 damage"
//!
//! Every pass tolerates text with no matches. Extraction never mutates the
//! registry; see [`crate::rules::process_narration`] for the full pipeline.
//!
//! Attack intents win over cues: a cue that starts inside a resolved attack
//! phrase, or damages that attack's target, is reported as suppressed.

use crate::bestiary::{find_template, MonsterTemplate, BESTIARY};
use crate::registry::{MatchConfidence, NameMatch, Registry};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Upper bound on monsters introduced by a single numeral.
pub const MAX_SPAWN_COUNT: usize = 10;

lazy_static! {
    static ref ATTACK_RE: Regex = Regex::new(
        r"(?x)
        \b(?P<attacker>(?:[Tt]he\s+)?[A-Za-z][\w'-]*(?:\s+[A-Z][\w'-]*)*(?:\s+\d+)?)
        \s+(?P<verb>
            attacks
            | strikes
            | swings\s+at
            | shoots(?:\s+at)?
            | fires\s+at
            | lunges\s+at
            | (?:casts|hurls)\s+[^.!?\n]{1,40}?\s+(?:at|on)
        )
        \s+(?P<target>(?:[Tt]he\s+)?[A-Za-z][\w'-]*(?:\s+[A-Z][\w'-]*)*(?:\s+\d+)?)"
    )
    .expect("attack pattern is valid");

    static ref DAMAGE_CUE_RE: Regex = Regex::new(
        r"(?i)\b(\w[\w\s]{0,20}?)\s+(?:takes?|receives?|suffers?)\s+(\d+)\s+(?:points?\s+of\s+)?damage"
    )
    .expect("damage cue pattern is valid");

    static ref HEAL_CUE_RE: Regex = Regex::new(
        r"(?i)\b(\w[\w\s]{0,20}?)\s+(?:heals?|recovers?|regains?)\s+(\d+)\s+(?:hit\s*points?|hp)"
    )
    .expect("heal cue pattern is valid");

    static ref SPAWN_RE: Regex = {
        let mut names: Vec<&str> = BESTIARY
            .iter()
            .flat_map(|t| [t.name, t.plural])
            .collect();
        // Longest first so "Hobgoblins" is preferred over "Hobgoblin".
        names.sort_by_key(|n| std::cmp::Reverse(n.len()));
        let alternatives = names
            .iter()
            .map(|n| regex::escape(n))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(
            r"(?i)\b(?P<count>\d+|an?|the|one|two|three|four|five)\s+(?P<name>{alternatives})\b"
        ))
        .expect("spawn pattern is valid")
    };
}

// ============================================================================
// Extracted values
// ============================================================================

/// A resolved "<attacker> attacks <target>" phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackIntent {
    pub attacker: NameMatch,
    pub target: NameMatch,
    /// Byte span of the whole phrase in the narration.
    pub span: Range<usize>,
    pub text: String,
}

/// Whether a cue damages or heals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CueKind {
    Damage,
    Heal,
}

/// An explicit "X takes N damage" / "X regains N hp" statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cue {
    pub kind: CueKind,
    pub target: NameMatch,
    pub amount: i32,
    pub span: Range<usize>,
    pub text: String,
}

/// A creature introduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnIntent {
    pub template: &'static MonsterTemplate,
    pub count: usize,
}

/// Why a phrase was recognised but not turned into an intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropReason {
    UnknownAttacker(String),
    UnknownTarget(String),
    /// Attacker and target resolved to the same combatant.
    SelfTarget(String),
    /// The amount in a cue does not fit an `i32`.
    BadAmount(String),
}

/// A recognised phrase that produced no intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedMatch {
    pub text: String,
    pub span: Range<usize>,
    pub reason: DropReason,
}

/// Everything found in one narration.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub spawns: Vec<SpawnIntent>,
    pub attacks: Vec<AttackIntent>,
    pub cues: Vec<Cue>,
    /// Cues that restate an attack: inside its phrase or damaging its target.
    pub suppressed_cues: Vec<Cue>,
    pub dropped: Vec<DroppedMatch>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.spawns.is_empty() && self.attacks.is_empty() && self.cues.is_empty()
    }
}

// ============================================================================
// Passes
// ============================================================================

/// Run every pass against the registry as it currently is.
///
/// Creatures introduced by the narration are not registered yet, so attacks
/// on them are dropped here; the rules pipeline runs the spawn pass first.
pub fn extract(registry: &Registry, text: &str) -> Extraction {
    let mut extraction = Extraction {
        spawns: extract_spawns(text),
        ..Default::default()
    };
    extract_combat(registry, text, &mut extraction);
    extraction
}

/// Attack then cue pass, appending to `extraction`.
pub fn extract_combat(registry: &Registry, text: &str, extraction: &mut Extraction) {
    let (attacks, dropped) = extract_attacks(registry, text);
    extraction.attacks.extend(attacks);
    extraction.dropped.extend(dropped);

    let cues = extract_cues(registry, text);
    for cue in cues.resolved {
        if extraction.attacks.iter().any(|attack| restates(attack, &cue)) {
            tracing::debug!(cue = %cue.text, "cue restates an attack; suppressed");
            extraction.suppressed_cues.push(cue);
        } else {
            extraction.cues.push(cue);
        }
    }
    extraction.dropped.extend(cues.dropped);
}

/// Creature introductions, one entry per template in order of first mention.
///
/// Repeated mentions of a template keep the largest count.
pub fn extract_spawns(text: &str) -> Vec<SpawnIntent> {
    let mut spawns: Vec<SpawnIntent> = Vec::new();

    for caps in SPAWN_RE.captures_iter(text) {
        let (Some(count), Some(name)) = (caps.name("count"), caps.name("name")) else {
            continue;
        };
        let Some(template) = find_template(name.as_str()) else {
            continue;
        };
        let count = parse_count(count.as_str()).min(MAX_SPAWN_COUNT);
        if count == 0 {
            continue;
        }

        match spawns.iter_mut().find(|s| s.template.name == template.name) {
            Some(existing) => existing.count = existing.count.max(count),
            None => spawns.push(SpawnIntent { template, count }),
        }
    }

    spawns
}

fn parse_count(word: &str) -> usize {
    match word.to_lowercase().as_str() {
        "a" | "an" | "the" | "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        // only digits reach here, so a failed parse means overflow
        digits => digits.parse().unwrap_or(MAX_SPAWN_COUNT),
    }
}

/// Attack phrases resolved against the registry.
pub fn extract_attacks(registry: &Registry, text: &str) -> (Vec<AttackIntent>, Vec<DroppedMatch>) {
    let mut attacks = Vec::new();
    let mut dropped = Vec::new();

    for caps in ATTACK_RE.captures_iter(text) {
        let (Some(whole), Some(attacker), Some(target)) =
            (caps.get(0), caps.name("attacker"), caps.name("target"))
        else {
            continue;
        };
        let discard = |reason| DroppedMatch {
            text: whole.as_str().to_string(),
            span: whole.range(),
            reason,
        };

        let Some(attacker_match) = registry.resolve(attacker.as_str()) else {
            dropped.push(discard(DropReason::UnknownAttacker(attacker.as_str().to_string())));
            continue;
        };
        let Some(target_match) = registry.resolve(target.as_str()) else {
            dropped.push(discard(DropReason::UnknownTarget(target.as_str().to_string())));
            continue;
        };
        if attacker_match.id == target_match.id {
            dropped.push(discard(DropReason::SelfTarget(attacker_match.name.clone())));
            continue;
        }

        attacks.push(AttackIntent {
            attacker: attacker_match,
            target: target_match,
            span: whole.range(),
            text: whole.as_str().to_string(),
        });
    }

    for d in &dropped {
        tracing::debug!(text = %d.text, reason = ?d.reason, "dropped attack phrase");
    }

    (attacks, dropped)
}

/// Cues found in a narration, before attack precedence is applied.
#[derive(Debug, Clone, Default)]
pub struct CueScan {
    pub resolved: Vec<Cue>,
    pub dropped: Vec<DroppedMatch>,
}

/// Numeric damage and heal statements, damage first then heals.
pub fn extract_cues(registry: &Registry, text: &str) -> CueScan {
    let mut scan = CueScan::default();

    for (kind, re) in [(CueKind::Damage, &*DAMAGE_CUE_RE), (CueKind::Heal, &*HEAL_CUE_RE)] {
        for caps in re.captures_iter(text) {
            let (Some(whole), Some(name), Some(amount)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            let fragment = name.as_str().trim();
            let discard = |reason| DroppedMatch {
                text: whole.as_str().to_string(),
                span: whole.range(),
                reason,
            };

            let Ok(amount) = amount.as_str().parse::<i32>() else {
                scan.dropped
                    .push(discard(DropReason::BadAmount(amount.as_str().to_string())));
                continue;
            };
            let Some((target, start)) = resolve_cue_target(registry, name) else {
                tracing::debug!(fragment, "cue names no known combatant");
                scan.dropped
                    .push(discard(DropReason::UnknownTarget(fragment.to_string())));
                continue;
            };

            scan.resolved.push(Cue {
                kind,
                target,
                amount,
                span: start..whole.end(),
                text: text[start..whole.end()].to_string(),
            });
        }
    }

    scan
}

/// Resolve the words nearest the cue verb first, so "Goblin and Elara takes"
/// names Elara. An exact name wins over a partial one. Returns the match and
/// the byte offset where the naming words start.
fn resolve_cue_target(registry: &Registry, name: regex::Match<'_>) -> Option<(NameMatch, usize)> {
    let words = name.as_str();
    let mut after_space = true;
    let starts: Vec<usize> = words
        .char_indices()
        .filter_map(|(i, c)| {
            let starts_word = after_space && !c.is_whitespace();
            after_space = c.is_whitespace();
            starts_word.then_some(i)
        })
        .collect();

    let mut partial = None;
    for &offset in starts.iter().rev() {
        let Some(found) = registry.resolve(&words[offset..]) else {
            continue;
        };
        let start = name.start() + offset;
        if found.confidence == MatchConfidence::Exact {
            return Some((found, start));
        }
        partial.get_or_insert((found, start));
    }
    partial
}

/// A cue repeats an attack when it begins inside the attack phrase, or when
/// it reports damage to the attack's target.
fn restates(attack: &AttackIntent, cue: &Cue) -> bool {
    attack.span.contains(&cue.span.start)
        || (cue.kind == CueKind::Damage && cue.target.id == attack.target.id)
}
