//! Combatant registry.
//!
//! Holds every participant of an encounter in registration order and maps
//! free-text name fragments from narration back to combatants.
//!
//! Name resolution is a best-effort matcher:
//! 1. exact case-insensitive match on the full name
//! 2. otherwise the first combatant (in registration order) whose name
//!    contains the fragment, or whose name is contained in the fragment
//!
//! Ambiguity is not hidden: [`NameMatch`] reports how the match was made and
//! which other combatants would also have matched.

use crate::combatant::{Combatant, CombatantId, CombatantKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shortest fragment allowed to match by containment.
const MIN_FUZZY_LEN: usize = 2;

const LEADING_ARTICLES: [&str; 3] = ["the ", "an ", "a "];

/// Errors from registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("A combatant named '{0}' is already registered")]
    DuplicateName(String),

    #[error("Unknown combatant: {0}")]
    UnknownCombatant(CombatantId),
}

/// How a name fragment was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchConfidence {
    /// The fragment equals the name, ignoring case.
    Exact,
    /// The fragment is part of the name ("gob" -> "Goblin").
    FragmentInName,
    /// The name is part of the fragment ("the old Goblin" -> "Goblin").
    NameInFragment,
}

/// Result of resolving a name fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameMatch {
    pub id: CombatantId,
    pub name: String,
    pub confidence: MatchConfidence,
    /// Other combatants that also matched, in registration order.
    pub alternatives: Vec<CombatantId>,
}

impl NameMatch {
    pub fn is_ambiguous(&self) -> bool {
        !self.alternatives.is_empty()
    }
}

/// All combatants of an encounter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    combatants: Vec<Combatant>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a combatant and return its id.
    ///
    /// A name already in use is an error for players and the DM. Monsters
    /// are renamed instead: `Goblin` becomes `Goblin 2`, `Goblin 3`, ...
    pub fn register(&mut self, mut combatant: Combatant) -> Result<CombatantId, RegistryError> {
        if self.contains_name(&combatant.name) {
            match combatant.kind {
                CombatantKind::Monster => {
                    combatant.name = self.next_free_name(&combatant.name);
                }
                CombatantKind::Player | CombatantKind::DungeonMaster => {
                    return Err(RegistryError::DuplicateName(combatant.name));
                }
            }
        }

        let id = combatant.id;
        tracing::debug!(name = %combatant.name, kind = %combatant.kind, "registered combatant");
        self.combatants.push(combatant);
        Ok(id)
    }

    fn next_free_name(&self, base: &str) -> String {
        (2..)
            .map(|n| format!("{base} {n}"))
            .find(|candidate| !self.contains_name(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.get_by_name(name).is_some()
    }

    pub fn get(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.id == id)
    }

    fn get_mut(&mut self, id: CombatantId) -> Result<&mut Combatant, RegistryError> {
        self.combatants
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(RegistryError::UnknownCombatant(id))
    }

    /// Exact case-insensitive lookup.
    pub fn get_by_name(&self, name: &str) -> Option<&Combatant> {
        let key = name_key(name);
        self.combatants.iter().find(|c| name_key(&c.name) == key)
    }

    /// Find the combatant a narration fragment refers to.
    pub fn find(&self, fragment: &str) -> Option<&Combatant> {
        self.resolve(fragment).and_then(|m| self.get(m.id))
    }

    /// Resolve a narration fragment, reporting confidence and ambiguity.
    pub fn resolve(&self, fragment: &str) -> Option<NameMatch> {
        let needle = normalize_fragment(fragment);
        if needle.is_empty() {
            return None;
        }

        if let Some(exact) = self
            .combatants
            .iter()
            .find(|c| name_key(&c.name) == needle)
        {
            return Some(NameMatch {
                id: exact.id,
                name: exact.name.clone(),
                confidence: MatchConfidence::Exact,
                alternatives: Vec::new(),
            });
        }

        if needle.chars().count() < MIN_FUZZY_LEN {
            return None;
        }

        let mut candidates = self.combatants.iter().filter_map(|c| {
            let name = name_key(&c.name);
            if name.contains(&needle) {
                Some((c, MatchConfidence::FragmentInName))
            } else if needle.contains(&name) {
                Some((c, MatchConfidence::NameInFragment))
            } else {
                None
            }
        });

        let (first, confidence) = candidates.next()?;
        Some(NameMatch {
            id: first.id,
            name: first.name.clone(),
            confidence,
            alternatives: candidates.map(|(c, _)| c.id).collect(),
        })
    }

    /// Apply damage, clamped at 0 HP. Returns the HP actually removed.
    pub fn apply_damage(&mut self, id: CombatantId, amount: i32) -> Result<i32, RegistryError> {
        Ok(self.get_mut(id)?.hit_points.take_damage(amount))
    }

    /// Apply healing, clamped at maximum HP. Returns the HP actually restored.
    pub fn apply_heal(&mut self, id: CombatantId, amount: i32) -> Result<i32, RegistryError> {
        Ok(self.get_mut(id)?.hit_points.heal(amount))
    }

    /// Iterate in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.iter()
    }

    pub fn players(&self) -> impl Iterator<Item = &Combatant> {
        self.of_kind(CombatantKind::Player)
    }

    pub fn monsters(&self) -> impl Iterator<Item = &Combatant> {
        self.of_kind(CombatantKind::Monster)
    }

    fn of_kind(&self, kind: CombatantKind) -> impl Iterator<Item = &Combatant> {
        self.combatants.iter().filter(move |c| c.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.combatants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }
}

/// Case-folded form every name comparison uses.
fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Lower-case, trim punctuation and drop one leading article.
fn normalize_fragment(fragment: &str) -> String {
    let trimmed = fragment
        .trim()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();

    LEADING_ARTICLES
        .iter()
        .find_map(|article| trimmed.strip_prefix(article))
        .map(|rest| rest.trim().to_string())
        .unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bestiary::find_template;
    use crate::combatant::AbilityScores;
    use crate::dice::DamageDice;

    fn player(name: &str, hp: i32) -> Combatant {
        Combatant::new(
            name,
            CombatantKind::Player,
            AbilityScores::default(),
            hp,
            12,
            DamageDice::new(1, 8),
        )
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register(player("Thorin", 20)).unwrap();
        registry.register(player("Elara", 14)).unwrap();
        registry
            .register(find_template("Goblin").unwrap().spawn("Goblin"))
            .unwrap();
        registry
    }

    #[test]
    fn test_duplicate_player_rejected() {
        let mut registry = registry();
        let err = registry.register(player("thorin", 10)).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("thorin".to_string()));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_duplicate_check_folds_non_ascii_case() {
        let mut registry = Registry::new();
        registry.register(player("Élodie", 10)).unwrap();
        let err = registry.register(player("élodie", 10)).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("élodie".to_string()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_by_name("ÉLODIE").unwrap().name, "Élodie");
        assert_eq!(registry.resolve("élodie").unwrap().confidence, MatchConfidence::Exact);
    }

    #[test]
    fn test_duplicate_monster_renamed() {
        let mut registry = registry();
        let goblin = find_template("Goblin").unwrap();
        let second = registry.register(goblin.spawn("Goblin")).unwrap();
        let third = registry.register(goblin.spawn("Goblin")).unwrap();
        assert_eq!(registry.get(second).unwrap().name, "Goblin 2");
        assert_eq!(registry.get(third).unwrap().name, "Goblin 3");
    }

    #[test]
    fn test_find_exact_ignores_case() {
        let registry = registry();
        let m = registry.resolve("THORIN").unwrap();
        assert_eq!(m.name, "Thorin");
        assert_eq!(m.confidence, MatchConfidence::Exact);
        assert!(!m.is_ambiguous());
    }

    #[test]
    fn test_find_strips_article() {
        let registry = registry();
        let m = registry.resolve("the goblin").unwrap();
        assert_eq!(m.name, "Goblin");
        assert_eq!(m.confidence, MatchConfidence::Exact);
    }

    #[test]
    fn test_fragment_in_name() {
        let registry = registry();
        let m = registry.resolve("Thor").unwrap();
        assert_eq!(m.name, "Thorin");
        assert_eq!(m.confidence, MatchConfidence::FragmentInName);
    }

    #[test]
    fn test_name_in_fragment() {
        let registry = registry();
        let m = registry.resolve("brave Elara").unwrap();
        assert_eq!(m.name, "Elara");
        assert_eq!(m.confidence, MatchConfidence::NameInFragment);
    }

    #[test]
    fn test_ambiguity_reported_first_registered_wins() {
        let mut registry = registry();
        registry
            .register(find_template("Goblin").unwrap().spawn("Goblin"))
            .unwrap();
        let m = registry.resolve("gob").unwrap();
        assert_eq!(m.name, "Goblin");
        assert_eq!(m.alternatives.len(), 1);
        assert!(m.is_ambiguous());
    }

    #[test]
    fn test_unknown_and_tiny_fragments() {
        let registry = registry();
        assert!(registry.find("Dragon").is_none());
        assert!(registry.find("").is_none());
        assert!(registry.find("e").is_none());
    }

    #[test]
    fn test_find_is_idempotent() {
        let registry = registry();
        let first = registry.find("gob").map(|c| c.id);
        let second = registry.find("gob").map(|c| c.id);
        assert_eq!(first, second);
        assert!(first.is_some());
    }

    #[test]
    fn test_damage_and_heal_clamp() {
        let mut registry = registry();
        let thorin = registry.get_by_name("Thorin").unwrap().id;

        assert_eq!(registry.apply_damage(thorin, 5).unwrap(), 5);
        assert_eq!(registry.apply_damage(thorin, 100).unwrap(), 15);
        assert_eq!(registry.get(thorin).unwrap().hit_points.current, 0);
        assert!(!registry.get(thorin).unwrap().is_alive());

        assert_eq!(registry.apply_heal(thorin, 50).unwrap(), 20);
        assert_eq!(registry.get(thorin).unwrap().hit_points.current, 20);
    }

    #[test]
    fn test_unknown_id() {
        let mut registry = registry();
        let id = CombatantId::new();
        assert_eq!(
            registry.apply_damage(id, 1),
            Err(RegistryError::UnknownCombatant(id))
        );
    }

    #[test]
    fn test_kind_filters() {
        let registry = registry();
        assert_eq!(registry.players().count(), 2);
        assert_eq!(registry.monsters().count(), 1);
    }
}
