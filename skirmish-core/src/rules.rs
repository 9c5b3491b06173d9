//! Rules engine with an Intent/Effect pipeline.
//!
//! 1. Narration is scanned for intents (see [`crate::narrative`])
//! 2. [`RulesEngine::resolve`] turns each intent into effects using the dice
//! 3. [`apply_effects`] mutates the registry and reports combat-log lines
//!
//! Resolution only reads the registry, so the outcome of an intent can be
//! inspected before anything changes.

use crate::bestiary::find_template;
use crate::combat::{self, AttackResolution};
use crate::combatant::{Combatant, CombatantId, CombatantKind};
use crate::narrative::{self, CueKind, Extraction};
use crate::registry::Registry;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Something a narration says should happen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    /// Roll an attack from one combatant against another
    Attack {
        attacker_id: CombatantId,
        target_id: CombatantId,
    },

    /// Flat damage stated in the narration
    Damage { target_id: CombatantId, amount: i32 },

    /// Flat healing stated in the narration
    Heal { target_id: CombatantId, amount: i32 },

    /// Ensure `count` monsters of a bestiary template exist
    Spawn { template: String, count: usize },
}

/// The result of resolving an intent.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub effects: Vec<Effect>,
    pub narrative: String,
}

impl Resolution {
    pub fn new(narrative: impl Into<String>) -> Self {
        Self {
            effects: Vec::new(),
            narrative: narrative.into(),
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Concrete state changes to apply to the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// An attack was rolled; a hit deals `resolution.damage` to the target
    AttackResolved {
        attacker_id: CombatantId,
        target_id: CombatantId,
        attacker_name: String,
        target_name: String,
        resolution: AttackResolution,
    },

    /// HP changed by a flat amount (negative for damage)
    HpChanged {
        target_id: CombatantId,
        amount: i32,
        new_current: i32,
        new_max: i32,
        dropped_to_zero: bool,
    },

    /// A monster joins the encounter
    Spawned { combatant: Combatant },
}

/// Resolves intents against the current registry.
#[derive(Debug, Clone, Copy)]
pub struct RulesEngine;

impl RulesEngine {
    pub fn new() -> Self {
        Self
    }

    /// Resolve an intent. Never mutates the registry.
    pub fn resolve<R: Rng + ?Sized>(
        &self,
        registry: &Registry,
        intent: &Intent,
        rng: &mut R,
    ) -> Resolution {
        match intent {
            Intent::Attack {
                attacker_id,
                target_id,
            } => self.resolve_attack(registry, *attacker_id, *target_id, rng),
            Intent::Damage { target_id, amount } => {
                self.resolve_hp_change(registry, *target_id, -amount.saturating_abs())
            }
            Intent::Heal { target_id, amount } => {
                self.resolve_hp_change(registry, *target_id, amount.saturating_abs())
            }
            Intent::Spawn { template, count } => self.resolve_spawn(registry, template, *count),
        }
    }

    fn resolve_attack<R: Rng + ?Sized>(
        &self,
        registry: &Registry,
        attacker_id: CombatantId,
        target_id: CombatantId,
        rng: &mut R,
    ) -> Resolution {
        let (Some(attacker), Some(target)) = (registry.get(attacker_id), registry.get(target_id))
        else {
            return Resolution::new("The attack has no valid participants.");
        };

        let resolution = combat::resolve_attack_with_rng(
            attacker.attack_modifier(),
            &attacker.damage_notation(),
            target.armor_class,
            rng,
        );

        Resolution::new(format!(
            "{} attacks {} and {}",
            attacker.name,
            target.name,
            resolution.describe()
        ))
        .with_effect(Effect::AttackResolved {
            attacker_id,
            target_id,
            attacker_name: attacker.name.clone(),
            target_name: target.name.clone(),
            resolution,
        })
    }

    fn resolve_hp_change(&self, registry: &Registry, target_id: CombatantId, amount: i32) -> Resolution {
        let Some(target) = registry.get(target_id) else {
            return Resolution::new("The target is not part of this encounter.");
        };

        let hp = target.hit_points;
        let new_current = hp.current.saturating_add(amount).clamp(0, hp.maximum);
        let narrative = if amount < 0 {
            format!("{} takes {} damage", target.name, -amount)
        } else {
            format!("{} heals {} HP", target.name, amount)
        };

        Resolution::new(narrative).with_effect(Effect::HpChanged {
            target_id,
            amount,
            new_current,
            new_max: hp.maximum,
            dropped_to_zero: hp.current > 0 && new_current == 0,
        })
    }

    fn resolve_spawn(&self, registry: &Registry, template: &str, count: usize) -> Resolution {
        let Some(template) = find_template(template) else {
            return Resolution::new(format!("No creature called {template} is known."));
        };

        let spawned: Vec<Effect> = (1..=count)
            .map(|n| template.instance_name(n))
            .filter(|name| !registry.contains_name(name))
            .map(|name| Effect::Spawned {
                combatant: template.spawn(name),
            })
            .collect();

        Resolution::new(format!("{count} {} present", template.plural)).with_effects(spawned)
    }
}

impl Default for RulesEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply effects to the registry, returning combat-log lines.
pub fn apply_effects(registry: &mut Registry, effects: &[Effect]) -> Vec<String> {
    effects
        .iter()
        .filter_map(|effect| apply_effect(registry, effect))
        .collect()
}

/// Apply a single effect to the registry.
pub fn apply_effect(registry: &mut Registry, effect: &Effect) -> Option<String> {
    match effect {
        Effect::AttackResolved {
            target_id,
            attacker_name,
            target_name,
            resolution,
            ..
        } => {
            let mut line = format!(
                "⚔️ {attacker_name} attacks {target_name}: {}",
                resolution.describe()
            );
            if resolution.hit && resolution.damage > 0 {
                match registry.apply_damage(*target_id, resolution.damage) {
                    Ok(_) => {
                        if let Some(target) = registry.get(*target_id) {
                            line.push_str(&hp_suffix(target));
                        }
                    }
                    Err(e) => tracing::warn!("attack damage not applied: {e}"),
                }
            }
            Some(line)
        }
        Effect::HpChanged {
            target_id, amount, ..
        } => {
            let applied = if *amount < 0 {
                registry.apply_damage(*target_id, *amount)
            } else {
                registry.apply_heal(*target_id, *amount)
            };
            let actual = match applied {
                Ok(actual) => actual,
                Err(e) => {
                    tracing::warn!("hp change not applied: {e}");
                    return None;
                }
            };
            let target = registry.get(*target_id)?;
            Some(if *amount < 0 {
                if target.is_alive() {
                    format!(
                        "💥 {} took {actual} damage → {} HP",
                        target.name,
                        target.hp_display()
                    )
                } else {
                    format!("💀 {} took {actual} damage and falls!", target.name)
                }
            } else {
                format!(
                    "💚 {} healed {actual} HP → {} HP",
                    target.name,
                    target.hp_display()
                )
            })
        }
        Effect::Spawned { combatant } => {
            let summary = format!(
                "👹 {} joins the fight (HP {}, AC {})",
                combatant.name,
                combatant.hp_display(),
                combatant.armor_class
            );
            match registry.register(combatant.clone()) {
                Ok(_) => Some(summary),
                Err(e) => {
                    tracing::warn!("spawn not applied: {e}");
                    None
                }
            }
        }
    }
}

fn hp_suffix(target: &Combatant) -> String {
    if target.is_alive() {
        format!(". {} is at {} HP", target.name, target.hp_display())
    } else {
        format!(". 💀 {} falls!", target.name)
    }
}

/// Everything one narration did to the encounter.
#[derive(Debug, Clone, Default)]
pub struct NarrationOutcome {
    pub extraction: Extraction,
    pub effects: Vec<Effect>,
    pub log: Vec<String>,
}

/// Run the spawn, attack and cue passes over a narration, applying each
/// resolved intent before the next is resolved.
///
/// Only narration written by the Dungeon Master can introduce creatures.
pub fn process_narration<R: Rng + ?Sized>(
    registry: &mut Registry,
    text: &str,
    author: CombatantKind,
    rng: &mut R,
) -> NarrationOutcome {
    let engine = RulesEngine::new();
    let mut outcome = NarrationOutcome::default();

    if author == CombatantKind::DungeonMaster {
        outcome.extraction.spawns = narrative::extract_spawns(text);
        let intents: Vec<Intent> = outcome
            .extraction
            .spawns
            .iter()
            .map(|s| Intent::Spawn {
                template: s.template.name.to_string(),
                count: s.count,
            })
            .collect();
        for intent in &intents {
            execute(&engine, registry, intent, rng, &mut outcome);
        }
    }

    narrative::extract_combat(registry, text, &mut outcome.extraction);

    let attacks = outcome.extraction.attacks.iter().map(|a| Intent::Attack {
        attacker_id: a.attacker.id,
        target_id: a.target.id,
    });
    let cues = outcome.extraction.cues.iter().map(|c| match c.kind {
        CueKind::Damage => Intent::Damage {
            target_id: c.target.id,
            amount: c.amount,
        },
        CueKind::Heal => Intent::Heal {
            target_id: c.target.id,
            amount: c.amount,
        },
    });
    let intents: Vec<Intent> = attacks.chain(cues).collect();

    for intent in &intents {
        execute(&engine, registry, intent, rng, &mut outcome);
    }

    outcome
}

fn execute<R: Rng + ?Sized>(
    engine: &RulesEngine,
    registry: &mut Registry,
    intent: &Intent,
    rng: &mut R,
    outcome: &mut NarrationOutcome,
) {
    let resolution = engine.resolve(registry, intent, rng);
    if resolution.effects.is_empty() {
        tracing::debug!(narrative = %resolution.narrative, "intent produced no effects");
        return;
    }
    outcome.log.extend(apply_effects(registry, &resolution.effects));
    outcome.effects.extend(resolution.effects);
}
