/// Notification controller
///
/// Turns rule evaluations into fired notifications. Each rule passes through
/// `Idle → Matching → Firing` within one cycle; the phase and hit count are
/// rebuilt from scratch every cycle, only the cooldown of a fired rule
/// carries over.
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime};

use super::action::Notifier;
use crate::camera::Camera;
use crate::detection::ResultCache;
use crate::error::InferenceError;
use crate::rules::{evaluate_rule, Notify, RuleEvaluation};
use crate::utils::Debouncer;

/// Per-rule phase within the current cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Phase {
    /// Nothing matched
    #[default]
    Idle,

    /// Matches found, not enough to fire
    Matching { hits: usize },

    /// Fire condition met
    Firing,
}

impl Phase {
    /// Phase reached by a rule after one evaluation
    pub fn after(rule: &Notify, evaluation: &RuleEvaluation) -> Self {
        if !evaluation.fire_condition {
            return if evaluation.hits > 0 {
                Phase::Matching {
                    hits: evaluation.hits,
                }
            } else {
                Phase::Idle
            };
        }

        // Negated rules fire on absence, there is nothing to count
        if rule.negate || evaluation.hits >= rule.min_hits {
            Phase::Firing
        } else {
            Phase::Matching {
                hits: evaluation.hits,
            }
        }
    }

    pub fn is_firing(&self) -> bool {
        matches!(self, Phase::Firing)
    }
}

/// Rule identity: camera name and rule name
type RuleKey = (String, String);

/// Result of one camera cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    /// At least one rule reached `Firing`
    pub triggered: bool,
    /// Re-evaluate the same camera on the next step
    pub advance_skip: bool,
    /// Notifications delivered successfully
    pub fired: usize,
    /// Notifications suppressed by a cooldown
    pub suppressed: usize,
    pub notify_time: Duration,
}

pub struct NotificationController {
    notifier: Box<dyn Notifier>,
    phases: HashMap<RuleKey, Phase>,
    cooldowns: HashMap<RuleKey, Debouncer>,
}

impl NotificationController {
    pub fn new(notifier: Box<dyn Notifier>) -> Self {
        Self {
            notifier,
            phases: HashMap::new(),
            cooldowns: HashMap::new(),
        }
    }

    /// Evaluate every rule of `camera` against one frame's cache.
    ///
    /// Inference failures abort the cycle; notification failures are logged
    /// and the remaining rules still run.
    pub fn run_cycle(
        &mut self,
        camera: &Camera,
        cache: &mut ResultCache<'_>,
    ) -> Result<CycleOutcome, InferenceError> {
        let mut outcome = CycleOutcome::default();

        for rule in &camera.rules {
            let key = (camera.name.clone(), rule.name.clone());
            self.phases.insert(key.clone(), Phase::Idle);

            let Some(evaluation) = evaluate_rule(rule, cache)? else {
                rule.record_evaluation(false, None);
                continue;
            };

            let phase = Phase::after(rule, &evaluation);
            tracing::debug!("Camera {} rule {}: {:?} {:?}", camera.name, rule.name, evaluation, phase);
            self.phases.insert(key.clone(), phase);

            outcome.advance_skip |= evaluation.advance_skip;

            let mut fired_at = None;
            if phase.is_firing() {
                outcome.triggered = true;

                let cooldown = self
                    .cooldowns
                    .entry(key)
                    .or_insert_with(|| Debouncer::new(rule.retry_in));

                if cooldown.should_trigger() {
                    let start = Instant::now();
                    match self.notifier.fire(&camera.name, rule) {
                        Ok(()) => {
                            outcome.fired += 1;
                            fired_at = Some(SystemTime::now());
                        }
                        Err(e) => {
                            tracing::warn!("Camera {} rule {}: notification failed: {}", camera.name, rule.name, e);
                            // Only a delivered notification starts the quiet period
                            cooldown.reset();
                        }
                    }
                    outcome.notify_time += start.elapsed();
                } else {
                    tracing::debug!("Camera {} rule {}: cooling down", camera.name, rule.name);
                    outcome.suppressed += 1;
                }
            }

            rule.record_evaluation(evaluation.triggered, fired_at);
        }

        camera.set_triggered(outcome.triggered);
        Ok(outcome)
    }

    /// Phase a rule reached in its camera's most recent cycle
    pub fn phase(&self, camera: &str, rule: &str) -> Phase {
        self.phases
            .get(&(camera.to_string(), rule.to_string()))
            .copied()
            .unwrap_or_default()
    }
}
