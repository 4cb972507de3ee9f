/// Rule evaluation
///
/// Walks a rule's zones against the cached model results of one frame.
/// Zones are tried in order and the first decisive zone ends the walk:
/// a satisfied exclusion stops the rule, otherwise the first satisfied
/// inclusion list triggers it.
use serde::Serialize;

use super::matcher::count_matches;
use super::rule::{MatchGroup, ModelConstraint, Notify, Zone};
use crate::detection::ResultCache;
use crate::error::InferenceError;

/// Outcome of one rule on one frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleEvaluation {
    /// An inclusion list was fully satisfied
    pub triggered: bool,
    /// An exclusion list was fully satisfied (inclusion was not checked)
    pub excluded: bool,
    /// The triggering list carried an advance-skip constraint
    pub advance_skip: bool,
    /// Qualifying detections in the triggering list
    pub hits: usize,
    /// Zone that decided the outcome
    pub zone: Option<String>,
    /// Whether the rule wants to fire, after negation
    pub fire_condition: bool,
}

/// Evaluate one rule. Disabled rules yield `None`.
pub fn evaluate_rule(
    rule: &Notify,
    cache: &mut ResultCache<'_>,
) -> Result<Option<RuleEvaluation>, InferenceError> {
    if !rule.is_enabled() {
        tracing::debug!("Rule {} disabled, skipping", rule.name);
        return Ok(None);
    }

    let mut evaluation = RuleEvaluation::default();

    for zone in &rule.zones {
        tracing::debug!("  Zone: {}", zone.name);

        if zone_excluded(zone, cache)? {
            tracing::debug!("  Zone {} excluded", zone.name);
            evaluation.excluded = true;
            evaluation.zone = Some(zone.name.clone());
            break;
        }

        if let Some((hits, advance_skip)) = zone_included(zone, cache)? {
            evaluation.triggered = true;
            evaluation.hits = hits;
            evaluation.advance_skip = advance_skip;
            evaluation.zone = Some(zone.name.clone());
            break;
        }
    }

    evaluation.fire_condition = evaluation.triggered != rule.negate;
    Ok(Some(evaluation))
}

fn zone_excluded(zone: &Zone, cache: &mut ResultCache<'_>) -> Result<bool, InferenceError> {
    for group in &zone.exclude {
        if first_satisfied(group, cache)?.is_some() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Hits and advance-skip of the first satisfied inclusion list
fn zone_included(
    zone: &Zone,
    cache: &mut ResultCache<'_>,
) -> Result<Option<(usize, bool)>, InferenceError> {
    for group in &zone.include {
        if let Some(found) = first_satisfied(group, cache)? {
            tracing::debug!("    Triggered by {}", group.name);
            return Ok(Some(found));
        }
    }
    Ok(None)
}

fn first_satisfied(
    group: &MatchGroup,
    cache: &mut ResultCache<'_>,
) -> Result<Option<(usize, bool)>, InferenceError> {
    for list in &group.alternatives {
        if let Some(hits) = list_hits(list, cache)? {
            let advance_skip = list.iter().any(|c| c.advance_skip);
            return Ok(Some((hits, advance_skip)));
        }
    }
    Ok(None)
}

/// Total matches when every constraint reaches its counter.
///
/// Stops at the first constraint that falls short, so later models in the
/// list are never asked. An empty list is never satisfied.
fn list_hits(
    list: &[ModelConstraint],
    cache: &mut ResultCache<'_>,
) -> Result<Option<usize>, InferenceError> {
    if list.is_empty() {
        return Ok(None);
    }

    let mut total = 0;
    for constraint in list {
        let matched = count_matches(cache.detections(&constraint.model, &constraint.category)?, constraint);
        tracing::debug!(
            "    {}:{} matched {} of {} needed",
            constraint.model,
            constraint.category,
            matched,
            constraint.counter
        );
        if matched < constraint.counter {
            return Ok(None);
        }
        total += matched;
    }
    Ok(Some(total))
}
