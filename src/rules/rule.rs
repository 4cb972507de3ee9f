/// Notification rule definitions
///
/// Built once from the configuration document and never mutated afterwards,
/// except for the control flags guarded by a lock inside `Notify`.
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::geometry::Polygon;

/// Attribute and geometry predicate for one model/category pair
#[derive(Debug, Clone)]
pub struct ModelConstraint {
    /// Model to ask (key into the model list)
    pub model: String,
    /// Detection category to look at
    pub category: String,
    /// Confidence floor (inclusive)
    pub confidence: f64,
    /// Width range, lower bound inclusive, upper bound exclusive
    pub min_width: f64,
    pub max_width: f64,
    /// Height range, lower bound inclusive, upper bound exclusive
    pub min_height: f64,
    pub max_height: f64,
    /// Region the detection's base point must fall into
    pub polygon: Arc<Polygon>,
    /// Name of the shared polygon, when the region came from the dictionary
    pub polygon_name: Option<String>,
    /// Matching detections needed for this constraint to count as a hit
    pub counter: usize,
    /// Ask for the same camera again on the next scheduler step
    pub advance_skip: bool,
}

/// Alternatives of conjunctive model lists; any satisfied list decides the group
#[derive(Debug, Clone)]
pub struct MatchGroup {
    pub name: String,
    pub alternatives: Vec<Vec<ModelConstraint>>,
}

#[derive(Debug, Clone)]
pub struct Zone {
    pub name: String,
    pub include: Vec<MatchGroup>,
    pub exclude: Vec<MatchGroup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

/// Outbound request issued when a rule fires
#[derive(Debug, Clone)]
pub struct NotifyAction {
    pub url: String,
    pub username: String,
    pub password: String,
    pub method: HttpMethod,
    pub params: Vec<(String, String)>,
}

/// Control-plane visible state of a rule
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleFlags {
    pub enabled: bool,
    /// Whether the rule triggered on its last evaluation
    pub triggered: bool,
    pub last_fired: Option<SystemTime>,
}

/// A notification rule
#[derive(Debug)]
pub struct Notify {
    pub name: String,
    pub zones: Vec<Zone>,
    pub action: NotifyAction,
    /// Minimum qualifying detections within one cycle before firing
    pub min_hits: usize,
    /// Fire when the rule does not trigger
    pub negate: bool,
    /// Quiet period after a fire
    pub retry_in: Duration,
    flags: Mutex<RuleFlags>,
}

impl Notify {
    pub fn new(
        name: impl Into<String>,
        zones: Vec<Zone>,
        action: NotifyAction,
        enabled: bool,
    ) -> Self {
        Self {
            name: name.into(),
            zones,
            action,
            min_hits: 1,
            negate: false,
            retry_in: Duration::ZERO,
            flags: Mutex::new(RuleFlags {
                enabled,
                ..RuleFlags::default()
            }),
        }
    }

    pub fn with_min_hits(mut self, min_hits: usize) -> Self {
        self.min_hits = min_hits;
        self
    }

    pub fn with_negate(mut self, negate: bool) -> Self {
        self.negate = negate;
        self
    }

    pub fn with_retry_in(mut self, retry_in: Duration) -> Self {
        self.retry_in = retry_in;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.flags.lock().enabled
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.flags.lock().enabled = enabled;
    }

    pub fn flags(&self) -> RuleFlags {
        *self.flags.lock()
    }

    pub(crate) fn record_evaluation(&self, triggered: bool, fired_at: Option<SystemTime>) {
        let mut flags = self.flags.lock();
        flags.triggered = triggered;
        if fired_at.is_some() {
            flags.last_fired = fired_at;
        }
    }
}
