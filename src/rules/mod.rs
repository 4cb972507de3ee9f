/// Rules module
///
/// Turns cached model output into per-rule decisions.
///
/// ## Architecture
///
/// ```text
/// Notify (rule)
///   └── Zone (tried in order, first decisive zone wins)
///       ├── exclude: MatchGroup ── any alternative list satisfied => zone excluded
///       └── include: MatchGroup ── any alternative list satisfied => rule triggered
///                      └── [ModelConstraint] (all must reach their counter)
/// ```

pub mod engine;
pub mod matcher;
pub mod rule;

// Re-export commonly used types
pub use engine::{evaluate_rule, RuleEvaluation};
pub use matcher::{count_matches, is_contained};
pub use rule::{HttpMethod, MatchGroup, ModelConstraint, Notify, NotifyAction, RuleFlags, Zone};
