/// Notification module
///
/// Decides when a rule evaluation becomes an outbound request and sends it.
///
/// ```text
/// RuleEvaluation ──► Phase (Idle / Matching / Firing) ──► cooldown ──► Notifier
///                                                                      ├─ HttpNotifier
///                                                                      └─ DryRunNotifier
/// ```
pub mod action;
pub mod controller;

// Re-export commonly used types
pub use action::{DryRunNotifier, HttpNotifier, Notifier};
pub use controller::{CycleOutcome, NotificationController, Phase};
