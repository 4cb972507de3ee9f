/// Control module
///
/// Enable/disable cameras and rules at runtime and report their state.
///
/// Routes (all POST):
///   /enabled                              camera and rule enabled flags
///   /status                               flags plus per-rule trigger state
///   /cam/{enable|disable}/{cam}           "Ok" / "Nok"
///   /notify/{enable|disable}/{cam}/{rule} "Ok" / "Nok"
pub mod plane;
pub mod server;

// Re-export commonly used types
pub use plane::{CameraStatus, CameraSummary, ControlPlane, RuleStatus, Toggle};
pub use server::{router, spawn};
