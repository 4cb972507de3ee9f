//! secure-watch
//!
//! Watches MJPEG camera streams, asks object detection services what is in
//! each fresh frame, matches the detections against per-camera zone rules
//! and calls out over HTTP when a rule fires.
//!
//! ```text
//! FrameSource (thread per camera) ──► FrameSlot
//!                                        │
//! Scheduler (single thread) ◄────────────┘
//!   └── ResultCache ──► DetectionClient (websocket per model)
//!   └── NotificationController ──► evaluate_rule ──► is_contained
//!                               └─► Notifier (HTTP)
//! ControlPlane (axum) ── flips camera/rule flags
//! ```

pub mod camera;
pub mod cli;
pub mod config;
pub mod control;
pub mod detection;
pub mod error;
pub mod geometry;
pub mod inspect;
pub mod logging;
pub mod notify;
pub mod rules;
pub mod scheduler;
pub mod shutdown;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
