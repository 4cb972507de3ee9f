/// Camera module
///
/// Cameras, their frame mailbox and the ingestion thread feeding it.
///
/// ```text
/// ┌──────────────┐  chunks   ┌──────────────┐  frames  ┌───────────┐
/// │ HTTP stream  │ ────────► │ MjpegScanner │ ───────► │ FrameSlot │ ◄── Scheduler
/// └──────────────┘           └──────────────┘          └───────────┘    (FrameReader)
///        ▲
///        └── FrameSource thread (per camera, reconnects every 30 s)
/// ```
use parking_lot::Mutex;
use std::fmt;

use crate::rules::Notify;

pub mod frame;
pub mod mjpeg;
pub mod source;

// Re-export commonly used types
pub use frame::{Frame, FrameReader, FrameSlot};
pub use mjpeg::MjpegScanner;
pub use source::FrameSource;

/// Where and how to reach a camera's MJPEG stream
#[derive(Clone)]
pub struct Endpoint {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CameraFlags {
    pub enabled: bool,
    /// Whether any rule fired on the last evaluated frame
    pub triggered: bool,
}

#[derive(Debug)]
pub struct Camera {
    pub name: String,
    pub endpoint: Endpoint,
    pub rules: Vec<Notify>,
    flags: Mutex<CameraFlags>,
}

impl Camera {
    pub fn new(name: impl Into<String>, endpoint: Endpoint, rules: Vec<Notify>, enabled: bool) -> Self {
        Self {
            name: name.into(),
            endpoint,
            rules,
            flags: Mutex::new(CameraFlags {
                enabled,
                triggered: false,
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.flags.lock().enabled
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.flags.lock().enabled = enabled;
    }

    pub fn flags(&self) -> CameraFlags {
        *self.flags.lock()
    }

    pub(crate) fn set_triggered(&self, triggered: bool) {
        self.flags.lock().triggered = triggered;
    }

    pub fn rule(&self, name: &str) -> Option<&Notify> {
        self.rules.iter().find(|r| r.name == name)
    }
}
