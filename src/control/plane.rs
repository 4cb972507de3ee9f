/// Runtime control of cameras and rules
///
/// Flag flips go through the same locks the scheduler reads, so a change is
/// seen on the next cycle. Evaluations already running are not interrupted.
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use crate::camera::Camera;
use crate::error::ControlError;
use crate::rules::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Enable,
    Disable,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        matches!(self, Toggle::Enable)
    }
}

impl FromStr for Toggle {
    type Err = ControlError;

    fn from_str(op: &str) -> Result<Self, Self::Err> {
        match op {
            "enable" => Ok(Toggle::Enable),
            "disable" => Ok(Toggle::Disable),
            other => Err(ControlError::UnknownOperation(other.to_string())),
        }
    }
}

/// Enabled/triggered summary of one camera
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CameraSummary {
    pub enabled: bool,
    pub triggered: bool,
    /// Rule name to enabled flag
    pub notifications: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleStatus {
    pub enabled: bool,
    pub triggered: bool,
    /// Seconds since the Unix epoch
    pub last_fired: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CameraStatus {
    pub enabled: bool,
    pub triggered: bool,
    pub rules: BTreeMap<String, RuleStatus>,
}

pub struct ControlPlane {
    cameras: Vec<Arc<Camera>>,
}

impl ControlPlane {
    pub fn new(cameras: Vec<Arc<Camera>>) -> Self {
        Self { cameras }
    }

    fn camera(&self, name: &str) -> Result<&Camera, ControlError> {
        self.cameras
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.as_ref())
            .ok_or_else(|| ControlError::UnknownCamera(name.to_string()))
    }

    fn rule<'a>(&self, camera: &'a Camera, name: &str) -> Result<&'a Notify, ControlError> {
        camera.rule(name).ok_or_else(|| ControlError::UnknownRule {
            camera: camera.name.clone(),
            rule: name.to_string(),
        })
    }

    pub fn set_camera_enabled(&self, camera: &str, op: &str) -> Result<(), ControlError> {
        let toggle: Toggle = op.parse()?;
        let camera = self.camera(camera)?;
        camera.set_enabled(toggle.enabled());
        tracing::info!("Camera {} {}d", camera.name, op);
        Ok(())
    }

    pub fn set_rule_enabled(&self, camera: &str, rule: &str, op: &str) -> Result<(), ControlError> {
        let toggle: Toggle = op.parse()?;
        let camera = self.camera(camera)?;
        let rule = self.rule(camera, rule)?;
        rule.set_enabled(toggle.enabled());
        tracing::info!("Camera {} notification {} {}d", camera.name, rule.name, op);
        Ok(())
    }

    /// Flags of every camera and its rules
    pub fn summary(&self) -> BTreeMap<String, CameraSummary> {
        self.cameras
            .iter()
            .map(|camera| {
                let flags = camera.flags();
                let notifications = camera
                    .rules
                    .iter()
                    .map(|rule| (rule.name.clone(), rule.is_enabled()))
                    .collect();
                (
                    camera.name.clone(),
                    CameraSummary {
                        enabled: flags.enabled,
                        triggered: flags.triggered,
                        notifications,
                    },
                )
            })
            .collect()
    }

    /// Summary plus per-rule trigger and fire times
    pub fn status(&self) -> BTreeMap<String, CameraStatus> {
        self.cameras
            .iter()
            .map(|camera| {
                let flags = camera.flags();
                let rules = camera
                    .rules
                    .iter()
                    .map(|rule| {
                        let rule_flags = rule.flags();
                        let last_fired = rule_flags
                            .last_fired
                            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                            .map(|d| d.as_secs());
                        (
                            rule.name.clone(),
                            RuleStatus {
                                enabled: rule_flags.enabled,
                                triggered: rule_flags.triggered,
                                last_fired,
                            },
                        )
                    })
                    .collect();
                (
                    camera.name.clone(),
                    CameraStatus {
                        enabled: flags.enabled,
                        triggered: flags.triggered,
                        rules,
                    },
                )
            })
            .collect()
    }
}
