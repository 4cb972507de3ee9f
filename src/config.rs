/// Configuration document
///
/// A single JSON file (camelCase keys) lists the model services and the
/// cameras with their notification rules. It is read once at startup and
/// built into the camera/rule graph the scheduler works on; any problem is
/// reported before anything starts.
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::camera::{Camera, Endpoint};
use crate::error::ConfigError;
use crate::geometry::{Point, Polygon};
use crate::rules::{HttpMethod, MatchGroup, ModelConstraint, Notify, NotifyAction, Zone};

fn default_true() -> bool {
    true
}

fn default_counter() -> usize {
    1
}

fn default_method() -> HttpMethod {
    HttpMethod::Post
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub model_list: BTreeMap<String, ModelService>,
    pub camera_list: Vec<CameraConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelService {
    /// Websocket URL of the inference service
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraConfig {
    pub name: String,
    /// MJPEG stream URL
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub polygon_dict: BTreeMap<String, Vec<Point>>,
    #[serde(default)]
    pub notify_list: Vec<NotifyConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CounterConfig {
    pub min: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_method")]
    pub method: HttpMethod,
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub negate: bool,
    /// Minimum hits per cycle before firing
    #[serde(default)]
    pub counter: Option<CounterConfig>,
    /// Cooldown after a fire, in seconds
    #[serde(default)]
    pub retry_in: f64,
    pub zone_list: Vec<ZoneConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneConfig {
    pub name: String,
    #[serde(default)]
    pub include_list: Vec<GroupConfig>,
    #[serde(default)]
    pub exclude_list: Vec<GroupConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    /// Alternatives, each a list of constraints that must all hold
    pub models: Vec<Vec<ConstraintConfig>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintConfig {
    /// Model name, a key of `modelList`
    pub name: String,
    pub category: String,
    pub confidence: f64,
    pub min_width: f64,
    pub max_width: f64,
    pub min_height: f64,
    pub max_height: f64,
    #[serde(default = "default_counter")]
    pub counter: usize,
    #[serde(default = "default_true")]
    pub advance_skip: bool,
    #[serde(default)]
    pub polygon: Option<Vec<Point>>,
    #[serde(default)]
    pub named_polygon: Option<String>,
}

/// Everything the service runs on, built from a validated `Config`
#[derive(Debug)]
pub struct Deployment {
    /// Model name to websocket URL
    pub models: BTreeMap<String, String>,
    pub cameras: Vec<Arc<Camera>>,
}

impl Deployment {
    /// Models referenced by the rules of `cameras`
    pub fn models_in_use<'a>(cameras: impl IntoIterator<Item = &'a Arc<Camera>>) -> BTreeSet<String> {
        cameras
            .into_iter()
            .flat_map(|camera| camera.rules.iter())
            .flat_map(|rule| rule.zones.iter())
            .flat_map(|zone| zone.include.iter().chain(zone.exclude.iter()))
            .flat_map(|group| group.alternatives.iter().flatten())
            .map(|constraint| constraint.model.clone())
            .collect()
    }

    pub fn camera(&self, name: &str) -> Option<&Arc<Camera>> {
        self.cameras.iter().find(|c| c.name == name)
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Validate and build the camera/rule graph
    pub fn build(&self) -> Result<Deployment, ConfigError> {
        if self.camera_list.is_empty() {
            return Err(ConfigError::NoCameras);
        }

        let mut names = HashSet::new();
        let mut cameras = Vec::with_capacity(self.camera_list.len());
        for camera in &self.camera_list {
            if !names.insert(camera.name.as_str()) {
                return Err(ConfigError::DuplicateCamera(camera.name.clone()));
            }
            cameras.push(Arc::new(self.build_camera(camera)?));
        }

        let models = self
            .model_list
            .iter()
            .map(|(name, service)| (name.clone(), service.url.clone()))
            .collect();

        Ok(Deployment { models, cameras })
    }

    fn build_camera(&self, camera: &CameraConfig) -> Result<Camera, ConfigError> {
        let builder = RuleBuilder {
            camera: &camera.name,
            models: &self.model_list,
            polygons: build_polygon_dict(camera)?,
        };

        let mut rule_names = HashSet::new();
        let mut rules = Vec::with_capacity(camera.notify_list.len());
        for notify in &camera.notify_list {
            if !rule_names.insert(notify.name.as_str()) {
                return Err(ConfigError::DuplicateRule {
                    camera: camera.name.clone(),
                    rule: notify.name.clone(),
                });
            }
            rules.push(builder.notify(notify)?);
        }

        let endpoint = Endpoint {
            url: camera.url.clone(),
            username: camera.username.clone(),
            password: camera.password.clone(),
        };
        Ok(Camera::new(camera.name.clone(), endpoint, rules, camera.enabled))
    }
}

fn polygon(camera: &str, what: &str, points: &[Point]) -> Result<Polygon, ConfigError> {
    if points.len() < 3 {
        return Err(ConfigError::MalformedRule {
            camera: camera.to_string(),
            reason: format!("polygon {} needs at least 3 points, got {}", what, points.len()),
        });
    }
    Ok(Polygon::new(points.to_vec()))
}

fn build_polygon_dict(camera: &CameraConfig) -> Result<HashMap<String, Arc<Polygon>>, ConfigError> {
    camera
        .polygon_dict
        .iter()
        .map(|(name, points)| Ok((name.clone(), Arc::new(polygon(&camera.name, name, points)?))))
        .collect()
}

struct RuleBuilder<'a> {
    camera: &'a str,
    models: &'a BTreeMap<String, ModelService>,
    polygons: HashMap<String, Arc<Polygon>>,
}

impl RuleBuilder<'_> {
    fn malformed(&self, reason: String) -> ConfigError {
        ConfigError::MalformedRule {
            camera: self.camera.to_string(),
            reason,
        }
    }

    fn notify(&self, notify: &NotifyConfig) -> Result<Notify, ConfigError> {
        if notify.name.contains('/') {
            return Err(ConfigError::InvalidRuleName {
                camera: self.camera.to_string(),
                rule: notify.name.clone(),
            });
        }

        let min_hits = notify.counter.as_ref().map_or(1, |c| c.min);
        if min_hits == 0 {
            return Err(self.malformed(format!("notification {}: counter.min must be at least 1", notify.name)));
        }
        // Rejects negative, non-finite and out-of-range values
        let retry_in = Duration::try_from_secs_f64(notify.retry_in).map_err(|_| {
            self.malformed(format!("notification {}: invalid retryIn {}", notify.name, notify.retry_in))
        })?;

        let zones = notify
            .zone_list
            .iter()
            .map(|zone| self.zone(zone))
            .collect::<Result<Vec<_>, _>>()?;

        let params = notify
            .params
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), value)
            })
            .collect();

        let action = NotifyAction {
            url: notify.url.clone(),
            username: notify.username.clone(),
            password: notify.password.clone(),
            method: notify.method,
            params,
        };

        Ok(Notify::new(notify.name.clone(), zones, action, notify.enabled)
            .with_min_hits(min_hits)
            .with_negate(notify.negate)
            .with_retry_in(retry_in))
    }

    fn zone(&self, zone: &ZoneConfig) -> Result<Zone, ConfigError> {
        let groups = |list: &[GroupConfig]| {
            list.iter()
                .map(|group| self.group(group))
                .collect::<Result<Vec<_>, _>>()
        };

        Ok(Zone {
            name: zone.name.clone(),
            include: groups(&zone.include_list)?,
            exclude: groups(&zone.exclude_list)?,
        })
    }

    fn group(&self, group: &GroupConfig) -> Result<MatchGroup, ConfigError> {
        let alternatives = group
            .models
            .iter()
            .map(|list| list.iter().map(|c| self.constraint(c)).collect::<Result<Vec<_>, _>>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MatchGroup {
            name: group.name.clone(),
            alternatives,
        })
    }

    fn constraint(&self, model: &ConstraintConfig) -> Result<ModelConstraint, ConfigError> {
        if !self.models.contains_key(&model.name) {
            return Err(ConfigError::UnknownModel {
                camera: self.camera.to_string(),
                model: model.name.clone(),
            });
        }

        // A named polygon wins over an inline one
        let polygon = match (&model.named_polygon, &model.polygon) {
            (Some(name), _) => self
                .polygons
                .get(name)
                .cloned()
                .ok_or_else(|| ConfigError::UnknownPolygon {
                    camera: self.camera.to_string(),
                    polygon: name.clone(),
                })?,
            (None, Some(points)) => Arc::new(polygon(self.camera, &model.name, points)?),
            (None, None) => {
                return Err(ConfigError::MissingPolygon {
                    camera: self.camera.to_string(),
                    model: model.name.clone(),
                })
            }
        };

        if model.min_width > model.max_width || model.min_height > model.max_height {
            return Err(self.malformed(format!(
                "model {}: size bounds out of order (width {}..{}, height {}..{})",
                model.name, model.min_width, model.max_width, model.min_height, model.max_height
            )));
        }
        if model.counter == 0 {
            return Err(self.malformed(format!("model {}: counter must be at least 1", model.name)));
        }

        Ok(ModelConstraint {
            model: model.name.clone(),
            category: model.category.clone(),
            confidence: model.confidence,
            min_width: model.min_width,
            max_width: model.max_width,
            min_height: model.min_height,
            max_height: model.max_height,
            polygon,
            polygon_name: model.named_polygon.clone(),
            counter: model.counter,
            advance_skip: model.advance_skip,
        })
    }
}
