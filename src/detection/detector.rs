/// Detection types and the inference client trait
///
/// Defines what an inference service returns and the interface every model
/// connection implements.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::InferenceError;
use crate::geometry::Point;

/// Axis-aligned box, center based, in image pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(center_x: f64, center_y: f64, width: f64, height: f64) -> Self {
        Self {
            center_x,
            center_y,
            width,
            height,
        }
    }

    /// Horizontal center on the bottom edge.
    ///
    /// This is where an object touches the ground, and it is the point that
    /// zone polygons are tested against.
    pub fn base_point(&self) -> Point {
        Point::new(self.center_x, self.center_y + self.height / 2.0)
    }
}

/// One object reported by a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub category: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(category: impl Into<String>, confidence: f64, bbox: BoundingBox) -> Self {
        Self {
            category: category.into(),
            confidence,
            bbox,
        }
    }
}

/// Inference client trait
///
/// One implementation per model connection. Any error is treated as the
/// connection being lost.
pub trait DetectionClient: Send {
    /// Run the model on one encoded image
    fn detect(&mut self, image: &[u8]) -> Result<Vec<Detection>, InferenceError>;

    /// Get model name (for logging)
    fn model(&self) -> &str;
}

/// Parse a model reply: a JSON array of `[category, confidence, [cx, cy, w, h]]`.
pub fn parse_detections(model: &str, payload: &[u8]) -> Result<Vec<Detection>, InferenceError> {
    let rows: Vec<(String, f64, [f64; 4])> =
        serde_json::from_slice(payload).map_err(|e| InferenceError::MalformedResponse {
            model: model.to_string(),
            reason: e.to_string(),
        })?;

    rows.into_iter()
        .map(|(category, confidence, [x, y, w, h])| {
            if w < 0.0 || h < 0.0 {
                return Err(InferenceError::MalformedResponse {
                    model: model.to_string(),
                    reason: format!("negative box size {}x{} for {}", w, h, category),
                });
            }
            Ok(Detection::new(category, confidence, BoundingBox::new(x, y, w, h)))
        })
        .collect()
}

/// Model connections keyed by model name
#[derive(Default)]
pub struct ModelClients {
    clients: BTreeMap<String, Box<dyn DetectionClient>>,
}

impl ModelClients {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, client: Box<dyn DetectionClient>) {
        self.clients.insert(client.model().to_string(), client);
    }

    pub fn get_mut(&mut self, model: &str) -> Option<&mut (dyn DetectionClient + 'static)> {
        self.clients.get_mut(model).map(|c| &mut **c)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
