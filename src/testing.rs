//! Shared fixtures for unit tests

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::detection::{Detection, DetectionClient};
use crate::error::{InferenceError, NotifyError};
use crate::geometry::{Point, Polygon};
use crate::notify::Notifier;
use crate::rules::{HttpMethod, MatchGroup, ModelConstraint, Notify, NotifyAction, Zone};

/// Shared call counter handed out before a fake is boxed
#[derive(Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Inference client returning a canned detection list
pub struct FakeClient {
    model: String,
    detections: Arc<Mutex<Vec<Detection>>>,
    calls: CallCounter,
    closed: bool,
}

impl FakeClient {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            detections: Arc::new(Mutex::new(Vec::new())),
            calls: CallCounter::default(),
            closed: false,
        }
    }

    pub fn with(self, detection: Detection) -> Self {
        self.detections.lock().push(detection);
        self
    }

    /// Every call fails as if the service hung up
    pub fn closed(mut self) -> Self {
        self.closed = true;
        self
    }

    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }

    /// Handle for swapping the reply after the client is boxed
    pub fn replies(&self) -> Arc<Mutex<Vec<Detection>>> {
        Arc::clone(&self.detections)
    }
}

impl DetectionClient for FakeClient {
    fn detect(&mut self, _image: &[u8]) -> Result<Vec<Detection>, InferenceError> {
        self.calls.bump();
        if self.closed {
            return Err(InferenceError::ConnectionClosed(self.model.clone()));
        }
        Ok(self.detections.lock().clone())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Notifier remembering every fired `(camera, rule)` pair
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    fired: Arc<Mutex<Vec<(String, String)>>>,
    failing: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the attempt, then reports a delivery failure
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn fired(&self) -> Vec<(String, String)> {
        self.fired.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn fire(&self, camera: &str, rule: &Notify) -> Result<(), NotifyError> {
        self.fired.lock().push((camera.to_string(), rule.name.clone()));
        if self.failing {
            return Err(NotifyError::BadStatus {
                url: rule.action.url.clone(),
                status: 503,
            });
        }
        Ok(())
    }
}

/// Square with corners (0,0) and (size,size)
pub fn square(size: f64) -> Polygon {
    Polygon::new(vec![
        Point::new(0.0, 0.0),
        Point::new(size, 0.0),
        Point::new(size, size),
        Point::new(0.0, size),
    ])
}

/// Confidence >= 0.5, width [10, 100), height [20, 200), inside (0,0)-(400,400)
pub fn constraint(model: &str, category: &str) -> ModelConstraint {
    ModelConstraint {
        model: model.to_string(),
        category: category.to_string(),
        confidence: 0.5,
        min_width: 10.0,
        max_width: 100.0,
        min_height: 20.0,
        max_height: 200.0,
        polygon: Arc::new(square(400.0)),
        polygon_name: None,
        counter: 1,
        advance_skip: false,
    }
}

pub fn group(alternatives: Vec<Vec<ModelConstraint>>) -> MatchGroup {
    MatchGroup {
        name: "group".to_string(),
        alternatives,
    }
}

pub fn zone(name: &str, include: Vec<MatchGroup>, exclude: Vec<MatchGroup>) -> Zone {
    Zone {
        name: name.to_string(),
        include,
        exclude,
    }
}

pub fn rule(name: &str, zones: Vec<Zone>) -> Notify {
    let action = NotifyAction {
        url: "http://localhost/hook".to_string(),
        username: String::new(),
        password: String::new(),
        method: HttpMethod::Post,
        params: Vec::new(),
    };
    Notify::new(name, zones, action, true)
}

/// One-zone rule asking `model` for a single `category` hit
pub fn simple_rule(name: &str, model: &str, category: &str) -> Notify {
    rule(
        name,
        vec![zone("zone", vec![group(vec![vec![constraint(model, category)]])], vec![])],
    )
}
