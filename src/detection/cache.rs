/// Per-cycle inference result cache
///
/// Built for one camera frame. Each model is asked at most once; later
/// lookups for any category of that model are served from memory.
use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::detector::{Detection, ModelClients};
use crate::error::InferenceError;

pub struct ResultCache<'a> {
    clients: &'a mut ModelClients,
    image: &'a [u8],
    by_model: HashMap<String, HashMap<String, Vec<Detection>>>,
    fetches: usize,
    fetch_time: Duration,
}

impl<'a> ResultCache<'a> {
    pub fn new(clients: &'a mut ModelClients, image: &'a [u8]) -> Self {
        Self {
            clients,
            image,
            by_model: HashMap::new(),
            fetches: 0,
            fetch_time: Duration::ZERO,
        }
    }

    /// Detections of `category` reported by `model` for this frame
    pub fn detections(&mut self, model: &str, category: &str) -> Result<&[Detection], InferenceError> {
        if !self.by_model.contains_key(model) {
            let grouped = self.fetch(model)?;
            self.by_model.insert(model.to_string(), grouped);
        }

        Ok(self
            .by_model
            .get(model)
            .and_then(|categories| categories.get(category))
            .map(Vec::as_slice)
            .unwrap_or(&[]))
    }

    fn fetch(&mut self, model: &str) -> Result<HashMap<String, Vec<Detection>>, InferenceError> {
        let client = self
            .clients
            .get_mut(model)
            .ok_or_else(|| InferenceError::UnknownModel(model.to_string()))?;

        let start = Instant::now();
        let detections = client.detect(self.image)?;
        self.fetch_time += start.elapsed();
        self.fetches += 1;

        tracing::debug!("Model {} returned {} detections", model, detections.len());

        let mut grouped: HashMap<String, Vec<Detection>> = HashMap::new();
        for detection in detections {
            grouped
                .entry(detection.category.clone())
                .or_default()
                .push(detection);
        }
        Ok(grouped)
    }

    /// Number of inference calls made through this cache
    pub fn fetches(&self) -> usize {
        self.fetches
    }

    /// Time spent waiting on inference calls
    pub fn fetch_time(&self) -> Duration {
        self.fetch_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::detector::BoundingBox;
    use crate::testing::FakeClient;

    fn clients_with(client: FakeClient) -> ModelClients {
        let mut clients = ModelClients::new();
        clients.insert(Box::new(client));
        clients
    }

    #[test]
    fn test_single_fetch_per_model() {
        let client = FakeClient::new("yolo")
            .with(Detection::new("person", 0.9, BoundingBox::new(10.0, 10.0, 5.0, 5.0)))
            .with(Detection::new("car", 0.8, BoundingBox::new(50.0, 50.0, 20.0, 10.0)))
            .with(Detection::new("person", 0.7, BoundingBox::new(30.0, 30.0, 5.0, 5.0)));
        let calls = client.calls();
        let mut clients = clients_with(client);
        let mut cache = ResultCache::new(&mut clients, b"jpeg");

        assert_eq!(cache.detections("yolo", "person").unwrap().len(), 2);
        assert_eq!(cache.detections("yolo", "car").unwrap().len(), 1);
        assert_eq!(cache.detections("yolo", "dog").unwrap().len(), 0);
        assert_eq!(cache.detections("yolo", "person").unwrap().len(), 2);

        assert_eq!(calls.get(), 1);
        assert_eq!(cache.fetches(), 1);
    }

    #[test]
    fn test_new_cache_fetches_again() {
        let client = FakeClient::new("yolo");
        let calls = client.calls();
        let mut clients = clients_with(client);

        {
            let mut cache = ResultCache::new(&mut clients, b"frame-1");
            cache.detections("yolo", "person").unwrap();
        }
        {
            let mut cache = ResultCache::new(&mut clients, b"frame-2");
            cache.detections("yolo", "person").unwrap();
        }

        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_unknown_model_is_an_error() {
        let mut clients = ModelClients::new();
        let mut cache = ResultCache::new(&mut clients, b"jpeg");

        let err = cache.detections("missing", "person").unwrap_err();
        assert!(matches!(err, InferenceError::UnknownModel(_)));
    }

    #[test]
    fn test_client_failure_propagates() {
        let mut clients = clients_with(FakeClient::new("yolo").closed());
        let mut cache = ResultCache::new(&mut clients, b"jpeg");

        let err = cache.detections("yolo", "person").unwrap_err();
        assert!(matches!(err, InferenceError::ConnectionClosed(_)));
    }
}
