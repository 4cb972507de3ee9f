/// Detection module
///
/// Everything between a camera frame and the detections the rules look at.
///
/// ## Architecture
///
/// ```text
/// ResultCache (one per evaluated frame)
///   └── ModelClients
///       └── DetectionClient (one per model)
///           └── WebSocketClient
/// ```

pub mod cache;
pub mod detector;
pub mod websocket;

// Re-export commonly used types
pub use cache::ResultCache;
pub use detector::{parse_detections, BoundingBox, Detection, DetectionClient, ModelClients};
pub use websocket::WebSocketClient;
