use thiserror::Error;

/// Service errors using thiserror for structured error handling.
///
/// Each enum covers one failure domain. Where an error ends up decides how
/// the service reacts: ingestion and delivery errors are logged and retried
/// or dropped, inference and configuration errors stop the process.

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration from {path}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(#[from] serde_json::Error),

    #[error("Configuration has no cameras")]
    NoCameras,

    #[error("Duplicate camera name: {0}")]
    DuplicateCamera(String),

    #[error("Camera {camera}: duplicate notification name {rule}")]
    DuplicateRule { camera: String, rule: String },

    #[error("Camera {camera}: notification name {rule} must not contain '/'")]
    InvalidRuleName { camera: String, rule: String },

    #[error("Camera {camera}: polygon {polygon} not found in polygonDict")]
    UnknownPolygon { camera: String, polygon: String },

    #[error("Camera {camera}: model {model} needs one of \"polygon\" or \"namedPolygon\"")]
    MissingPolygon { camera: String, model: String },

    #[error("Camera {camera}: model {model} is not listed in modelList")]
    UnknownModel { camera: String, model: String },

    #[error("Camera {camera}: {reason}")]
    MalformedRule { camera: String, reason: String },
}

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Stream request failed")]
    RequestFailed(#[source] Box<ureq::Error>),

    #[error("Stream rejected with status {0}")]
    BadStatus(u16),

    #[error("Stream read failed")]
    ReadFailed(#[source] std::io::Error),
}

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Failed to connect to model {model} at {url}")]
    ConnectFailed {
        model: String,
        url: String,
        #[source]
        source: Box<tungstenite::Error>,
    },

    #[error("Connection to model {0} closed")]
    ConnectionClosed(String),

    #[error("Transport error talking to model {model}")]
    Transport {
        model: String,
        #[source]
        source: Box<tungstenite::Error>,
    },

    #[error("Malformed response from model {model}: {reason}")]
    MalformedResponse { model: String, reason: String },

    #[error("No client registered for model {0}")]
    UnknownModel(String),
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notification request to {url} failed")]
    RequestFailed {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("Notification endpoint {url} answered with status {status}")]
    BadStatus { url: String, status: u16 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("Unknown camera: {0}")]
    UnknownCamera(String),

    #[error("Camera {camera}: unknown notification {rule}")]
    UnknownRule { camera: String, rule: String },

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;
