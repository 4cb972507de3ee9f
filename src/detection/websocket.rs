//! Websocket connection to one inference service.
//!
//! Uses the blocking `tungstenite` API: one request is one binary message
//! carrying the encoded frame, the reply is one message carrying the JSON
//! detection list. The socket read timeout bounds how long a reply may take.

use std::net::TcpStream;
use std::time::Duration;

use tungstenite::stream::MaybeTlsStream;
use tungstenite::{connect, Message, WebSocket};

use super::detector::{parse_detections, Detection, DetectionClient};
use crate::error::InferenceError;

/// Type alias for WebSocket over TcpStream
type WsStream = WebSocket<MaybeTlsStream<TcpStream>>;

/// Default wait for a model reply
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(30);

pub struct WebSocketClient {
    model: String,
    socket: WsStream,
}

impl WebSocketClient {
    /// Connect to the model service at `url` (e.g. "ws://127.0.0.1:8765")
    pub fn connect(model: &str, url: &str, reply_timeout: Duration) -> Result<Self, InferenceError> {
        let (socket, _response) = connect(url).map_err(|e| InferenceError::ConnectFailed {
            model: model.to_string(),
            url: url.to_string(),
            source: Box::new(e),
        })?;

        if let MaybeTlsStream::Plain(stream) = socket.get_ref() {
            stream
                .set_read_timeout(Some(reply_timeout))
                .and_then(|_| stream.set_write_timeout(Some(reply_timeout)))
                .map_err(|e| InferenceError::ConnectFailed {
                    model: model.to_string(),
                    url: url.to_string(),
                    source: Box::new(tungstenite::Error::Io(e)),
                })?;
        }

        tracing::info!("Connected to model {} at {}", model, url);

        Ok(Self {
            model: model.to_string(),
            socket,
        })
    }

    fn transport_error(&self, source: tungstenite::Error) -> InferenceError {
        match source {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                InferenceError::ConnectionClosed(self.model.clone())
            }
            other => InferenceError::Transport {
                model: self.model.clone(),
                source: Box::new(other),
            },
        }
    }
}

impl DetectionClient for WebSocketClient {
    fn detect(&mut self, image: &[u8]) -> Result<Vec<Detection>, InferenceError> {
        self.socket
            .send(Message::Binary(image.to_vec()))
            .map_err(|e| self.transport_error(e))?;

        loop {
            let message = self.socket.read().map_err(|e| self.transport_error(e))?;
            match message {
                Message::Text(text) => return parse_detections(&self.model, text.as_bytes()),
                Message::Binary(data) => return parse_detections(&self.model, &data),
                Message::Close(_) => return Err(InferenceError::ConnectionClosed(self.model.clone())),
                // Ping/Pong are answered by tungstenite itself
                _ => continue,
            }
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}

impl Drop for WebSocketClient {
    fn drop(&mut self) {
        let _ = self.socket.close(None);
    }
}
