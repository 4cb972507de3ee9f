/// Camera stream ingestion
///
/// One background thread per camera reads the MJPEG stream and keeps only the
/// newest complete frame in the camera's slot. Connection problems never
/// leave this thread: they are logged and retried after a fixed backoff.
use std::io::{self, Read};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::frame::FrameSlot;
use super::mjpeg::MjpegScanner;
use super::Camera;
use crate::error::FrameError;
use crate::shutdown::ShutdownListener;
use crate::utils::basic_auth_header;

/// Bytes read from the stream per iteration; flags are checked between reads
pub const CHUNK_SIZE: usize = 1024;

/// Wait before reconnecting after a failed or finished stream
pub const RETRY_DELAY: Duration = Duration::from_secs(30);

/// How often a disabled camera checks whether it was re-enabled
const IDLE_POLL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamEnd {
    /// Server closed the stream
    Eof,
    /// Camera was disabled mid-stream
    Disabled,
    Shutdown,
}

pub struct FrameSource {
    camera: Arc<Camera>,
    slot: FrameSlot,
    agent: ureq::Agent,
    retry_delay: Duration,
    shutdown: ShutdownListener,
}

impl FrameSource {
    pub fn new(camera: Arc<Camera>, slot: FrameSlot, shutdown: ShutdownListener) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(Duration::from_secs(30))
            .build();

        Self {
            camera,
            slot,
            agent,
            retry_delay: RETRY_DELAY,
            shutdown,
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Start ingestion on a named thread
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("camera-{}", self.camera.name))
            .spawn(move || self.run())
    }

    /// Connect, read, reconnect until shutdown
    pub fn run(&self) {
        let name = &self.camera.name;
        tracing::info!("Frame source for camera {} started", name);

        while !self.shutdown.is_triggered() {
            if !self.camera.is_enabled() {
                if self.shutdown.wait(IDLE_POLL) {
                    break;
                }
                continue;
            }

            match self.stream_once() {
                Ok(StreamEnd::Shutdown) => break,
                Ok(StreamEnd::Disabled) => {
                    tracing::info!("Camera {} disabled, stream closed", name);
                    continue;
                }
                Ok(StreamEnd::Eof) => {
                    tracing::warn!("Camera {} stream ended, retrying in {:?}", name, self.retry_delay);
                }
                Err(e) => {
                    tracing::warn!(
                        "Camera {} stream failed: {}, retrying in {:?}",
                        name,
                        error_chain(&e),
                        self.retry_delay
                    );
                }
            }

            if self.shutdown.wait(self.retry_delay) {
                break;
            }
        }

        tracing::info!("Frame source for camera {} stopped", name);
    }

    fn stream_once(&self) -> Result<StreamEnd, FrameError> {
        let endpoint = &self.camera.endpoint;
        let mut request = self.agent.get(&endpoint.url);
        if !endpoint.username.is_empty() {
            request = request.set(
                "Authorization",
                &basic_auth_header(&endpoint.username, &endpoint.password),
            );
        }

        let response = request.call().map_err(|e| match e {
            ureq::Error::Status(code, _) => FrameError::BadStatus(code),
            other => FrameError::RequestFailed(Box::new(other)),
        })?;

        tracing::info!("Camera {} connected", self.camera.name);

        // Dropping the reader closes the connection
        let mut reader = response.into_reader();
        let mut scanner = MjpegScanner::new();
        let mut chunk = [0u8; CHUNK_SIZE];

        loop {
            if self.shutdown.is_triggered() {
                return Ok(StreamEnd::Shutdown);
            }
            if !self.camera.is_enabled() {
                return Ok(StreamEnd::Disabled);
            }

            let read = reader.read(&mut chunk).map_err(FrameError::ReadFailed)?;
            if read == 0 {
                if scanner.buffered() > 0 {
                    tracing::debug!(
                        "Camera {} stream ended inside a frame, {} bytes dropped",
                        self.camera.name,
                        scanner.buffered()
                    );
                }
                return Ok(StreamEnd::Eof);
            }

            if let Some(frame) = scanner.push(&chunk[..read]).pop() {
                let sequence = self.slot.publish(frame);
                tracing::trace!("Camera {} frame {}", self.camera.name, sequence);
            }
        }
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
