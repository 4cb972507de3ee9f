/// Process-wide stop signal
///
/// A channel that never carries a message: dropping the sender disconnects
/// every listener at once, so one trigger reaches the scheduler, each
/// ingestion thread and the control plane.
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct Shutdown {
    tx: Arc<Mutex<Option<Sender<()>>>>,
    rx: Receiver<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            tx: Arc::new(Mutex::new(Some(tx))),
            rx,
        }
    }

    /// Signal every listener. Idempotent.
    pub fn trigger(&self) {
        if self.tx.lock().take().is_some() {
            tracing::info!("Shutdown requested");
        }
    }

    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.rx.clone(),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct ShutdownListener {
    rx: Receiver<()>,
}

impl ShutdownListener {
    pub fn is_triggered(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Sleep for up to `timeout`; returns true when woken by shutdown
    pub fn wait(&self, timeout: Duration) -> bool {
        matches!(self.rx.recv_timeout(timeout), Err(RecvTimeoutError::Disconnected))
    }

    /// Block until shutdown
    pub fn wait_forever(&self) {
        let _ = self.rx.recv();
    }
}
