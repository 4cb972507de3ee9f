/// Latest-frame mailbox
///
/// The ingestion thread overwrites the slot, the scheduler peeks at it.
/// Frames are immutable once published and shared by `Arc`, so the lock is
/// only held for a pointer swap.
use parking_lot::Mutex;
use std::sync::Arc;

/// One encoded JPEG image
#[derive(Debug, PartialEq, Eq)]
pub struct Frame {
    pub data: Vec<u8>,
    /// Increases by one for every frame published to the slot
    pub sequence: u64,
}

#[derive(Default)]
struct SlotState {
    current: Option<Arc<Frame>>,
    next_sequence: u64,
}

/// Single-slot mailbox holding the freshest frame of one camera
#[derive(Clone, Default)]
pub struct FrameSlot {
    inner: Arc<Mutex<SlotState>>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current frame, dropping any undelivered one
    pub fn publish(&self, data: Vec<u8>) -> u64 {
        let mut state = self.inner.lock();
        state.next_sequence += 1;
        let sequence = state.next_sequence;
        state.current = Some(Arc::new(Frame { data, sequence }));
        sequence
    }

    pub fn peek(&self) -> Option<Arc<Frame>> {
        self.inner.lock().current.clone()
    }

    /// A consumer view that remembers what it has already seen
    pub fn reader(&self) -> FrameReader {
        FrameReader {
            slot: self.clone(),
            last_seen: 0,
        }
    }
}

pub struct FrameReader {
    slot: FrameSlot,
    last_seen: u64,
}

impl FrameReader {
    /// The current frame, if it was not already returned to this reader
    pub fn latest(&mut self) -> Option<Arc<Frame>> {
        let frame = self.slot.peek()?;
        if frame.sequence == self.last_seen {
            return None;
        }
        self.last_seen = frame.sequence;
        Some(frame)
    }
}
