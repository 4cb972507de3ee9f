//! MJPEG frame extraction
//!
//! Cameras send a multipart stream; rather than parsing part headers the
//! scanner looks for the JPEG start-of-image (`FF D8`) and end-of-image
//! (`FF D9`) markers and cuts out everything between them.

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Upper bound on buffered bytes while waiting for an end marker
pub const MAX_BUFFER: usize = 16 * 1024 * 1024;

#[derive(Default)]
pub struct MjpegScanner {
    buffer: Vec<u8>,
    /// Bytes of a pending frame already searched for the end marker
    searched: usize,
}

fn find(haystack: &[u8], marker: [u8; 2]) -> Option<usize> {
    haystack.windows(2).position(|w| w == marker)
}

impl MjpegScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns every frame completed by it, oldest first
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        loop {
            let Some(start) = find(&self.buffer, SOI) else {
                // Keep a trailing 0xFF that may begin a marker
                let keep = usize::from(self.buffer.last() == Some(&0xFF));
                self.buffer.drain(..self.buffer.len() - keep);
                self.searched = 0;
                break;
            };

            // Step back one byte so an end marker split across chunks is found
            let from = (start + 2).max(self.searched.saturating_sub(1));
            let Some(end) = find(&self.buffer[from..], EOI).map(|i| from + i) else {
                self.buffer.drain(..start);
                self.searched = self.buffer.len();
                break;
            };

            frames.push(self.buffer[start..end + 2].to_vec());
            self.buffer.drain(..end + 2);
            self.searched = 0;
        }

        if self.buffer.len() > MAX_BUFFER {
            tracing::warn!(
                "Discarding {} buffered bytes without an end-of-image marker",
                self.buffer.len()
            );
            self.buffer.clear();
            self.searched = 0;
        }

        frames
    }

    /// Bytes waiting for completion
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}
