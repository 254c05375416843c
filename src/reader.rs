//! Sequential, offset tracked reads of a snapshot's text.
//!
//! This is the consumer side of the device: open captures one snapshot,
//! then repeated reads hand out successive chunks of its text until a read
//! returns 0.

use core::convert::Infallible;

use crate::reading::ReadingSnapshot;

/// An open handle on one snapshot's text.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    snapshot: ReadingSnapshot,
    position: usize,
}

impl SnapshotReader {
    pub fn new(snapshot: ReadingSnapshot) -> Self {
        Self {
            snapshot,
            position: 0,
        }
    }

    /// Copies up to `buf.len()` bytes from the current offset and advances
    /// it. Returns 0 once the text is exhausted.
    pub fn next_chunk(&mut self, buf: &mut [u8]) -> usize {
        let text = self.snapshot.as_bytes();
        let remaining = &text[self.position.min(text.len())..];
        let count = remaining.len().min(buf.len());
        buf[..count].copy_from_slice(&remaining[..count]);
        self.position += count;
        count
    }

    /// Bytes handed out so far.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_exhausted(&self) -> bool {
        self.position >= self.snapshot.as_bytes().len()
    }

    /// The snapshot captured when the reader was opened.
    pub fn snapshot(&self) -> &ReadingSnapshot {
        &self.snapshot
    }
}

impl embedded_io::ErrorType for SnapshotReader {
    type Error = Infallible;
}

impl embedded_io::Read for SnapshotReader {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(self.next_chunk(buf))
    }
}

#[cfg(feature = "std")]
impl std::io::Read for SnapshotReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(self.next_chunk(buf))
    }
}
