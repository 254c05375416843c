//! Last good reading.

use crate::reading::ReadingSnapshot;

/// Holds the snapshot of the last successful acquisition.
///
/// The cache has no lock of its own: the owner serializes access (see
/// `Bmp180Device`). A snapshot is replaced with a single assignment so a
/// reader holding the same lock only ever sees a whole value.
#[derive(Debug, Clone, Default)]
pub struct ReadingCache {
    current: ReadingSnapshot,
}

impl ReadingCache {
    /// A cache holding the placeholder snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, snapshot: ReadingSnapshot) {
        self.current = snapshot;
    }

    pub fn get(&self) -> ReadingSnapshot {
        self.current.clone()
    }
}
