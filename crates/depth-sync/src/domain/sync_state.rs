/// Synchronization state of a tracked book
/// Domain concept representing the synchronizer's state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// No trusted baseline; the next diff starts a resync
    #[default]
    Desynchronized,
    /// Snapshot in flight, diffs are buffered
    Synchronizing,
    /// Book matches the source, diffs are applied in sequence
    Synchronized,
}

impl SyncState {
    /// Check if the book can be read as authoritative
    pub fn is_ready(&self) -> bool {
        matches!(self, SyncState::Synchronized)
    }

    /// Check if the book needs a snapshot
    pub fn needs_snapshot(&self) -> bool {
        matches!(self, SyncState::Desynchronized | SyncState::Synchronizing)
    }
}
