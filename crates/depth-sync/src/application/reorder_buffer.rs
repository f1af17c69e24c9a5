//! Reorder Buffer
//!
//! Holds diff events that cannot yet be applied in sequence order.
//! Bounded by a configurable capacity; events are grouped by sequence so a
//! whole published batch (or a duplicated delivery) moves together.

use std::collections::BTreeMap;

use depth_core::DiffEvent;
use tracing::debug;

/// Default number of buffered events before the window is considered lost
pub const DEFAULT_BUFFER_CAPACITY: usize = 8;

/// Capacity-bounded holding area for out-of-order diff events
#[derive(Debug, Clone)]
pub struct ReorderBuffer {
    /// Events grouped by sequence, in arrival order within a group
    events: BTreeMap<u64, Vec<DiffEvent>>,
    /// Total number of buffered events across all groups
    len: usize,
    capacity: usize,
}

impl ReorderBuffer {
    /// Create a buffer holding at most `capacity` events
    pub fn new(capacity: usize) -> Self {
        ReorderBuffer {
            events: BTreeMap::new(),
            len: 0,
            capacity,
        }
    }

    /// Append one event
    pub fn push(&mut self, event: DiffEvent) {
        self.events.entry(event.sequence).or_default().push(event);
        self.len += 1;
    }

    /// Append many events
    pub fn extend<I>(&mut self, events: I)
    where
        I: IntoIterator<Item = DiffEvent>,
    {
        for event in events {
            self.push(event);
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Check if more events are buffered than the window allows
    pub fn is_over_capacity(&self) -> bool {
        self.len > self.capacity
    }

    /// Lowest buffered sequence
    pub fn oldest_sequence(&self) -> Option<u64> {
        self.events.keys().next().copied()
    }

    /// Highest buffered sequence
    pub fn newest_sequence(&self) -> Option<u64> {
        self.events.keys().next_back().copied()
    }

    /// Remove and return every event buffered under `sequence`
    pub fn take_sequence(&mut self, sequence: u64) -> Vec<DiffEvent> {
        let taken = self.events.remove(&sequence).unwrap_or_default();
        self.len -= taken.len();
        taken
    }

    /// Evict every event sharing the minimum sequence. Returns how many were evicted.
    pub fn evict_oldest(&mut self) -> usize {
        let Some((sequence, evicted)) = self.events.pop_first() else {
            return 0;
        };
        self.len -= evicted.len();
        debug!(sequence, count = evicted.len(), "Evicted oldest buffered sequence");
        evicted.len()
    }

    /// Evict oldest sequence groups until the buffer fits its capacity
    pub fn enforce_capacity(&mut self) -> usize {
        let mut evicted = 0;
        while self.is_over_capacity() {
            evicted += self.evict_oldest();
        }
        evicted
    }

    /// Discard every event with sequence <= `sequence`. Returns how many were discarded.
    pub fn discard_through(&mut self, sequence: u64) -> usize {
        let keep = match sequence.checked_add(1) {
            Some(next) => self.events.split_off(&next),
            None => BTreeMap::new(),
        };
        let discarded: usize = self.events.values().map(Vec::len).sum();
        self.events = keep;
        self.len -= discarded;
        discarded
    }

    /// Extract the contiguous run that continues from `cursor`
    ///
    /// Groups older than `cursor` are stale and dropped. Starting at the
    /// oldest remaining group, groups whose sequence equals the cursor or the
    /// one after it are taken, advancing the cursor each time. The walk stops
    /// at the first missing sequence; nothing past a gap is taken.
    pub fn take_contiguous(&mut self, cursor: u64) -> Vec<DiffEvent> {
        let mut cursor = cursor;
        let mut run = Vec::new();

        while let Some(oldest) = self.oldest_sequence() {
            if oldest < cursor {
                let stale = self.take_sequence(oldest);
                debug!(
                    sequence = oldest,
                    cursor,
                    count = stale.len(),
                    "Dropped stale buffered events"
                );
                continue;
            }
            if oldest > cursor.saturating_add(1) {
                break;
            }
            run.extend(self.take_sequence(oldest));
            cursor = oldest;
        }

        run
    }

    /// Clear all buffered events
    pub fn clear(&mut self) {
        self.events.clear();
        self.len = 0;
    }
}

impl Default for ReorderBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}
