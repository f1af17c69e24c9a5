//! Synchronizer
//!
//! State machine reconciling depth snapshots with the sequenced diff stream.
//! Owns both depth tables, the reorder buffer and the "last applied sequence"
//! cursor. It performs no I/O: when a snapshot is needed it says so through
//! [`SyncAction::RequestSnapshot`] and the caller fetches it.
//!
//! ```text
//!                diff                        snapshot ok
//! Desynchronized ─────▶ Synchronizing ───────────────────▶ Synchronized
//!       ▲          (sync_begin)      (buffer every diff)  (sync_complete)
//!       │                                                      │
//!       └──────────────────────────────────────────────────────┘
//!                 reorder buffer overflow (sync_lost)
//! ```

use depth_core::{DepthEntry, DepthSnapshot, DiffBatch, DiffEvent, DiffKind, Market, Side};
use tracing::{debug, info, warn};

use super::config::TrackerConfig;
use super::depth_table::DepthTable;
use super::metrics::{DepthMetrics, MetricsCalculator};
use super::reorder_buffer::ReorderBuffer;
use crate::domain::{DepthNotification, SyncState};
use crate::error::TrackerError;
use crate::presentation::NotificationPublisher;

/// What the caller must do after feeding the synchronizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Nothing to do
    Continue,
    /// A resync started; fetch a snapshot and hand it to `apply_snapshot`
    RequestSnapshot,
}

/// Per-market synchronization state machine
pub struct Synchronizer {
    market: Market,
    state: SyncState,
    last_sequence: u64,
    asks: DepthTable,
    bids: DepthTable,
    buffer: ReorderBuffer,
    metrics: MetricsCalculator,
    buffer_resync_trigger: bool,
    notifier: NotificationPublisher,
}

impl Synchronizer {
    pub fn new(config: &TrackerConfig, notifier: NotificationPublisher) -> Self {
        Synchronizer {
            market: config.market.clone(),
            state: SyncState::Desynchronized,
            last_sequence: 0,
            asks: DepthTable::new(Side::Ask),
            bids: DepthTable::new(Side::Bid),
            buffer: ReorderBuffer::new(config.buffer_capacity),
            metrics: MetricsCalculator::new(),
            buffer_resync_trigger: config.buffer_resync_trigger,
            notifier,
        }
    }

    /// Feed one diff event
    ///
    /// Fails only when applying a level would leave decimal range; the book is
    /// left as it was before that event and the session cannot continue.
    pub fn handle_diff(&mut self, event: DiffEvent) -> Result<SyncAction, TrackerError> {
        let action = match self.state {
            SyncState::Desynchronized => self.begin_sync(event),
            SyncState::Synchronizing => {
                debug!(
                    market = %self.market,
                    sequence = event.sequence,
                    "Buffering diff while snapshot is in flight"
                );
                self.buffer.push(event);
                self.buffer.enforce_capacity();
                SyncAction::Continue
            }
            SyncState::Synchronized => {
                self.handle_synchronized(event)?;
                SyncAction::Continue
            }
        };
        Ok(action)
    }

    /// Feed a whole published batch, in order
    pub fn handle_batch(&mut self, batch: DiffBatch) -> Result<SyncAction, TrackerError> {
        let mut action = SyncAction::Continue;
        for event in batch {
            if self.handle_diff(event)? == SyncAction::RequestSnapshot {
                action = SyncAction::RequestSnapshot;
            }
        }
        Ok(action)
    }

    fn begin_sync(&mut self, event: DiffEvent) -> SyncAction {
        self.state = SyncState::Synchronizing;

        if self.buffer_resync_trigger {
            self.buffer.push(event);
        } else {
            // No baseline to validate it against
            debug!(
                market = %self.market,
                sequence = event.sequence,
                "Discarding diff that triggered resync"
            );
        }

        info!(market = %self.market, "Sync begin, requesting snapshot");
        self.notifier.publish(DepthNotification::SyncBegin {
            market: self.market.clone(),
        });
        SyncAction::RequestSnapshot
    }

    fn handle_synchronized(&mut self, event: DiffEvent) -> Result<(), TrackerError> {
        let cursor = self.last_sequence;

        if event.sequence == cursor || event.sequence == cursor.saturating_add(1) {
            self.apply(event)?;
            return self.drain();
        }

        debug!(
            market = %self.market,
            sequence = event.sequence,
            cursor,
            "Out-of-order diff, buffering"
        );
        self.buffer.push(event);
        self.drain()?;

        if self.buffer.is_over_capacity() {
            self.lose_sync();
        }
        Ok(())
    }

    /// Apply every buffered event that continues the cursor
    fn drain(&mut self) -> Result<(), TrackerError> {
        for event in self.buffer.take_contiguous(self.last_sequence) {
            self.apply(event)?;
        }
        Ok(())
    }

    fn apply(&mut self, event: DiffEvent) -> Result<(), TrackerError> {
        let mutated = match &event.kind {
            DiffKind::Modify {
                side,
                price,
                quantity,
            } => {
                if let Err(e) = self.table_mut(*side).upsert(*price, *quantity) {
                    warn!(
                        market = %self.market,
                        sequence = event.sequence,
                        "Rejected diff: {}",
                        e
                    );
                    self.abandon();
                    return Err(e);
                }
                true
            }
            DiffKind::Remove { side, price } => {
                self.table_mut(*side).remove(*price);
                true
            }
            DiffKind::Trade(_) => false,
        };

        self.last_sequence = self.last_sequence.max(event.sequence);

        let metrics = if mutated {
            self.metrics.refresh(&self.asks, &self.bids)
        } else {
            self.metrics.current()
        };

        self.notifier.publish(DepthNotification::Update {
            market: self.market.clone(),
            sequence: event.sequence,
            event,
            metrics,
        });
        Ok(())
    }

    /// Give up on the current book after an unrecoverable mutation
    fn abandon(&mut self) {
        self.state = SyncState::Desynchronized;
        self.buffer.clear();
    }

    fn lose_sync(&mut self) {
        let buffered = self.buffer.len();
        warn!(
            market = %self.market,
            cursor = self.last_sequence,
            buffered,
            oldest = ?self.buffer.oldest_sequence(),
            newest = ?self.buffer.newest_sequence(),
            "Reorder window overflowed, book desynchronized"
        );

        self.state = SyncState::Desynchronized;
        self.buffer.clear();
        self.notifier.publish(DepthNotification::SyncLost {
            market: self.market.clone(),
            sequence: self.last_sequence,
            buffered,
        });
    }

    /// Replace the book with a snapshot
    ///
    /// Returns `Ok(false)` when no snapshot was expected (the response is
    /// stale and ignored). A frozen market is fatal for the session.
    pub fn apply_snapshot(&mut self, snapshot: DepthSnapshot) -> Result<bool, TrackerError> {
        if self.state != SyncState::Synchronizing {
            debug!(
                market = %self.market,
                sequence = snapshot.sequence,
                state = ?self.state,
                "Ignoring unexpected snapshot"
            );
            return Ok(false);
        }

        if snapshot.is_frozen {
            warn!(market = %self.market, "Snapshot reports market frozen");
            self.state = SyncState::Desynchronized;
            return Err(TrackerError::FrozenMarket(self.market.clone()));
        }

        let discarded = self.buffer.discard_through(snapshot.sequence);
        self.last_sequence = snapshot.sequence;
        let loaded = self
            .asks
            .load(snapshot.asks)
            .and_then(|_| self.bids.load(snapshot.bids));
        if let Err(e) = loaded {
            warn!(
                market = %self.market,
                sequence = snapshot.sequence,
                "Rejected snapshot: {}",
                e
            );
            self.asks.clear();
            self.bids.clear();
            self.metrics.reset();
            self.abandon();
            return Err(e);
        }
        self.metrics.refresh(&self.asks, &self.bids);
        self.state = SyncState::Synchronized;

        info!(
            market = %self.market,
            sequence = snapshot.sequence,
            asks = self.asks.len(),
            bids = self.bids.len(),
            discarded,
            "Sync complete"
        );
        self.notifier.publish(DepthNotification::SyncComplete {
            market: self.market.clone(),
            sequence: snapshot.sequence,
        });

        self.drain()?;
        Ok(true)
    }

    /// Drop all state and return to `Desynchronized`
    pub fn reset(&mut self) {
        self.state = SyncState::Desynchronized;
        self.last_sequence = 0;
        self.asks.clear();
        self.bids.clear();
        self.buffer.clear();
        self.metrics.reset();
    }

    fn table_mut(&mut self, side: Side) -> &mut DepthTable {
        match side {
            Side::Ask => &mut self.asks,
            Side::Bid => &mut self.bids,
        }
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn asks(&self) -> &DepthTable {
        &self.asks
    }

    pub fn bids(&self) -> &DepthTable {
        &self.bids
    }

    pub fn table(&self, side: Side) -> &DepthTable {
        match side {
            Side::Ask => &self.asks,
            Side::Bid => &self.bids,
        }
    }

    /// Nth best ask (0 = best)
    pub fn ask(&self, rank: usize) -> Option<DepthEntry> {
        self.asks.nth(rank).copied()
    }

    /// Nth best bid (0 = best)
    pub fn bid(&self, rank: usize) -> Option<DepthEntry> {
        self.bids.nth(rank).copied()
    }

    pub fn metrics(&self) -> DepthMetrics {
        self.metrics.current()
    }

    /// Current reorder buffer occupancy
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}
