use depth_core::{DiffEvent, Market};

use crate::application::metrics::DepthMetrics;
use crate::error::TrackerError;

/// Lifecycle and data notifications published by a tracker
#[derive(Debug, Clone)]
pub enum DepthNotification {
    /// Tracking started
    Started { market: Market },
    /// Tracking stopped, with the fatal error if one caused it
    Stopped {
        market: Market,
        error: Option<TrackerError>,
    },
    /// A snapshot was requested; diffs are buffered until it lands
    SyncBegin { market: Market },
    /// The snapshot was applied and the book is authoritative again
    SyncComplete { market: Market, sequence: u64 },
    /// The reorder window overflowed; a resync follows on the next diff
    SyncLost {
        market: Market,
        sequence: u64,
        buffered: usize,
    },
    /// A diff (book mutation or trade print) was applied
    Update {
        market: Market,
        sequence: u64,
        event: DiffEvent,
        metrics: DepthMetrics,
    },
}

impl DepthNotification {
    pub fn market(&self) -> &Market {
        match self {
            DepthNotification::Started { market }
            | DepthNotification::Stopped { market, .. }
            | DepthNotification::SyncBegin { market }
            | DepthNotification::SyncComplete { market, .. }
            | DepthNotification::SyncLost { market, .. }
            | DepthNotification::Update { market, .. } => market,
        }
    }

    /// Short name of the notification kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            DepthNotification::Started { .. } => "start",
            DepthNotification::Stopped { .. } => "stop",
            DepthNotification::SyncBegin { .. } => "sync_begin",
            DepthNotification::SyncComplete { .. } => "sync_complete",
            DepthNotification::SyncLost { .. } => "sync_lost",
            DepthNotification::Update { .. } => "update",
        }
    }
}
