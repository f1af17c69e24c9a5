use std::time::Duration;

use depth_core::Market;

use super::reorder_buffer::DEFAULT_BUFFER_CAPACITY;
use crate::error::TrackerError;

/// Default number of levels requested per snapshot side
pub const DEFAULT_DEPTH_LIMIT: u32 = 50;

/// Default capacity of the notification broadcast channel
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 1024;

/// Configuration for a single market tracker
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Market this tracker follows
    pub market: Market,
    /// Levels per side requested from the snapshot query
    pub depth_limit: u32,
    /// Maximum diff events held while out of order or while a snapshot is in flight
    pub buffer_capacity: usize,
    /// Give up on a snapshot fetch after this long (None waits forever)
    pub snapshot_timeout: Option<Duration>,
    /// Buffer the diff that triggers a resync instead of discarding it
    pub buffer_resync_trigger: bool,
    /// Capacity of the notification broadcast channel
    pub notification_capacity: usize,
}

impl TrackerConfig {
    pub fn new(market: Market) -> Self {
        TrackerConfig {
            market,
            depth_limit: DEFAULT_DEPTH_LIMIT,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            snapshot_timeout: None,
            buffer_resync_trigger: false,
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
        }
    }

    pub fn with_depth_limit(mut self, depth_limit: u32) -> Self {
        self.depth_limit = depth_limit;
        self
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn with_snapshot_timeout(mut self, timeout: Duration) -> Self {
        self.snapshot_timeout = Some(timeout);
        self
    }

    pub fn with_buffer_resync_trigger(mut self, enabled: bool) -> Self {
        self.buffer_resync_trigger = enabled;
        self
    }

    pub fn with_notification_capacity(mut self, capacity: usize) -> Self {
        self.notification_capacity = capacity;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.depth_limit == 0 {
            return Err(TrackerError::InvalidConfig(
                "depth_limit must be greater than zero".to_string(),
            ));
        }
        if self.buffer_capacity == 0 {
            return Err(TrackerError::InvalidConfig(
                "buffer_capacity must be greater than zero".to_string(),
            ));
        }
        if self.notification_capacity == 0 {
            return Err(TrackerError::InvalidConfig(
                "notification_capacity must be greater than zero".to_string(),
            ));
        }
        if self.snapshot_timeout == Some(Duration::ZERO) {
            return Err(TrackerError::InvalidConfig(
                "snapshot_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
