pub mod config;
pub mod depth_table;
pub mod metrics;
pub mod reorder_buffer;
pub mod synchronizer;
pub mod tracker;

pub use config::{DEFAULT_DEPTH_LIMIT, DEFAULT_NOTIFICATION_CAPACITY, TrackerConfig};
pub use depth_table::DepthTable;
pub use metrics::{DepthMetrics, MetricsCalculator};
pub use reorder_buffer::{DEFAULT_BUFFER_CAPACITY, ReorderBuffer};
pub use synchronizer::{SyncAction, Synchronizer};
pub use tracker::{DepthTracker, DepthTrackerBuilder};
