//! Depth Sync Crate
//!
//! Keeps a local replica of one market's order book depth consistent with
//! the exchange by reconciling full snapshots with a sequenced stream of
//! incremental diffs.
//!
//! # Architecture
//!
//! The tracker:
//! - Subscribes to the market's diff stream
//! - Requests a snapshot when it has no valid baseline
//! - Buffers diffs while the snapshot is in flight and while out of order
//! - Applies diffs strictly in sequence order once synchronized
//! - Drops back to resync when the reorder window overflows
//!
//! ```text
//!   push API (diffs)                 REST (returnOrderBook)
//!         │                                   ▲
//!         ▼                                   │ SnapshotFetcher
//! ┌───────────────┐  DiffSubscriber  ┌────────┴────────┐
//! │  ChannelFeed  │─────────────────▶│   DepthTracker  │
//! └───────────────┘   DiffBatch      │  (session task) │
//!                                    └────────┬────────┘
//!                                             ▼
//!                           ┌───────────────────────────────────┐
//!                           │           Synchronizer            │
//!                           │  ReorderBuffer  asks/bids tables  │
//!                           │         MetricsCalculator         │
//!                           └─────────────────┬─────────────────┘
//!                                             ▼
//!                                 NotificationPublisher
//!                                (broadcast to consumers)
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod presentation;

// Re-export key types
pub use domain::notifications::DepthNotification;
pub use domain::sync_state::SyncState;
pub use domain::traits::{DiffSubscriber, FetchError, RecordParser, SnapshotFetcher};
pub use error::TrackerError;

pub use application::config::TrackerConfig;
pub use application::depth_table::DepthTable;
pub use application::metrics::{DepthMetrics, MetricsCalculator};
pub use application::reorder_buffer::ReorderBuffer;
pub use application::synchronizer::{SyncAction, Synchronizer};
pub use application::tracker::{DepthTracker, DepthTrackerBuilder};

pub use infrastructure::channel_feed::ChannelFeed;
pub use infrastructure::parsers::{DiffRecordParser, ModifyParser, RemoveParser, TradeParser};
pub use infrastructure::rest_client::{RestClient, RestError};

pub use presentation::NotificationPublisher;

pub use config::{
    ConfigError, ExchangeConfig, MarketConfigJson, TrackerConfigFile, load_config,
    load_default_config,
};
