use serde::{Deserialize, Serialize};
use std::time::Duration;

use depth_core::Market;

use crate::application::{
    DEFAULT_BUFFER_CAPACITY, DEFAULT_DEPTH_LIMIT, DEFAULT_NOTIFICATION_CAPACITY, TrackerConfig,
};

use super::loader::ConfigError;

/// Root configuration for the depth tracker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfigFile {
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub markets: Vec<MarketConfigJson>,
}

/// Configuration for the exchange serving snapshots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Unique identifier for the exchange (e.g., "poloniex")
    pub id: String,
    /// Display name
    pub name: String,
    /// REST API base URL
    pub rest_url: String,
    /// Per-request HTTP timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

impl ExchangeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Per-market tracking configuration (JSON representation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfigJson {
    /// Market identifier, e.g. "BTC_ETH"
    pub market: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_depth_limit")]
    pub depth_limit: u32,
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    /// Snapshot fetch timeout; absent means wait forever
    #[serde(default)]
    pub snapshot_timeout_ms: Option<u64>,
    #[serde(default)]
    pub buffer_resync_trigger: bool,
    #[serde(default = "default_notification_capacity")]
    pub notification_capacity: usize,
}

impl MarketConfigJson {
    /// Convert to application-layer TrackerConfig
    pub fn to_tracker_config(&self) -> Result<TrackerConfig, ConfigError> {
        let market = Market::new(self.market.as_str())
            .map_err(|e| ConfigError::InvalidMarket(format!("{}: {}", self.market, e)))?;

        let mut config = TrackerConfig::new(market)
            .with_depth_limit(self.depth_limit)
            .with_buffer_capacity(self.buffer_capacity)
            .with_buffer_resync_trigger(self.buffer_resync_trigger)
            .with_notification_capacity(self.notification_capacity);
        if let Some(ms) = self.snapshot_timeout_ms {
            config = config.with_snapshot_timeout(Duration::from_millis(ms));
        }

        config
            .validate()
            .map_err(|e| ConfigError::InvalidMarket(format!("{}: {}", self.market, e)))?;
        Ok(config)
    }
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    10_000
}

fn default_depth_limit() -> u32 {
    DEFAULT_DEPTH_LIMIT
}

fn default_buffer_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

fn default_notification_capacity() -> usize {
    DEFAULT_NOTIFICATION_CAPACITY
}
