use std::path::Path;
use thiserror::Error;

use crate::application::TrackerConfig;

use super::types::{MarketConfigJson, TrackerConfigFile};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("No enabled markets in config")]
    NoEnabledMarkets,
    #[error("Market not found: {0}")]
    MarketNotFound(String),
    #[error("Invalid market config: {0}")]
    InvalidMarket(String),
}

/// Load tracker configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TrackerConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: TrackerConfigFile = serde_json::from_str(&content)?;
    Ok(config)
}

/// Load configuration from a JSON string
pub fn load_config_from_str(json: &str) -> Result<TrackerConfigFile, ConfigError> {
    let config: TrackerConfigFile = serde_json::from_str(json)?;
    Ok(config)
}

/// Load the default embedded configuration
pub fn load_default_config() -> Result<TrackerConfigFile, ConfigError> {
    let default_config = include_str!("tracker_config.json");
    load_config_from_str(default_config)
}

impl TrackerConfigFile {
    /// Get only enabled markets
    pub fn enabled_markets(&self) -> Vec<&MarketConfigJson> {
        self.markets.iter().filter(|m| m.enabled).collect()
    }

    /// Get a specific market by identifier (case-insensitive)
    pub fn get_market(&self, market: &str) -> Option<&MarketConfigJson> {
        self.markets
            .iter()
            .find(|m| m.market.eq_ignore_ascii_case(market))
    }

    /// Tracker configuration for one market
    pub fn tracker_config(&self, market: &str) -> Result<TrackerConfig, ConfigError> {
        self.get_market(market)
            .ok_or_else(|| ConfigError::MarketNotFound(market.to_string()))?
            .to_tracker_config()
    }

    /// Tracker configurations for every enabled market
    pub fn tracker_configs(&self) -> Result<Vec<TrackerConfig>, ConfigError> {
        self.enabled_markets()
            .into_iter()
            .map(MarketConfigJson::to_tracker_config)
            .collect()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled_markets().is_empty() {
            return Err(ConfigError::NoEnabledMarkets);
        }
        self.tracker_configs()?;
        Ok(())
    }
}
