use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValueError;

/// Identifier of a tracked trading pair (e.g. "BTC_ETH")
///
/// Markets are normalized to uppercase (e.g., "btc_eth" becomes "BTC_ETH").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Market(String);

impl Market {
    pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
        let s: String = value.into();
        let s = s.trim();
        if s.is_empty() {
            return Err(ValueError::InvalidMarket("market cannot be empty".to_string()));
        }
        if s.len() > 32 {
            return Err(ValueError::InvalidMarket(format!("{} (max 32 chars)", s)));
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ValueError::InvalidMarket(s.to_string()));
        }
        Ok(Market(s.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Market {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Market {
    type Error = ValueError;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Market::new(value)
    }
}

impl TryFrom<String> for Market {
    type Error = ValueError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Market::new(value)
    }
}

impl From<Market> for String {
    fn from(market: Market) -> Self {
        market.0
    }
}
