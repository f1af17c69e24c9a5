use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of the depth book a level rests on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Ask,
    Bid,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Ask => Side::Bid,
            Side::Bid => Side::Ask,
        }
    }

    /// Asks rank ascending by price, bids descending
    pub fn is_ascending(&self) -> bool {
        matches!(self, Side::Ask)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Ask => write!(f, "ask"),
            Side::Bid => write!(f, "bid"),
        }
    }
}

impl TryFrom<&str> for Side {
    type Error = &'static str;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "ask" | "asks" | "sell" => Ok(Side::Ask),
            "bid" | "bids" | "buy" => Ok(Side::Bid),
            _ => Err("Invalid side: must be ask or bid"),
        }
    }
}

/// Taker side of a trade print
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "buy"),
            TradeSide::Sell => write!(f, "sell"),
        }
    }
}

impl TryFrom<&str> for TradeSide {
    type Error = &'static str;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "buy" => Ok(TradeSide::Buy),
            "sell" => Ok(TradeSide::Sell),
            _ => Err("Invalid trade side: must be buy or sell"),
        }
    }
}
