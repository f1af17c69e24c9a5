use crate::value_objects::{Price, Quantity};
use serde::{Deserialize, Serialize};

/// Point-in-time capture of the book used as a resynchronization baseline
///
/// Levels are kept in the order the exchange sent them; they are not
/// guaranteed to be sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthSnapshot {
    pub sequence: u64,
    pub asks: Vec<(Price, Quantity)>,
    pub bids: Vec<(Price, Quantity)>,
    pub is_frozen: bool,
}

impl DepthSnapshot {
    pub fn new(sequence: u64, asks: Vec<(Price, Quantity)>, bids: Vec<(Price, Quantity)>) -> Self {
        DepthSnapshot {
            sequence,
            asks,
            bids,
            is_frozen: false,
        }
    }

    pub fn frozen(mut self, is_frozen: bool) -> Self {
        self.is_frozen = is_frozen;
        self
    }
}
