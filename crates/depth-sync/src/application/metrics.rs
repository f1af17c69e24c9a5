//! Depth metrics derived from the two depth tables after each applied mutation

use depth_core::{Notional, Quantity};
use rust_decimal::Decimal;
use serde::Serialize;

use super::depth_table::DepthTable;

/// Spread and side totals of a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DepthMetrics {
    /// best ask - best bid; None while either side is empty
    pub spread: Option<Decimal>,
    pub ask_quantity: Quantity,
    pub ask_notional: Notional,
    pub bid_quantity: Quantity,
    pub bid_notional: Notional,
}

/// Recomputes `DepthMetrics` from the depth tables
#[derive(Debug, Clone, Default)]
pub struct MetricsCalculator {
    current: DepthMetrics,
}

impl MetricsCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh from the current tables and return the new metrics
    ///
    /// Side totals are copied from the tables' running sums.
    pub fn refresh(&mut self, asks: &DepthTable, bids: &DepthTable) -> DepthMetrics {
        let spread = match (asks.best(), bids.best()) {
            (Some(ask), Some(bid)) => Some(ask.price - bid.price),
            _ => None,
        };

        self.current = DepthMetrics {
            spread,
            ask_quantity: asks.total_quantity(),
            ask_notional: asks.total_notional(),
            bid_quantity: bids.total_quantity(),
            bid_notional: bids.total_notional(),
        };
        self.current
    }

    pub fn current(&self) -> DepthMetrics {
        self.current
    }

    pub fn reset(&mut self) {
        self.current = DepthMetrics::default();
    }
}
