//! Depth Table
//!
//! One side of the book: unique price levels with running sums of quantity
//! and notional maintained on every mutation.

use std::collections::BTreeMap;

use depth_core::{DepthEntry, Notional, Price, Quantity, Side};

use crate::error::TrackerError;

/// Price levels of one side of the book
///
/// Levels are keyed by price, so duplicates are impossible and the map keeps
/// them sorted. Asks rank ascending, bids rank descending.
#[derive(Debug, Clone)]
pub struct DepthTable {
    side: Side,
    levels: BTreeMap<Price, DepthEntry>,
    total_quantity: Quantity,
    total_notional: Notional,
}

impl DepthTable {
    pub fn new(side: Side) -> Self {
        DepthTable {
            side,
            levels: BTreeMap::new(),
            total_quantity: Quantity::ZERO,
            total_notional: Notional::ZERO,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Insert or replace the level at `price`. Returns the replaced entry.
    ///
    /// Fails without touching the table if the level's notional or a running
    /// sum would leave decimal range.
    pub fn upsert(
        &mut self,
        price: Price,
        quantity: Quantity,
    ) -> Result<Option<DepthEntry>, TrackerError> {
        let side = self.side;
        let overflow = move || TrackerError::DepthOverflow { side, price };

        let entry = DepthEntry::new(price, quantity).map_err(|_| overflow())?;
        let (mut total_quantity, mut total_notional) = (self.total_quantity, self.total_notional);

        if let Some(old) = self.levels.get(&price) {
            total_quantity = total_quantity
                .checked_sub(old.quantity)
                .ok_or_else(overflow)?;
            total_notional = total_notional
                .checked_sub(old.notional)
                .ok_or_else(overflow)?;
        }
        self.total_quantity = total_quantity
            .checked_add(entry.quantity)
            .ok_or_else(overflow)?;
        self.total_notional = total_notional
            .checked_add(entry.notional)
            .ok_or_else(overflow)?;

        Ok(self.levels.insert(price, entry))
    }

    /// Remove the level at `price`. Removing a missing price is a no-op.
    pub fn remove(&mut self, price: Price) -> Option<DepthEntry> {
        let removed = self.levels.remove(&price)?;
        // The totals include `removed`, so these cannot leave range
        self.total_quantity = self
            .total_quantity
            .checked_sub(removed.quantity)
            .unwrap_or(Quantity::ZERO);
        self.total_notional = self
            .total_notional
            .checked_sub(removed.notional)
            .unwrap_or(Notional::ZERO);
        Some(removed)
    }

    /// Replace the whole side with snapshot levels (any order)
    ///
    /// On failure the side is left empty.
    pub fn load<I>(&mut self, levels: I) -> Result<(), TrackerError>
    where
        I: IntoIterator<Item = (Price, Quantity)>,
    {
        self.clear();
        for (price, quantity) in levels {
            if let Err(e) = self.upsert(price, quantity) {
                self.clear();
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.levels.clear();
        self.total_quantity = Quantity::ZERO;
        self.total_notional = Notional::ZERO;
    }

    /// Levels in rank order (best first)
    pub fn ranked(&self) -> Box<dyn Iterator<Item = &DepthEntry> + '_> {
        if self.side.is_ascending() {
            Box::new(self.levels.values())
        } else {
            Box::new(self.levels.values().rev())
        }
    }

    /// Level at `rank` (0 = best). Out of range returns None.
    pub fn nth(&self, rank: usize) -> Option<&DepthEntry> {
        if self.side.is_ascending() {
            self.levels.values().nth(rank)
        } else {
            self.levels.values().rev().nth(rank)
        }
    }

    pub fn best(&self) -> Option<&DepthEntry> {
        self.nth(0)
    }

    pub fn get(&self, price: Price) -> Option<&DepthEntry> {
        self.levels.get(&price)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Σ quantity over current levels
    pub fn total_quantity(&self) -> Quantity {
        self.total_quantity
    }

    /// Σ notional over current levels
    pub fn total_notional(&self) -> Notional {
        self.total_notional
    }

    /// Top `n` levels in rank order
    pub fn top(&self, n: usize) -> Vec<DepthEntry> {
        self.ranked().take(n).copied().collect()
    }
}
