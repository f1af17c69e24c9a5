use crate::value_objects::{Notional, Price, Quantity, ValueError};
use serde::{Deserialize, Serialize};

/// A single aggregated price level on one side of the book
///
/// Immutable once built; an update replaces the whole entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthEntry {
    pub price: Price,
    pub quantity: Quantity,
    pub notional: Notional,
}

impl DepthEntry {
    /// Fails if price × quantity leaves decimal range
    pub fn new(price: Price, quantity: Quantity) -> Result<Self, ValueError> {
        let notional = price
            .checked_mul_qty(quantity)
            .ok_or(ValueError::Overflow("notional"))?;
        Ok(DepthEntry {
            price,
            quantity,
            notional,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.quantity.is_zero()
    }
}

impl TryFrom<(Price, Quantity)> for DepthEntry {
    type Error = ValueError;

    fn try_from((price, quantity): (Price, Quantity)) -> Result<Self, Self::Error> {
        DepthEntry::new(price, quantity)
    }
}
