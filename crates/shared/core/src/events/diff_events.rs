use crate::value_objects::{Notional, Price, Quantity, Side, Timestamp, TradeSide};
use serde::{Deserialize, Serialize};

/// Trade notification carried on the diff stream
///
/// Informational only; trades never mutate the depth tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradePrint {
    pub trade_id: u64,
    pub side: TradeSide,
    pub price: Price,
    pub quantity: Quantity,
    pub total: Notional,
    pub timestamp: Option<Timestamp>,
}

/// What a single diff record does to the book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiffKind {
    /// Insert or replace the level at `price`
    Modify {
        side: Side,
        price: Price,
        quantity: Quantity,
    },
    /// Delete the level at `price` (no-op if absent)
    Remove { side: Side, price: Price },
    Trade(TradePrint),
}

/// A sequence-numbered incremental change published by the exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEvent {
    pub sequence: u64,
    pub kind: DiffKind,
}

impl DiffEvent {
    pub fn new(sequence: u64, kind: DiffKind) -> Self {
        DiffEvent { sequence, kind }
    }

    pub fn modify(sequence: u64, side: Side, price: Price, quantity: Quantity) -> Self {
        DiffEvent::new(
            sequence,
            DiffKind::Modify {
                side,
                price,
                quantity,
            },
        )
    }

    pub fn remove(sequence: u64, side: Side, price: Price) -> Self {
        DiffEvent::new(sequence, DiffKind::Remove { side, price })
    }

    pub fn trade(sequence: u64, trade: TradePrint) -> Self {
        DiffEvent::new(sequence, DiffKind::Trade(trade))
    }

    /// Book side touched by this event (None for trades)
    pub fn side(&self) -> Option<Side> {
        match &self.kind {
            DiffKind::Modify { side, .. } | DiffKind::Remove { side, .. } => Some(*side),
            DiffKind::Trade(_) => None,
        }
    }

    pub fn is_trade(&self) -> bool {
        matches!(self.kind, DiffKind::Trade(_))
    }
}

/// One publication from the diff subscription
///
/// Every event in the batch shares the batch's sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffBatch {
    pub sequence: u64,
    pub events: Vec<DiffEvent>,
}

impl DiffBatch {
    pub fn new(sequence: u64, kinds: Vec<DiffKind>) -> Self {
        DiffBatch {
            sequence,
            events: kinds
                .into_iter()
                .map(|kind| DiffEvent::new(sequence, kind))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl IntoIterator for DiffBatch {
    type Item = DiffEvent;
    type IntoIter = std::vec::IntoIter<DiffEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}
