//! Depth Core
//!
//! Pure value types shared by the depth synchronizer.
//! This crate contains no async, no I/O, and is fully unit testable.

pub mod entities;
pub mod events;
pub mod value_objects;

// Re-export value objects at crate root for convenience
pub use value_objects::{Market, Notional, Price, Quantity, Side, Timestamp, TradeSide, ValueError};

// Re-export entities at crate root
pub use entities::DepthEntry;

// Re-export events at crate root
pub use events::{DepthSnapshot, DiffBatch, DiffEvent, DiffKind, TradePrint};
