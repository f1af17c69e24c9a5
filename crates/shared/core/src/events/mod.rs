mod diff_events;
mod snapshot;

pub use diff_events::{DiffBatch, DiffEvent, DiffKind, TradePrint};
pub use snapshot::DepthSnapshot;
