pub mod notifications;
pub mod sync_state;
pub mod traits;

pub use notifications::DepthNotification;
pub use sync_state::SyncState;
pub use traits::{DiffSubscriber, FetchError, RecordParser, SnapshotFetcher};
