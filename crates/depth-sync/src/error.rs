//! Error types for the depth-sync crate

use std::time::Duration;

use depth_core::{Market, Price, Side};
use thiserror::Error;

use crate::domain::FetchError;

/// Tracking-session errors
///
/// Transport-boundary failures end the session and ride inside the
/// `Stopped` notification, so the type is cloneable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error("Transport error: {0}")]
    Transport(#[from] FetchError),

    #[error("Market {0} is frozen")]
    FrozenMarket(Market),

    #[error("Level {price} on {side} side leaves decimal range")]
    DepthOverflow { side: Side, price: Price },

    #[error("Snapshot fetch timed out after {0:?}")]
    SnapshotTimeout(Duration),

    #[error("Tracker is already running")]
    AlreadyRunning,

    #[error("Tracker is not running")]
    NotRunning,

    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TrackerError {
    /// Whether this error ends a tracking session
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TrackerError::Transport(_)
                | TrackerError::FrozenMarket(_)
                | TrackerError::DepthOverflow { .. }
                | TrackerError::SnapshotTimeout(_)
        )
    }
}
