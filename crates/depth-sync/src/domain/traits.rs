use async_trait::async_trait;
use depth_core::{DepthSnapshot, DiffBatch, DiffEvent, Market};
use thiserror::Error;
use tokio::sync::mpsc;

/// Domain error for the external collaborators (snapshot query, diff subscription)
///
/// This is a domain-level abstraction that doesn't expose infrastructure details.
/// Infrastructure implementations convert their specific errors to this type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Network or communication failure
    #[error("Network error: {0}")]
    Network(String),
    /// API returned an error response
    #[error("API error {code}: {message}")]
    Api { code: i32, message: String },
    /// Failed to parse the response
    #[error("Parse error: {0}")]
    Parse(String),
    /// The diff stream ended
    #[error("Subscription closed for {0}")]
    SubscriptionClosed(Market),
}

/// Trait for fetching full depth snapshots
///
/// Implements Interface Segregation - only snapshot fetching capability.
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    async fn fetch_snapshot(&self, market: &Market, depth: u32)
    -> Result<DepthSnapshot, FetchError>;
}

/// Trait for subscribing to the sequenced diff stream of a market
///
/// Batches are delivered on the returned channel, mostly but not always in
/// sequence order, possibly duplicated. The stream ends when the sender drops.
#[async_trait]
pub trait DiffSubscriber: Send + Sync {
    async fn subscribe(&self, market: &Market) -> Result<mpsc::Receiver<DiffBatch>, FetchError>;
}

/// Trait for parsing one push-API record into a diff event
///
/// Implements Open/Closed - add new record kinds without modifying existing code.
pub trait RecordParser: Send + Sync {
    /// Check if this parser can handle the given record type
    fn can_parse(&self, kind: &str) -> bool;

    /// Parse the record payload. Returns None if parsing fails.
    fn parse(&self, sequence: u64, data: &serde_json::Value) -> Option<DiffEvent>;
}
