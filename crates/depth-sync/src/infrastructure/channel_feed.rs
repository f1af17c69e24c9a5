//! In-process diff feed
//!
//! A [`DiffSubscriber`] backed by tokio channels. Whatever owns the real push
//! connection (or a test) publishes batches per market; each subscribed
//! tracker receives them on its own receiver. Re-subscribing a market
//! replaces the previous receiver.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use depth_core::{DiffBatch, Market};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::parsers::DiffRecordParser;
use crate::domain::{DiffSubscriber, FetchError};

/// Default per-market channel capacity
pub const DEFAULT_FEED_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct ChannelFeed {
    senders: Arc<DashMap<Market, mpsc::Sender<DiffBatch>>>,
    parser: Arc<DiffRecordParser>,
    capacity: usize,
}

impl Default for ChannelFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelFeed {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ChannelFeed {
            senders: Arc::new(DashMap::new()),
            parser: Arc::new(DiffRecordParser::new()),
            capacity: capacity.max(1),
        }
    }

    /// Use a custom record parser for `publish_raw`
    pub fn with_parser(mut self, parser: DiffRecordParser) -> Self {
        self.parser = Arc::new(parser);
        self
    }

    /// Deliver a batch to the market's subscriber
    pub async fn publish(&self, market: &Market, batch: DiffBatch) -> Result<(), FetchError> {
        // No map guard across the await
        let tx = self
            .senders
            .get(market)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| FetchError::SubscriptionClosed(market.clone()))?;

        if tx.send(batch).await.is_err() {
            self.senders.remove(market);
            return Err(FetchError::SubscriptionClosed(market.clone()));
        }
        Ok(())
    }

    /// Parse a raw push payload and deliver it; returns the number of events
    pub async fn publish_raw(
        &self,
        market: &Market,
        sequence: u64,
        payload: &Value,
    ) -> Result<usize, FetchError> {
        let batch = self.parser.parse_batch(sequence, payload);
        let count = batch.len();
        debug!(market = %market, sequence, count, "Publishing raw payload");
        self.publish(market, batch).await?;
        Ok(count)
    }

    /// End the market's stream. Returns false if it had no subscriber.
    pub fn close(&self, market: &Market) -> bool {
        let closed = self.senders.remove(market).is_some();
        if closed {
            info!(market = %market, "Closed diff feed");
        }
        closed
    }

    pub fn is_subscribed(&self, market: &Market) -> bool {
        self.senders
            .get(market)
            .is_some_and(|entry| !entry.value().is_closed())
    }
}

#[async_trait]
impl DiffSubscriber for ChannelFeed {
    async fn subscribe(&self, market: &Market) -> Result<mpsc::Receiver<DiffBatch>, FetchError> {
        let (tx, rx) = mpsc::channel(self.capacity);
        if self.senders.insert(market.clone(), tx).is_some() {
            debug!(market = %market, "Replaced existing diff subscription");
        }
        info!(market = %market, "Subscribed to diff feed");
        Ok(rx)
    }
}
