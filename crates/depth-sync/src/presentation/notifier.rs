//! Notification Publisher
//!
//! Publishes tracker notifications to the owning application over a tokio
//! broadcast channel. Each subscriber gets its own receiver; publishing with
//! no subscribers is not an error.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;
use tracing::trace;

use crate::domain::DepthNotification;

/// Broadcast-based publisher for `DepthNotification`s
#[derive(Clone)]
pub struct NotificationPublisher {
    tx: broadcast::Sender<DepthNotification>,
    published: Arc<AtomicU64>,
}

impl NotificationPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));

        NotificationPublisher {
            tx,
            published: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Subscribe to every notification published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<DepthNotification> {
        self.tx.subscribe()
    }

    /// Publish a notification; dropped silently if nobody listens
    pub fn publish(&self, notification: DepthNotification) {
        self.published.fetch_add(1, Ordering::Relaxed);
        trace!(
            market = %notification.market(),
            kind = notification.kind(),
            "Publishing notification"
        );
        let _ = self.tx.send(notification);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Total notifications published, including ones nobody received
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl Default for NotificationPublisher {
    fn default() -> Self {
        Self::new(1024)
    }
}
