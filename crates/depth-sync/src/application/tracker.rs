//! Depth Tracker
//!
//! Owns one tracking session for one market: subscribes to the diff stream,
//! feeds the [`Synchronizer`], fetches snapshots when it asks for one and
//! publishes lifecycle notifications.
//!
//! The session runs as a single spawned task. Diff batches and snapshot
//! results are serialized through one `select!` loop, so the synchronizer
//! never sees concurrent mutation. Snapshot fetches run in their own task and
//! report back over a channel.

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use depth_core::{DepthEntry, DepthSnapshot, DiffBatch, Market};
use tokio::sync::{Notify, broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::domain::{DepthNotification, DiffSubscriber, FetchError, SnapshotFetcher, SyncState};
use crate::error::TrackerError;
use crate::presentation::NotificationPublisher;

use super::config::TrackerConfig;
use super::metrics::DepthMetrics;
use super::synchronizer::{SyncAction, Synchronizer};

type SnapshotResult = Result<DepthSnapshot, TrackerError>;

/// Depth tracker for a single market.
///
/// Generic over:
/// - `F`: SnapshotFetcher - for querying full depth snapshots
/// - `S`: DiffSubscriber - for the sequenced diff stream
pub struct DepthTracker<F, S>
where
    F: SnapshotFetcher + 'static,
    S: DiffSubscriber + 'static,
{
    config: TrackerConfig,
    fetcher: Arc<F>,
    subscriber: Arc<S>,
    sync: Mutex<Synchronizer>,
    notifier: NotificationPublisher,
    running: AtomicBool,
    /// Incremented on every start; a session task only acts while it is current
    session: AtomicU64,
    shutdown: Mutex<Option<Arc<Notify>>>,
}

impl<F, S> DepthTracker<F, S>
where
    F: SnapshotFetcher + 'static,
    S: DiffSubscriber + 'static,
{
    pub fn new(config: TrackerConfig, fetcher: F, subscriber: S) -> Result<Self, TrackerError> {
        Self::with_arcs(config, Arc::new(fetcher), Arc::new(subscriber))
    }

    /// Create tracker with pre-wrapped Arc dependencies
    pub fn with_arcs(
        config: TrackerConfig,
        fetcher: Arc<F>,
        subscriber: Arc<S>,
    ) -> Result<Self, TrackerError> {
        config.validate()?;

        let notifier = NotificationPublisher::new(config.notification_capacity);
        let sync = Synchronizer::new(&config, notifier.clone());

        Ok(DepthTracker {
            config,
            fetcher,
            subscriber,
            sync: Mutex::new(sync),
            notifier,
            running: AtomicBool::new(false),
            session: AtomicU64::new(0),
            shutdown: Mutex::new(None),
        })
    }

    /// Start a tracking session
    ///
    /// Resets the book, subscribes to the diff stream and spawns the session
    /// task. Fails with `AlreadyRunning` if a session is active, or with the
    /// subscription error (leaving the tracker stopped).
    pub async fn start(self: &Arc<Self>) -> Result<(), TrackerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(TrackerError::AlreadyRunning);
        }
        let session = self.session.fetch_add(1, Ordering::SeqCst) + 1;
        self.sync.lock().reset();

        let feed = match self.subscriber.subscribe(&self.config.market).await {
            Ok(feed) => feed,
            Err(e) => {
                error!(market = %self.config.market, "Failed to subscribe: {}", e);
                self.running.store(false, Ordering::SeqCst);
                return Err(TrackerError::Transport(e));
            }
        };

        let shutdown = Arc::new(Notify::new());
        *self.shutdown.lock() = Some(Arc::clone(&shutdown));

        info!(market = %self.config.market, session, "Tracker started");
        self.notifier.publish(DepthNotification::Started {
            market: self.config.market.clone(),
        });

        let tracker = Arc::clone(self);
        tokio::spawn(async move {
            tracker.run_event_loop(session, feed, shutdown).await;
        });

        Ok(())
    }

    /// Stop the current session
    ///
    /// `error` is carried in the `Stopped` notification. Diffs delivered
    /// after this call are discarded. Fails with `NotRunning` if idle.
    pub fn stop(&self, error: Option<TrackerError>) -> Result<(), TrackerError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(TrackerError::NotRunning);
        }
        self.finish(error);
        Ok(())
    }

    fn finish(&self, error: Option<TrackerError>) {
        if let Some(shutdown) = self.shutdown.lock().take() {
            shutdown.notify_one();
        }

        match &error {
            Some(e) => error!(market = %self.config.market, "Tracker stopped: {}", e),
            None => info!(market = %self.config.market, "Tracker stopped"),
        }

        self.notifier.publish(DepthNotification::Stopped {
            market: self.config.market.clone(),
            error,
        });
    }

    /// Stop from inside a session; no-op if that session already ended
    fn fail(&self, session: u64, error: TrackerError) {
        if self.session.load(Ordering::SeqCst) != session {
            return;
        }
        if self.running.swap(false, Ordering::SeqCst) {
            self.finish(Some(error));
        }
    }

    fn is_active(&self, session: u64) -> bool {
        self.running.load(Ordering::SeqCst) && self.session.load(Ordering::SeqCst) == session
    }

    async fn run_event_loop(
        self: Arc<Self>,
        session: u64,
        mut feed: mpsc::Receiver<DiffBatch>,
        shutdown: Arc<Notify>,
    ) {
        let (snapshot_tx, mut snapshot_rx) = mpsc::channel::<SnapshotResult>(1);

        loop {
            tokio::select! {
                _ = shutdown.notified() => break,

                batch = feed.recv() => {
                    let Some(batch) = batch else {
                        let market = self.config.market.clone();
                        self.fail(session, FetchError::SubscriptionClosed(market).into());
                        break;
                    };
                    if !self.is_active(session) {
                        break;
                    }
                    match self.handle_batch(session, batch) {
                        Ok(SyncAction::RequestSnapshot) => {
                            self.request_snapshot(snapshot_tx.clone());
                        }
                        Ok(SyncAction::Continue) => {}
                        Err(e) => {
                            self.fail(session, e);
                            break;
                        }
                    }
                }

                Some(result) = snapshot_rx.recv() => {
                    if !self.is_active(session) {
                        break;
                    }
                    if let Err(e) = self.handle_snapshot(result) {
                        self.fail(session, e);
                        break;
                    }
                }
            }
        }

        debug!(market = %self.config.market, session, "Session task exiting");
    }

    fn handle_batch(&self, session: u64, batch: DiffBatch) -> Result<SyncAction, TrackerError> {
        let mut sync = self.sync.lock();
        let mut action = SyncAction::Continue;

        for event in batch {
            if !self.is_active(session) {
                debug!(
                    market = %self.config.market,
                    sequence = event.sequence,
                    "Discarding diff after stop"
                );
                break;
            }
            if sync.handle_diff(event)? == SyncAction::RequestSnapshot {
                action = SyncAction::RequestSnapshot;
            }
        }

        Ok(action)
    }

    fn handle_snapshot(&self, result: SnapshotResult) -> Result<(), TrackerError> {
        let snapshot = result?;
        self.sync.lock().apply_snapshot(snapshot)?;
        Ok(())
    }

    /// Fetch a snapshot off the session task
    fn request_snapshot(&self, tx: mpsc::Sender<SnapshotResult>) {
        let fetcher = Arc::clone(&self.fetcher);
        let market = self.config.market.clone();
        let depth = self.config.depth_limit;
        let timeout = self.config.snapshot_timeout;

        debug!(market = %market, depth, "Fetching snapshot");

        tokio::spawn(async move {
            let fetch = fetcher.fetch_snapshot(&market, depth);
            let result = match timeout {
                Some(limit) => match tokio::time::timeout(limit, fetch).await {
                    Ok(result) => result.map_err(TrackerError::from),
                    Err(_) => {
                        warn!(market = %market, ?limit, "Snapshot fetch timed out");
                        Err(TrackerError::SnapshotTimeout(limit))
                    }
                },
                None => fetch.await.map_err(TrackerError::from),
            };

            if tx.send(result).await.is_err() {
                debug!(market = %market, "Session ended before snapshot arrived");
            }
        });
    }

    pub fn market(&self) -> &Market {
        &self.config.market
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Subscribe to this tracker's notifications
    pub fn notifications(&self) -> broadcast::Receiver<DepthNotification> {
        self.notifier.subscribe()
    }

    pub fn state(&self) -> SyncState {
        self.sync.lock().state()
    }

    pub fn last_sequence(&self) -> u64 {
        self.sync.lock().last_sequence()
    }

    /// Nth best ask (0 = best); `None` past the end of the table
    pub fn ask(&self, rank: usize) -> Option<DepthEntry> {
        self.sync.lock().ask(rank)
    }

    /// Nth best bid (0 = best); `None` past the end of the table
    pub fn bid(&self, rank: usize) -> Option<DepthEntry> {
        self.sync.lock().bid(rank)
    }

    pub fn ask_count(&self) -> usize {
        self.sync.lock().asks().len()
    }

    pub fn bid_count(&self) -> usize {
        self.sync.lock().bids().len()
    }

    /// Top `n` levels of both sides, best first
    pub fn depth(&self, n: usize) -> (Vec<DepthEntry>, Vec<DepthEntry>) {
        let sync = self.sync.lock();
        (sync.asks().top(n), sync.bids().top(n))
    }

    pub fn metrics(&self) -> DepthMetrics {
        self.sync.lock().metrics()
    }

    /// Current reorder buffer occupancy
    pub fn buffered(&self) -> usize {
        self.sync.lock().buffered()
    }
}

/// Builder for [`DepthTracker`]; both collaborators are required
pub struct DepthTrackerBuilder<F, S> {
    config: TrackerConfig,
    fetcher: Option<Arc<F>>,
    subscriber: Option<Arc<S>>,
}

impl<F, S> DepthTrackerBuilder<F, S>
where
    F: SnapshotFetcher + 'static,
    S: DiffSubscriber + 'static,
{
    pub fn new(config: TrackerConfig) -> Self {
        DepthTrackerBuilder {
            config,
            fetcher: None,
            subscriber: None,
        }
    }

    pub fn fetcher(mut self, fetcher: F) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    pub fn shared_fetcher(mut self, fetcher: Arc<F>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn subscriber(mut self, subscriber: S) -> Self {
        self.subscriber = Some(Arc::new(subscriber));
        self
    }

    pub fn shared_subscriber(mut self, subscriber: Arc<S>) -> Self {
        self.subscriber = Some(subscriber);
        self
    }

    pub fn build(self) -> Result<DepthTracker<F, S>, TrackerError> {
        let fetcher = self
            .fetcher
            .ok_or(TrackerError::MissingCollaborator("snapshot fetcher"))?;
        let subscriber = self
            .subscriber
            .ok_or(TrackerError::MissingCollaborator("diff subscriber"))?;

        DepthTracker::with_arcs(self.config, fetcher, subscriber)
    }
}
