//! Tracker integration tests
//!
//! Drives a full tracking session through the in-process channel feed and a
//! scripted snapshot fetcher, observing the book through the public query
//! surface and the notification stream.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use serde_json::json;
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;

use depth_core::{DepthSnapshot, DiffBatch, DiffKind, Market, Price, Quantity, Side};
use depth_sync::{
    ChannelFeed, DepthNotification, DepthTracker, DepthTrackerBuilder, FetchError,
    SnapshotFetcher, SyncState, TrackerConfig, TrackerError,
};

const WAIT: Duration = Duration::from_secs(30);

// ============================================================================
// Test collaborators
// ============================================================================

/// Snapshot fetcher whose responses are fed by the test
struct ScriptedFetcher {
    responses: tokio::sync::Mutex<mpsc::Receiver<Result<DepthSnapshot, FetchError>>>,
    requests: Mutex<Vec<(Market, u32)>>,
}

impl ScriptedFetcher {
    fn new() -> (Self, mpsc::Sender<Result<DepthSnapshot, FetchError>>) {
        let (tx, rx) = mpsc::channel(8);
        let fetcher = ScriptedFetcher {
            responses: tokio::sync::Mutex::new(rx),
            requests: Mutex::new(Vec::new()),
        };
        (fetcher, tx)
    }
}

#[async_trait]
impl SnapshotFetcher for ScriptedFetcher {
    async fn fetch_snapshot(
        &self,
        market: &Market,
        depth: u32,
    ) -> Result<DepthSnapshot, FetchError> {
        self.requests.lock().push((market.clone(), depth));
        match self.responses.lock().await.recv().await {
            Some(response) => response,
            None => std::future::pending().await,
        }
    }
}

/// Snapshot fetcher that never answers
struct HangingFetcher;

#[async_trait]
impl SnapshotFetcher for HangingFetcher {
    async fn fetch_snapshot(
        &self,
        _market: &Market,
        _depth: u32,
    ) -> Result<DepthSnapshot, FetchError> {
        std::future::pending().await
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn market() -> Market {
    Market::new("BTC_ETH").unwrap()
}

fn p(s: &str) -> Price {
    Price::parse(s).unwrap()
}

fn q(s: &str) -> Quantity {
    Quantity::parse(s).unwrap()
}

fn modify(sequence: u64, side: Side, price: &str, qty: &str) -> DiffBatch {
    DiffBatch::new(
        sequence,
        vec![DiffKind::Modify {
            side,
            price: p(price),
            quantity: q(qty),
        }],
    )
}

fn book(sequence: u64) -> DepthSnapshot {
    DepthSnapshot::new(
        sequence,
        vec![(p("100.5"), q("2")), (p("101"), q("3"))],
        vec![(p("99"), q("1"))],
    )
}

/// Wait for the next notification of `kind`, skipping others
async fn expect_kind(
    rx: &mut broadcast::Receiver<DepthNotification>,
    kind: &str,
) -> DepthNotification {
    loop {
        let notification = timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for notification")
            .expect("notification channel closed");
        if notification.kind() == kind {
            return notification;
        }
    }
}

fn stop_error(notification: DepthNotification) -> Option<TrackerError> {
    match notification {
        DepthNotification::Stopped { error, .. } => error,
        other => panic!("expected stop notification, got {other:?}"),
    }
}

struct Session {
    tracker: Arc<DepthTracker<ScriptedFetcher, ChannelFeed>>,
    feed: ChannelFeed,
    snapshots: mpsc::Sender<Result<DepthSnapshot, FetchError>>,
    notifications: broadcast::Receiver<DepthNotification>,
}

async fn start_session(config: TrackerConfig) -> Session {
    init_tracing();
    let feed = ChannelFeed::new();
    let (fetcher, snapshots) = ScriptedFetcher::new();
    let tracker = Arc::new(
        DepthTrackerBuilder::new(config)
            .fetcher(fetcher)
            .subscriber(feed.clone())
            .build()
            .unwrap(),
    );
    let mut notifications = tracker.notifications();

    tracker.start().await.unwrap();
    expect_kind(&mut notifications, "start").await;

    Session {
        tracker,
        feed,
        snapshots,
        notifications,
    }
}

/// Start a session and bring it to Synchronized at `sequence`
async fn synced_session(config: TrackerConfig, sequence: u64) -> Session {
    let mut session = start_session(config).await;
    session
        .feed
        .publish(&market(), modify(1, Side::Ask, "500", "1"))
        .await
        .unwrap();
    expect_kind(&mut session.notifications, "sync_begin").await;

    session.snapshots.send(Ok(book(sequence))).await.unwrap();
    expect_kind(&mut session.notifications, "sync_complete").await;
    session
}

// ============================================================================
// Synchronization
// ============================================================================

#[tokio::test]
async fn test_initial_sync_end_to_end() {
    let mut session = start_session(TrackerConfig::new(market()).with_depth_limit(25)).await;
    assert_eq!(session.tracker.state(), SyncState::Desynchronized);

    session
        .feed
        .publish(&market(), modify(50, Side::Ask, "500", "1"))
        .await
        .unwrap();
    expect_kind(&mut session.notifications, "sync_begin").await;
    assert_eq!(session.tracker.state(), SyncState::Synchronizing);
    assert_eq!(session.tracker.buffered(), 0);

    session.snapshots.send(Ok(book(100))).await.unwrap();
    match expect_kind(&mut session.notifications, "sync_complete").await {
        DepthNotification::SyncComplete { sequence, .. } => assert_eq!(sequence, 100),
        other => panic!("unexpected {other:?}"),
    }

    let tracker = &session.tracker;
    assert_eq!(tracker.state(), SyncState::Synchronized);
    assert_eq!(tracker.last_sequence(), 100);
    assert_eq!(tracker.ask(0).unwrap().price, p("100.5"));
    assert_eq!(tracker.bid(0).unwrap().price, p("99"));
    assert!(tracker.ask(2).is_none());
    assert_eq!(tracker.ask_count(), 2);
    assert_eq!(tracker.bid_count(), 1);
    assert_eq!(tracker.metrics().spread, Some(dec!(1.5)));
    assert_eq!(tracker.metrics().ask_notional.inner(), dec!(504));
}

#[tokio::test]
async fn test_snapshot_requested_with_configured_depth() {
    init_tracing();
    let feed = ChannelFeed::new();
    let (fetcher, snapshots) = ScriptedFetcher::new();
    let fetcher = Arc::new(fetcher);
    let tracker = Arc::new(
        DepthTrackerBuilder::new(TrackerConfig::new(market()).with_depth_limit(25))
            .shared_fetcher(Arc::clone(&fetcher))
            .subscriber(feed.clone())
            .build()
            .unwrap(),
    );
    let mut rx = tracker.notifications();
    tracker.start().await.unwrap();

    feed.publish(&market(), modify(1, Side::Bid, "1", "1"))
        .await
        .unwrap();
    expect_kind(&mut rx, "sync_begin").await;
    snapshots.send(Ok(book(5))).await.unwrap();
    expect_kind(&mut rx, "sync_complete").await;

    assert_eq!(fetcher.requests.lock().as_slice(), &[(market(), 25)]);
}

#[tokio::test]
async fn test_diffs_buffered_during_snapshot_are_replayed() {
    let mut session = start_session(TrackerConfig::new(market())).await;
    let feed = &session.feed;

    feed.publish(&market(), modify(98, Side::Bid, "1", "1")).await.unwrap();
    expect_kind(&mut session.notifications, "sync_begin").await;

    feed.publish(&market(), modify(100, Side::Bid, "97", "1")).await.unwrap();
    feed.publish(&market(), modify(101, Side::Bid, "98", "4")).await.unwrap();
    feed.publish(&market(), modify(102, Side::Ask, "100.5", "0.5")).await.unwrap();

    // All three are queued on the feed before the snapshot is released
    while session.tracker.buffered() < 3 {
        tokio::task::yield_now().await;
    }

    session.snapshots.send(Ok(book(100))).await.unwrap();
    expect_kind(&mut session.notifications, "sync_complete").await;

    let mut updates = Vec::new();
    for _ in 0..2 {
        match expect_kind(&mut session.notifications, "update").await {
            DepthNotification::Update { sequence, .. } => updates.push(sequence),
            other => panic!("unexpected {other:?}"),
        }
    }

    assert_eq!(updates, vec![101, 102]);
    assert_eq!(session.tracker.last_sequence(), 102);
    assert_eq!(session.tracker.bid(0).unwrap().price, p("99"));
    assert_eq!(session.tracker.bid(1).unwrap().price, p("98"));
    assert_eq!(session.tracker.ask(0).unwrap().quantity, q("0.5"));
    assert_eq!(session.tracker.bid_count(), 2);
}

#[tokio::test]
async fn test_out_of_order_diffs_heal() {
    let mut session = synced_session(TrackerConfig::new(market()), 10).await;

    session
        .feed
        .publish(&market(), modify(12, Side::Ask, "100.7", "1"))
        .await
        .unwrap();
    session
        .feed
        .publish(&market(), modify(11, Side::Ask, "100.6", "1"))
        .await
        .unwrap();

    let mut updates = Vec::new();
    for _ in 0..2 {
        match expect_kind(&mut session.notifications, "update").await {
            DepthNotification::Update { sequence, .. } => updates.push(sequence),
            other => panic!("unexpected {other:?}"),
        }
    }

    assert_eq!(updates, vec![11, 12]);
    assert_eq!(session.tracker.last_sequence(), 12);
    assert_eq!(session.tracker.buffered(), 0);
    assert_eq!(session.tracker.ask(1).unwrap().price, p("100.6"));
}

#[tokio::test]
async fn test_overflow_loses_sync_then_recovers() {
    let mut session =
        synced_session(TrackerConfig::new(market()).with_buffer_capacity(2), 10).await;

    for seq in [20, 22, 24] {
        session
            .feed
            .publish(&market(), modify(seq, Side::Bid, "90", "1"))
            .await
            .unwrap();
    }

    match expect_kind(&mut session.notifications, "sync_lost").await {
        DepthNotification::SyncLost {
            sequence, buffered, ..
        } => {
            assert_eq!(sequence, 10);
            assert_eq!(buffered, 3);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(session.tracker.state(), SyncState::Desynchronized);
    // Book is kept until the next snapshot replaces it
    assert_eq!(session.tracker.ask_count(), 2);

    session
        .feed
        .publish(&market(), modify(30, Side::Bid, "90", "1"))
        .await
        .unwrap();
    expect_kind(&mut session.notifications, "sync_begin").await;

    let replacement = DepthSnapshot::new(40, vec![(p("200"), q("1"))], vec![(p("150"), q("2"))]);
    session.snapshots.send(Ok(replacement)).await.unwrap();
    expect_kind(&mut session.notifications, "sync_complete").await;

    assert_eq!(session.tracker.state(), SyncState::Synchronized);
    assert_eq!(session.tracker.last_sequence(), 40);
    assert_eq!(session.tracker.ask_count(), 1);
    assert_eq!(session.tracker.metrics().spread, Some(dec!(50)));
}

#[tokio::test]
async fn test_raw_push_payload() {
    let mut session = synced_session(TrackerConfig::new(market()), 10).await;

    let payload = json!([
        { "type": "orderBookModify", "data": { "type": "bid", "rate": "99.5", "amount": "2" } },
        { "type": "orderBookRemove", "data": { "type": "ask", "rate": "101" } },
        {
            "type": "newTrade",
            "data": {
                "tradeID": "1", "rate": "100.5", "amount": "1", "date": "2024-01-02 03:04:05",
                "total": "100.5", "type": "buy"
            }
        }
    ]);
    let count = session
        .feed
        .publish_raw(&market(), 11, &payload)
        .await
        .unwrap();
    assert_eq!(count, 3);

    for _ in 0..3 {
        expect_kind(&mut session.notifications, "update").await;
    }

    assert_eq!(session.tracker.bid(0).unwrap().price, p("99.5"));
    assert_eq!(session.tracker.ask_count(), 1);
    assert_eq!(session.tracker.metrics().spread, Some(dec!(1.0)));
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_start_stop_lifecycle() {
    let mut session = synced_session(TrackerConfig::new(market()), 10).await;
    let tracker = &session.tracker;

    assert!(tracker.is_running());
    assert_eq!(tracker.start().await, Err(TrackerError::AlreadyRunning));

    tracker.stop(None).unwrap();
    assert!(!tracker.is_running());
    assert_eq!(stop_error(expect_kind(&mut session.notifications, "stop").await), None);
    assert_eq!(tracker.stop(None), Err(TrackerError::NotRunning));

    // Restart begins from an empty book
    tracker.start().await.unwrap();
    expect_kind(&mut session.notifications, "start").await;
    assert_eq!(tracker.state(), SyncState::Desynchronized);
    assert_eq!(tracker.ask_count(), 0);
    assert_eq!(tracker.last_sequence(), 0);
}

#[tokio::test]
async fn test_stop_with_error_is_reported() {
    let mut session = start_session(TrackerConfig::new(market())).await;

    let reason = TrackerError::Transport(FetchError::Network("socket reset".to_string()));
    session.tracker.stop(Some(reason.clone())).unwrap();

    assert_eq!(
        stop_error(expect_kind(&mut session.notifications, "stop").await),
        Some(reason)
    );
}

#[tokio::test]
async fn test_diffs_after_stop_are_discarded() {
    let mut session = synced_session(TrackerConfig::new(market()), 10).await;

    session.tracker.stop(None).unwrap();
    expect_kind(&mut session.notifications, "stop").await;

    // The receiver may already be gone; either way nothing is applied
    let _ = session
        .feed
        .publish(&market(), modify(11, Side::Ask, "100.5", "9"))
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(session.tracker.last_sequence(), 10);
    assert_eq!(session.tracker.ask(0).unwrap().quantity, q("2"));
    assert!(matches!(
        session.notifications.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));
}

// ============================================================================
// Fatal conditions
// ============================================================================

#[tokio::test]
async fn test_frozen_market_stops_tracker() {
    let mut session = start_session(TrackerConfig::new(market())).await;

    session
        .feed
        .publish(&market(), modify(1, Side::Ask, "1", "1"))
        .await
        .unwrap();
    expect_kind(&mut session.notifications, "sync_begin").await;
    session
        .snapshots
        .send(Ok(book(100).frozen(true)))
        .await
        .unwrap();

    let error = stop_error(expect_kind(&mut session.notifications, "stop").await);
    assert_eq!(error, Some(TrackerError::FrozenMarket(market())));
    assert!(!session.tracker.is_running());
    assert_eq!(session.tracker.ask_count(), 0);
}

#[tokio::test]
async fn test_out_of_range_snapshot_stops_tracker() {
    let mut session = start_session(TrackerConfig::new(market())).await;

    session
        .feed
        .publish(&market(), modify(1, Side::Ask, "1", "1"))
        .await
        .unwrap();
    expect_kind(&mut session.notifications, "sync_begin").await;
    session
        .snapshots
        .send(Ok(DepthSnapshot::new(
            5,
            vec![(p("100000000000000000000"), q("10000000000"))],
            vec![(p("1"), q("1"))],
        )))
        .await
        .unwrap();

    let error = stop_error(expect_kind(&mut session.notifications, "stop").await);
    assert!(matches!(
        error,
        Some(TrackerError::DepthOverflow {
            side: Side::Ask,
            ..
        })
    ));
    assert!(!session.tracker.is_running());
    assert_eq!(session.tracker.ask_count(), 0);
    assert_eq!(session.tracker.bid_count(), 0);
}

#[tokio::test]
async fn test_out_of_range_diff_stops_tracker() {
    let mut session = synced_session(TrackerConfig::new(market()), 10).await;
    let asks_before = session.tracker.ask_count();

    session
        .feed
        .publish(&market(), modify(11, Side::Ask, "1e20", "1e10"))
        .await
        .unwrap();

    let error = stop_error(expect_kind(&mut session.notifications, "stop").await);
    assert!(matches!(error, Some(TrackerError::DepthOverflow { .. })));
    assert!(!session.tracker.is_running());
    assert_eq!(session.tracker.last_sequence(), 10);
    assert_eq!(session.tracker.ask_count(), asks_before);
}

#[tokio::test]
async fn test_fetch_failure_stops_tracker() {
    let mut session = start_session(TrackerConfig::new(market())).await;

    session
        .feed
        .publish(&market(), modify(1, Side::Ask, "1", "1"))
        .await
        .unwrap();
    expect_kind(&mut session.notifications, "sync_begin").await;

    let failure = FetchError::Api {
        code: 0,
        message: "Invalid currency pair.".to_string(),
    };
    session.snapshots.send(Err(failure.clone())).await.unwrap();

    let error = stop_error(expect_kind(&mut session.notifications, "stop").await);
    assert_eq!(error, Some(TrackerError::Transport(failure)));
    assert!(!session.tracker.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_timeout_stops_tracker() {
    init_tracing();
    let feed = ChannelFeed::new();
    let config = TrackerConfig::new(market()).with_snapshot_timeout(Duration::from_secs(5));
    let tracker = Arc::new(
        DepthTrackerBuilder::new(config)
            .fetcher(HangingFetcher)
            .subscriber(feed.clone())
            .build()
            .unwrap(),
    );
    let mut rx = tracker.notifications();
    tracker.start().await.unwrap();

    feed.publish(&market(), modify(1, Side::Ask, "1", "1"))
        .await
        .unwrap();
    expect_kind(&mut rx, "sync_begin").await;

    let error = stop_error(expect_kind(&mut rx, "stop").await);
    assert_eq!(
        error,
        Some(TrackerError::SnapshotTimeout(Duration::from_secs(5)))
    );
    assert!(!tracker.is_running());
}

#[tokio::test]
async fn test_subscription_close_stops_tracker() {
    let mut session = synced_session(TrackerConfig::new(market()), 10).await;

    assert!(session.feed.close(&market()));

    let error = stop_error(expect_kind(&mut session.notifications, "stop").await);
    assert_eq!(
        error,
        Some(TrackerError::Transport(FetchError::SubscriptionClosed(
            market()
        )))
    );
    assert!(!session.tracker.is_running());
}

#[tokio::test]
async fn test_independent_trackers_per_market() {
    init_tracing();
    let feed = ChannelFeed::new();
    let usdt = Market::new("USDT_BTC").unwrap();

    let (eth_fetcher, eth_snapshots) = ScriptedFetcher::new();
    let (btc_fetcher, btc_snapshots) = ScriptedFetcher::new();
    let eth = Arc::new(
        DepthTracker::new(TrackerConfig::new(market()), eth_fetcher, feed.clone()).unwrap(),
    );
    let btc = Arc::new(
        DepthTracker::new(TrackerConfig::new(usdt.clone()), btc_fetcher, feed.clone()).unwrap(),
    );
    let mut eth_rx = eth.notifications();
    let mut btc_rx = btc.notifications();

    eth.start().await.unwrap();
    btc.start().await.unwrap();

    feed.publish(&market(), modify(1, Side::Ask, "1", "1")).await.unwrap();
    feed.publish(&usdt, modify(1, Side::Ask, "1", "1")).await.unwrap();
    expect_kind(&mut eth_rx, "sync_begin").await;
    expect_kind(&mut btc_rx, "sync_begin").await;

    eth_snapshots.send(Ok(book(10))).await.unwrap();
    btc_snapshots
        .send(Ok(DepthSnapshot::new(500, vec![(p("42000"), q("1"))], vec![])))
        .await
        .unwrap();
    expect_kind(&mut eth_rx, "sync_complete").await;
    expect_kind(&mut btc_rx, "sync_complete").await;

    assert_eq!(eth.last_sequence(), 10);
    assert_eq!(btc.last_sequence(), 500);
    assert_eq!(btc.ask(0).unwrap().price, p("42000"));
    assert_eq!(btc.metrics().spread, None);
}
