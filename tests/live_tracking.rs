mod common;

use anyhow::Result;
use paper_trader::infrastructure::Store;
use paper_trader::market::{HeuristicExtractor, Page, PageSource, StaticPageSource};
use paper_trader::services::{
    spawn_every, LiveTracker, PortfolioConfig, PortfolioPoller, TrackerConfig,
};
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn tracker_with(
    ledger: Arc<paper_trader::PositionLedger>,
    pages: Arc<StaticPageSource>,
) -> Arc<LiveTracker> {
    Arc::new(LiveTracker::new(
        ledger,
        pages as Arc<dyn PageSource>,
        Arc::new(HeuristicExtractor::new()),
        TrackerConfig::default(),
    ))
}

#[tokio::test(start_paused = true)]
async fn test_spawn_every_runs_immediately_then_on_interval() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);

    let handle = spawn_every("counter", Duration::from_secs(2), move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    // Ticks at 0s, 2s, 4s
    tokio::time::sleep(Duration::from_millis(4500)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 3);

    handle.cancel().await;
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_stops_loop() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);

    let handle = spawn_every("dropped", Duration::from_secs(1), move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });
    tokio::time::sleep(Duration::from_millis(1500)).await;
    drop(handle);

    let seen = runs.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(runs.load(Ordering::SeqCst), seen);
}

#[tokio::test(start_paused = true)]
async fn test_tracker_publishes_live_roi() -> Result<()> {
    common::init_tracing();
    let (_, ledger) = common::memory_ledger();
    let pages = Arc::new(StaticPageSource::new());
    ledger.open_or_increase("mint1", "PEPE", dec!(1000), dec!(1)).await?;
    pages.insert("mint1", common::token_page("PEPE", "$1.5K")).await;

    let tracker = tracker_with(Arc::clone(&ledger), Arc::clone(&pages));
    let mut updates = tracker.subscribe();

    assert_eq!(tracker.poll_once().await?, 1);

    let update = updates.recv().await?;
    assert_eq!(update.mint, "mint1");
    assert_eq!(update.live_mcap, dec!(1500));
    assert_eq!(update.roi_pct, dec!(50));
    assert_eq!(update.roi_display, "+50.00%");
    assert_eq!(update.entry_display, "$1.0K");
    assert!(update.is_profit());
    assert_eq!(tracker.latest("mint1").await, Some(update));

    // First reading is synced to the store right away
    let position = ledger.position("mint1").await?.unwrap();
    assert_eq!(position.last_seen_mcap, dec!(1500));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_tracker_throttles_store_sync() -> Result<()> {
    let (store, ledger) = common::memory_ledger();
    let pages = Arc::new(StaticPageSource::new());
    ledger.open_or_increase("mint1", "PEPE", dec!(1000), dec!(1)).await?;
    pages.insert("mint1", common::token_page("PEPE", "$1.5K")).await;

    let tracker = tracker_with(Arc::clone(&ledger), Arc::clone(&pages));
    let handle = tracker.start();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(store.read().await?.positions["mint1"].last_seen_mcap, dec!(1500));

    // Next polls see a new price, but the 10s sync window is still closed
    pages.insert("mint1", common::token_page("PEPE", "$2.0K")).await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(store.read().await?.positions["mint1"].last_seen_mcap, dec!(1500));
    assert_eq!(tracker.latest("mint1").await.unwrap().live_mcap, dec!(2000));

    // Once the window passes the store catches up
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(store.read().await?.positions["mint1"].last_seen_mcap, dec!(2000));

    handle.cancel().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_tracker_skips_unreadable_pages() -> Result<()> {
    let (store, ledger) = common::memory_ledger();
    let pages = Arc::new(StaticPageSource::new());
    ledger.open_or_increase("loading", "LOAD", dec!(1000), dec!(1)).await?;
    ledger.open_or_increase("missing", "MISS", dec!(1000), dec!(1)).await?;
    pages.insert("loading", common::loading_page("LOAD")).await;

    let tracker = tracker_with(Arc::clone(&ledger), Arc::clone(&pages));

    assert_eq!(tracker.poll_once().await?, 0);
    assert!(tracker.latest("loading").await.is_none());
    // A zero reading never reaches the store
    assert_eq!(store.read().await?.positions["loading"].last_seen_mcap, dec!(1000));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_observe_hides_view_without_position() -> Result<()> {
    let (_, ledger) = common::memory_ledger();
    let pages = Arc::new(StaticPageSource::new());
    let tracker = tracker_with(Arc::clone(&ledger), pages);

    let page = Page::new("mint1", common::token_page("PEPE", "$3.0K"));
    assert!(tracker.observe(&page).await?.is_none());

    ledger.open_or_increase("mint1", "PEPE", dec!(2000), dec!(1)).await?;
    let update = tracker.observe(&page).await?.unwrap();
    assert_eq!(update.roi_pct, dec!(50));

    ledger.close_position("mint1", dec!(3000), "PEPE").await?;
    assert!(tracker.observe(&page).await?.is_none());
    assert!(tracker.latest("mint1").await.is_none());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_reopened_position_syncs_first_reading_immediately() -> Result<()> {
    let (store, ledger) = common::memory_ledger();
    let tracker = tracker_with(Arc::clone(&ledger), Arc::new(StaticPageSource::new()));
    let page = Page::new("mint1", common::token_page("PEPE", "$3.0K"));

    ledger.open_or_increase("mint1", "PEPE", dec!(1000), dec!(1)).await?;
    tracker.observe(&page).await?;
    assert_eq!(store.read().await?.positions["mint1"].last_seen_mcap, dec!(3000));

    // Closed and seen without a position: the sync window for the mint is dropped
    ledger.close_position("mint1", dec!(3000), "PEPE").await?;
    assert!(tracker.observe(&page).await?.is_none());

    // Reopened within the old window: the first reading still goes straight to the store
    ledger.open_or_increase("mint1", "PEPE", dec!(2000), dec!(1)).await?;
    let update = tracker.observe(&page).await?.unwrap();
    assert_eq!(update.roi_pct, dec!(50));
    assert_eq!(update.unrealized_sol, dec!(0.5));
    assert_eq!(store.read().await?.positions["mint1"].last_seen_mcap, dec!(3000));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_task_handle_reports_running_and_stopped() {
    let handle = spawn_every("idle", Duration::from_secs(1), || async {});
    assert_eq!(handle.name(), "idle");

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!handle.is_finished());

    handle.cancel().await;
}

#[tokio::test(start_paused = true)]
async fn test_panicking_task_finishes_and_cancels_cleanly() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);

    let handle = spawn_every("faulty", Duration::from_secs(1), move || {
        let counter = Arc::clone(&counter);
        async move {
            if counter.fetch_add(1, Ordering::SeqCst) == 1 {
                panic!("poll blew up");
            }
        }
    });

    tokio::time::sleep(Duration::from_millis(1500)).await;
    tokio::task::yield_now().await;
    assert!(handle.is_finished());
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    // The join error is reported, not propagated
    handle.cancel().await;

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_portfolio_poller_publishes_snapshots() -> Result<()> {
    let (_, ledger) = common::memory_ledger();
    let poller = Arc::new(PortfolioPoller::new(
        Arc::clone(&ledger),
        PortfolioConfig::default(),
    ));
    let mut snapshots = poller.subscribe();
    let handle = poller.start();

    ledger.open_or_increase("mint1", "PEPE", dec!(10000), dec!(1)).await?;
    ledger.close_position("mint1", dec!(15000), "PEPE").await?;
    ledger.open_or_increase("mint2", "WIF", dec!(2000), dec!(1)).await?;

    tokio::time::sleep(Duration::from_millis(1500)).await;
    snapshots.changed().await?;
    let snapshot = snapshots.borrow_and_update().clone();

    assert_eq!(snapshot.positions.len(), 1);
    assert_eq!(snapshot.positions[0].symbol, "WIF");
    assert_eq!(snapshot.history.len(), 1);
    assert_eq!(snapshot.history[0].summary, "+0.500 SOL (50.0%)");
    assert_eq!(poller.current().history.len(), 1);

    handle.cancel().await;
    Ok(())
}
