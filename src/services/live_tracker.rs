use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::Position;
use crate::error::LedgerError;
use crate::market::{format_mcap, format_roi, MarketCapExtractor, Page, PageSource};
use crate::services::scheduler::{spawn_every, TaskHandle};
use crate::services::{PnlCalculator, PositionLedger};

/// Live tracker configuration
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub poll_interval_ms: u64,
    /// Minimum gap between two `lastSeenMcap` writes for the same token.
    pub live_sync_interval_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            live_sync_interval_ms: 10000,
        }
    }
}

/// Live P/L view of one open position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveUpdate {
    pub mint: String,
    pub symbol: String,
    pub amount: Decimal,
    pub entry_mcap: Decimal,
    pub live_mcap: Decimal,
    pub roi_pct: Decimal,
    pub unrealized_sol: Decimal,
    pub entry_display: String,
    pub roi_display: String,
    pub timestamp: DateTime<Utc>,
}

impl LiveUpdate {
    fn new(position: &Position, live_mcap: Decimal, roi_pct: Decimal) -> Self {
        Self {
            mint: position.mint.clone(),
            symbol: position.symbol.clone(),
            amount: position.amount,
            entry_mcap: position.entry_mcap,
            live_mcap,
            roi_pct,
            unrealized_sol: PnlCalculator::unrealized_profit(
                position.amount,
                position.entry_mcap,
                live_mcap,
            )
            .unwrap_or(Decimal::ZERO),
            entry_display: format!("${}", format_mcap(position.entry_mcap)),
            roi_display: format_roi(roi_pct),
            timestamp: Utc::now(),
        }
    }

    pub fn is_profit(&self) -> bool {
        self.roi_pct >= Decimal::ZERO
    }
}

/// At most one pass per key within `min_interval`.
#[derive(Debug)]
pub struct RefreshThrottle {
    min_interval: Duration,
    last_run: HashMap<String, Instant>,
}

impl RefreshThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_run: HashMap::new(),
        }
    }

    /// True (and the window restarts) when `key` has not passed recently.
    pub fn ready(&mut self, key: &str) -> bool {
        let now = Instant::now();
        match self.last_run.get(key) {
            Some(last) if now.duration_since(*last) < self.min_interval => false,
            _ => {
                self.last_run.insert(key.to_string(), now);
                true
            }
        }
    }

    pub fn forget(&mut self, key: &str) {
        self.last_run.remove(key);
    }
}

/// Overlay logic: keeps live P/L for every open position fresh.
///
/// Each poll reads the token page, publishes a [`LiveUpdate`] and, at a
/// throttled cadence, writes the reading back as `lastSeenMcap` so the
/// portfolio view can mark positions without scraping.
pub struct LiveTracker {
    ledger: Arc<PositionLedger>,
    pages: Arc<dyn PageSource>,
    extractor: Arc<dyn MarketCapExtractor>,
    config: TrackerConfig,
    throttle: Mutex<RefreshThrottle>,
    latest: RwLock<HashMap<String, LiveUpdate>>,
    update_tx: broadcast::Sender<LiveUpdate>,
}

impl LiveTracker {
    pub fn new(
        ledger: Arc<PositionLedger>,
        pages: Arc<dyn PageSource>,
        extractor: Arc<dyn MarketCapExtractor>,
        config: TrackerConfig,
    ) -> Self {
        let (update_tx, _) = broadcast::channel(1000);
        let throttle = RefreshThrottle::new(Duration::from_millis(config.live_sync_interval_ms));

        Self {
            ledger,
            pages,
            extractor,
            config,
            throttle: Mutex::new(throttle),
            latest: RwLock::new(HashMap::new()),
            update_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveUpdate> {
        self.update_tx.subscribe()
    }

    pub async fn latest(&self, mint: &str) -> Option<LiveUpdate> {
        self.latest.read().await.get(mint).cloned()
    }

    pub async fn all_latest(&self) -> Vec<LiveUpdate> {
        self.latest.read().await.values().cloned().collect()
    }

    /// Start polling on the configured interval.
    pub fn start(self: &Arc<Self>) -> TaskHandle {
        let tracker = Arc::clone(self);
        spawn_every(
            "Live tracker",
            Duration::from_millis(self.config.poll_interval_ms),
            move || {
                let tracker = Arc::clone(&tracker);
                async move {
                    if let Err(e) = tracker.poll_once().await {
                        warn!("Live tracker poll failed: {}", e);
                    }
                }
            },
        )
    }

    /// One pass over every open position. Returns how many got a live reading.
    pub async fn poll_once(&self) -> Result<usize, LedgerError> {
        let positions = self.ledger.open_positions().await?;
        self.prune_closed(&positions).await;

        let mut updated = 0;
        for position in &positions {
            let page = match self.pages.fetch(&position.mint).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("Skipping {}: {}", position.mint, e);
                    continue;
                }
            };

            if self.track(position, &page).await.is_some() {
                updated += 1;
            }
        }

        debug!("Live tracker pass: {}/{} positions updated", updated, positions.len());
        Ok(updated)
    }

    /// Live view for a page a client already holds (the overlay's current tab).
    ///
    /// `None` when the token has no open position or the page shows no market
    /// cap yet.
    pub async fn observe(&self, page: &Page) -> Result<Option<LiveUpdate>, LedgerError> {
        match self.ledger.position(&page.mint).await? {
            Some(position) => Ok(self.track(&position, page).await),
            None => {
                self.latest.write().await.remove(&page.mint);
                self.throttle.lock().await.forget(&page.mint);
                Ok(None)
            }
        }
    }

    async fn track(&self, position: &Position, page: &Page) -> Option<LiveUpdate> {
        let live_mcap = page.read(self.extractor.as_ref()).market_cap;
        let Some(roi_pct) = PositionLedger::compute_unrealized_roi(position, live_mcap) else {
            debug!("No live market cap for {} yet", position.mint);
            return None;
        };

        let update = LiveUpdate::new(position, live_mcap, roi_pct);
        self.latest
            .write()
            .await
            .insert(position.mint.clone(), update.clone());
        let _ = self.update_tx.send(update.clone());

        if self.throttle.lock().await.ready(&position.mint) {
            match self.ledger.refresh_live_mcap(&position.mint, live_mcap).await {
                Ok(true) => info!(
                    "{} live mcap ${} ({})",
                    position.symbol,
                    format_mcap(live_mcap),
                    update.roi_display
                ),
                Ok(false) => {}
                Err(e) => warn!("Failed to sync live mcap for {}: {}", position.mint, e),
            }
        }

        Some(update)
    }

    async fn prune_closed(&self, open: &[Position]) {
        let mut latest = self.latest.write().await;
        let mut throttle = self.throttle.lock().await;
        latest.retain(|mint, _| {
            let still_open = open.iter().any(|p| &p.mint == mint);
            if !still_open {
                throttle.forget(mint);
            }
            still_open
        });
    }
}
