use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::warn;

use crate::domain::{Position, Trade, TradeKind};
use crate::error::LedgerError;
use crate::infrastructure::StoreState;
use crate::infrastructure::DEFAULT_PAGE_BASE_URL;
use crate::market::{format_mcap, format_roi, page_url};
use crate::services::ledger::{realized_newest_first, sorted_positions};
use crate::services::scheduler::{spawn_every, TaskHandle};
use crate::services::{PnlCalculator, PositionLedger};

#[derive(Debug, Clone)]
pub struct PortfolioConfig {
    pub poll_interval_ms: u64,
    pub history_limit: usize,
    /// Base for the token page links in the views.
    pub page_base_url: String,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            history_limit: 10,
            page_base_url: DEFAULT_PAGE_BASE_URL.to_string(),
        }
    }
}

/// An open position marked against its last seen market cap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenPositionView {
    pub mint: String,
    pub symbol: String,
    pub amount: Decimal,
    pub entry_mcap: Decimal,
    pub live_mcap: Decimal,
    pub roi_pct: Decimal,
    pub unrealized_sol: Decimal,
    pub entry_display: String,
    pub live_display: String,
    pub roi_display: String,
    pub page_url: String,
    pub opened_at: DateTime<Utc>,
}

impl OpenPositionView {
    fn from_position(position: &Position, page_base_url: &str) -> Self {
        // No live reading yet shows as flat.
        let roi_pct = PnlCalculator::unrealized_roi(position.entry_mcap, position.last_seen_mcap)
            .unwrap_or(Decimal::ZERO);
        let unrealized_sol = PnlCalculator::unrealized_profit(
            position.amount,
            position.entry_mcap,
            position.last_seen_mcap,
        )
        .unwrap_or(Decimal::ZERO);
        let live_mcap = position.mark_mcap();

        Self {
            mint: position.mint.clone(),
            symbol: position.symbol.clone(),
            amount: position.amount,
            entry_mcap: position.entry_mcap,
            live_mcap,
            roi_pct,
            unrealized_sol,
            entry_display: format!("${}", format_mcap(position.entry_mcap)),
            live_display: format!("${}", format_mcap(live_mcap)),
            roi_display: format_roi(roi_pct),
            page_url: page_url(page_base_url, &position.mint),
            opened_at: position.timestamp,
        }
    }

    pub fn is_profit(&self) -> bool {
        self.roi_pct >= Decimal::ZERO
    }
}

/// A closed round trip from the trade log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealizedTradeView {
    pub id: i64,
    pub mint: String,
    pub symbol: String,
    pub amount: Decimal,
    pub entry_mcap: Decimal,
    pub exit_mcap: Decimal,
    pub profit_sol: Decimal,
    pub roi_pct: Decimal,
    /// e.g. `+0.500 SOL (50.0%)`
    pub summary: String,
    /// e.g. `In: $10.0K | Out: $15.0K`
    pub range: String,
    pub page_url: String,
    pub closed_at: DateTime<Utc>,
}

impl RealizedTradeView {
    fn from_trade(trade: &Trade, page_base_url: &str) -> Option<Self> {
        let TradeKind::Sell {
            entry_mcap,
            exit_mcap,
            amount,
            profit_sol,
        } = trade.kind
        else {
            return None;
        };

        let roi_pct = PnlCalculator::profit_ratio(entry_mcap, exit_mcap)
            .ok()
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .unwrap_or(Decimal::ZERO)
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
        let profit = profit_sol.round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero);
        let sign = if profit_sol >= Decimal::ZERO { "+" } else { "" };

        Some(Self {
            id: trade.id,
            mint: trade.mint.clone(),
            symbol: trade.symbol.clone(),
            amount,
            entry_mcap,
            exit_mcap,
            profit_sol,
            roi_pct,
            summary: format!("{}{:.3} SOL ({:.1}%)", sign, profit, roi_pct),
            range: format!(
                "In: ${} | Out: ${}",
                format_mcap(entry_mcap),
                format_mcap(exit_mcap)
            ),
            page_url: page_url(page_base_url, &trade.mint),
            closed_at: trade.timestamp,
        })
    }

    pub fn is_profit(&self) -> bool {
        self.profit_sol >= Decimal::ZERO
    }
}

/// What the listing view shows: every open position and the most recent
/// realized trades, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PortfolioSnapshot {
    pub positions: Vec<OpenPositionView>,
    pub history: Vec<RealizedTradeView>,
    pub generated_at: Option<DateTime<Utc>>,
}

impl PortfolioSnapshot {
    pub fn from_state(state: &StoreState, config: &PortfolioConfig) -> Self {
        let base = config.page_base_url.as_str();
        let history = realized_newest_first(&state.trades, config.history_limit)
            .iter()
            .filter_map(|trade| RealizedTradeView::from_trade(trade, base))
            .collect();
        let positions = sorted_positions(state.clone())
            .iter()
            .map(|position| OpenPositionView::from_position(position, base))
            .collect();

        Self {
            positions,
            history,
            generated_at: Some(Utc::now()),
        }
    }
}

/// Listing-view logic: re-reads the store on a fixed interval and publishes
/// the latest snapshot.
pub struct PortfolioPoller {
    ledger: Arc<PositionLedger>,
    config: PortfolioConfig,
    snapshot_tx: watch::Sender<Arc<PortfolioSnapshot>>,
}

impl PortfolioPoller {
    pub fn new(ledger: Arc<PositionLedger>, config: PortfolioConfig) -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::new(PortfolioSnapshot::default()));
        Self {
            ledger,
            config,
            snapshot_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<PortfolioSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    pub fn current(&self) -> Arc<PortfolioSnapshot> {
        Arc::clone(&self.snapshot_tx.borrow())
    }

    /// Read the store now and publish the result.
    pub async fn refresh(&self) -> Result<Arc<PortfolioSnapshot>, LedgerError> {
        let state = self.ledger.state().await?;
        let snapshot = Arc::new(PortfolioSnapshot::from_state(&state, &self.config));
        self.snapshot_tx.send_replace(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    pub fn start(self: &Arc<Self>) -> TaskHandle {
        let poller = Arc::clone(self);
        spawn_every(
            "Portfolio poller",
            Duration::from_millis(self.config.poll_interval_ms),
            move || {
                let poller = Arc::clone(&poller);
                async move {
                    if let Err(e) = poller.refresh().await {
                        warn!("Portfolio refresh failed: {}", e);
                    }
                }
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sell(id: i64, entry: Decimal, exit: Decimal, amount: Decimal, profit: Decimal) -> Trade {
        Trade {
            id,
            mint: format!("mint{}", id),
            symbol: format!("T{}", id),
            kind: TradeKind::Sell {
                entry_mcap: entry,
                exit_mcap: exit,
                amount,
                profit_sol: profit,
            },
            timestamp: Utc::now(),
        }
    }

    fn buy(id: i64) -> Trade {
        Trade {
            id,
            mint: format!("mint{}", id),
            symbol: format!("T{}", id),
            kind: TradeKind::Buy {
                mcap: dec!(1000),
                amount: dec!(1),
            },
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_history_is_newest_first_and_limited() {
        let mut state = StoreState::default();
        for id in 1..=12 {
            state.trades.push(buy(id * 10));
            state
                .trades
                .push(sell(id * 10 + 1, dec!(1000), dec!(1500), dec!(1), dec!(0.5)));
        }

        let snapshot = PortfolioSnapshot::from_state(&state, &PortfolioConfig::default());

        assert_eq!(snapshot.history.len(), 10);
        assert_eq!(snapshot.history[0].id, 121);
        assert_eq!(snapshot.history[9].id, 31);
    }

    #[test]
    fn test_realized_view_formatting() {
        let trade = sell(1, dec!(10000), dec!(15000), dec!(1), dec!(0.5));
        let view = RealizedTradeView::from_trade(&trade, DEFAULT_PAGE_BASE_URL).unwrap();

        assert_eq!(view.roi_pct, dec!(50.0));
        assert_eq!(view.summary, "+0.500 SOL (50.0%)");
        assert_eq!(view.range, "In: $10.0K | Out: $15.0K");
        assert!(view.is_profit());

        let losing = sell(2, dec!(10000), dec!(2500), dec!(2), dec!(-1.5));
        let view = RealizedTradeView::from_trade(&losing, DEFAULT_PAGE_BASE_URL).unwrap();
        assert_eq!(view.summary, "-1.500 SOL (-75.0%)");
        assert!(!view.is_profit());

        assert!(RealizedTradeView::from_trade(&buy(3), DEFAULT_PAGE_BASE_URL).is_none());
    }

    #[test]
    fn test_open_position_marked_against_last_seen() {
        let mut position = Position::open("m", "PEPE", dec!(1000), dec!(2), Utc::now());
        position.last_seen_mcap = dec!(1500);

        let view = OpenPositionView::from_position(&position, DEFAULT_PAGE_BASE_URL);
        assert_eq!(view.roi_pct, dec!(50));
        assert_eq!(view.unrealized_sol, dec!(1));
        assert_eq!(view.roi_display, "+50.00%");
        assert_eq!(view.live_display, "$1.5K");
        assert_eq!(view.entry_display, "$1.0K");

        position.last_seen_mcap = Decimal::ZERO;
        let view = OpenPositionView::from_position(&position, DEFAULT_PAGE_BASE_URL);
        assert_eq!(view.roi_pct, Decimal::ZERO);
        assert_eq!(view.unrealized_sol, Decimal::ZERO);
        assert_eq!(view.roi_display, "+0.00%");
        assert_eq!(view.live_display, "$1.0K");
    }

    #[test]
    fn test_views_link_to_token_pages() {
        let mut state = StoreState::default();
        let position = Position::open("open1", "PEPE", dec!(1000), dec!(1), Utc::now());
        state.positions.insert("open1".to_string(), position);
        state.trades.push(sell(7, dec!(1000), dec!(2000), dec!(1), dec!(1)));

        let config = PortfolioConfig {
            page_base_url: "http://localhost:8080/coin/".to_string(),
            ..Default::default()
        };
        let snapshot = PortfolioSnapshot::from_state(&state, &config);

        assert_eq!(snapshot.positions[0].page_url, "http://localhost:8080/coin/open1");
        assert_eq!(snapshot.history[0].page_url, "http://localhost:8080/coin/mint7");

        let snapshot = PortfolioSnapshot::from_state(&state, &PortfolioConfig::default());
        assert_eq!(snapshot.positions[0].page_url, "https://pump.fun/coin/open1");
    }
}
