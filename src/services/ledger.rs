use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::{next_trade_id, LedgerStatistics, Position, Trade, TradeKind};
use crate::error::LedgerError;
use crate::infrastructure::{Store, StoreState};
use crate::services::PnlCalculator;

/// Paper position book over the shared store.
///
/// Every mutation is a full read, in-memory change and full write-back. All
/// of them go through one async mutex, so the trade path and the background
/// refresh path in this process cannot lose each other's updates. Other
/// processes writing the same store are not coordinated with.
pub struct PositionLedger {
    store: Arc<dyn Store>,
    write_lock: Mutex<()>,
}

impl PositionLedger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn state(&self) -> Result<StoreState, LedgerError> {
        Ok(self.store.read().await?)
    }

    pub async fn position(&self, mint: &str) -> Result<Option<Position>, LedgerError> {
        Ok(self.state().await?.positions.remove(mint))
    }

    /// Open positions, oldest first.
    pub async fn open_positions(&self) -> Result<Vec<Position>, LedgerError> {
        let state = self.state().await?;
        Ok(sorted_positions(state))
    }

    /// SELL records, newest first.
    pub async fn realized_trades(&self, limit: usize) -> Result<Vec<Trade>, LedgerError> {
        let state = self.state().await?;
        Ok(realized_newest_first(&state.trades, limit))
    }

    pub async fn statistics(&self) -> Result<LedgerStatistics, LedgerError> {
        let state = self.state().await?;
        let mut stats = LedgerStatistics {
            open_positions: state.positions.len(),
            total_trades: state.trades.len(),
            total_open_amount: state.positions.values().map(|p| p.amount).sum(),
            ..Default::default()
        };

        for profit in state.trades.iter().filter_map(Trade::profit_sol) {
            stats.realized_trades += 1;
            stats.total_realized_sol += profit;
            if profit > Decimal::ZERO {
                stats.winning_trades += 1;
            } else if profit < Decimal::ZERO {
                stats.losing_trades += 1;
            }
        }

        Ok(stats)
    }

    /// BUY: open a position or add to it.
    ///
    /// A new position takes `mcap` as its entry. An existing one keeps its entry
    /// and creation time, grows by `unit_amount` and records `mcap` as last seen.
    pub async fn open_or_increase(
        &self,
        mint: &str,
        symbol: &str,
        mcap: Decimal,
        unit_amount: Decimal,
    ) -> Result<(Position, Trade), LedgerError> {
        if mcap <= Decimal::ZERO {
            return Err(LedgerError::MarketCapUnavailable {
                mint: mint.to_string(),
            });
        }
        if unit_amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(unit_amount));
        }

        let _guard = self.write_lock.lock().await;
        let mut state = self.store.read().await?;
        let now = Utc::now();

        let position = match state.positions.get_mut(mint) {
            Some(existing) => {
                existing.increase(symbol, mcap, unit_amount);
                existing.clone()
            }
            None => {
                let opened = Position::open(mint, symbol, mcap, unit_amount, now);
                state.positions.insert(mint.to_string(), opened.clone());
                opened
            }
        };

        let trade = Trade {
            id: next_trade_id(state.last_trade_id(), now),
            mint: mint.to_string(),
            symbol: symbol.to_string(),
            kind: TradeKind::Buy {
                mcap,
                amount: unit_amount,
            },
            timestamp: now,
        };
        state.trades.push(trade.clone());

        self.store.write(&state).await?;

        info!(
            "BUY {} ({}) {} at mcap {} -> size {} (entry {})",
            symbol, mint, unit_amount, mcap, position.amount, position.entry_mcap
        );

        Ok((position, trade))
    }

    /// SELL: close the whole position at `exit_mcap` and book the profit.
    pub async fn close_position(
        &self,
        mint: &str,
        exit_mcap: Decimal,
        symbol: &str,
    ) -> Result<Trade, LedgerError> {
        let _guard = self.write_lock.lock().await;
        let mut state = self.store.read().await?;

        let position = state
            .positions
            .get(mint)
            .cloned()
            .ok_or_else(|| LedgerError::NoOpenPosition {
                mint: mint.to_string(),
            })?;

        if exit_mcap <= Decimal::ZERO {
            return Err(LedgerError::MarketCapUnavailable {
                mint: mint.to_string(),
            });
        }

        let profit_sol =
            PnlCalculator::realized_profit(position.amount, position.entry_mcap, exit_mcap)?;
        let now = Utc::now();

        let trade = Trade {
            id: next_trade_id(state.last_trade_id(), now),
            mint: mint.to_string(),
            symbol: symbol.to_string(),
            kind: TradeKind::Sell {
                entry_mcap: position.entry_mcap,
                exit_mcap,
                amount: position.amount,
                profit_sol,
            },
            timestamp: now,
        };

        state.trades.push(trade.clone());
        state.positions.remove(mint);

        self.store.write(&state).await?;

        info!(
            "SELL {} ({}) {} at mcap {} (entry {}) -> {} SOL",
            symbol, mint, position.amount, exit_mcap, position.entry_mcap, profit_sol
        );

        Ok(trade)
    }

    /// Record a fresh live reading on an open position. Never creates a trade.
    ///
    /// Returns whether anything was written: a missing position or a missing
    /// reading leaves the store untouched.
    pub async fn refresh_live_mcap(
        &self,
        mint: &str,
        live_mcap: Decimal,
    ) -> Result<bool, LedgerError> {
        if live_mcap <= Decimal::ZERO {
            return Ok(false);
        }

        let _guard = self.write_lock.lock().await;
        let mut state = self.store.read().await?;

        let Some(position) = state.positions.get_mut(mint) else {
            return Ok(false);
        };
        if position.last_seen_mcap == live_mcap {
            return Ok(false);
        }
        position.last_seen_mcap = live_mcap;

        self.store.write(&state).await?;
        debug!("Synced last seen mcap for {}: {}", mint, live_mcap);
        Ok(true)
    }

    /// Unrealized return in percent, `None` without a live reading.
    pub fn compute_unrealized_roi(position: &Position, live_mcap: Decimal) -> Option<Decimal> {
        PnlCalculator::unrealized_roi(position.entry_mcap, live_mcap)
    }

    /// Wipe every position and the whole trade history.
    pub async fn reset(&self) -> Result<(), LedgerError> {
        let _guard = self.write_lock.lock().await;
        self.store.write(&StoreState::default()).await?;
        info!("Ledger reset: all positions and trades cleared");
        Ok(())
    }
}

pub(crate) fn sorted_positions(state: StoreState) -> Vec<Position> {
    let mut positions: Vec<Position> = state.positions.into_values().collect();
    positions.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.mint.cmp(&b.mint)));
    positions
}

pub(crate) fn realized_newest_first(trades: &[Trade], limit: usize) -> Vec<Trade> {
    trades
        .iter()
        .rev()
        .filter(|trade| trade.is_sell())
        .take(limit)
        .cloned()
        .collect()
}
