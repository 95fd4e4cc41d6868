use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{Position, Trade, TradeKind};
use crate::error::{LedgerError, TradeError};
use crate::market::{format_mcap, MarketCapExtractor, Page, PageReading, PageSource};
use crate::services::{PnlCalculator, PositionLedger};

/// Result of a user-initiated trade, once the store write has completed.
#[derive(Debug, Clone, Serialize)]
pub struct TradeOutcome {
    pub trade: Trade,
    /// The position after the trade; `None` once a SELL has closed it.
    pub position: Option<Position>,
    pub message: String,
}

/// User actions: buy a fixed unit, sell everything, reset.
///
/// Prices come from the token page: either HTML the client posted with the
/// request or a fresh fetch through the page source.
pub struct TradeDesk {
    ledger: Arc<PositionLedger>,
    pages: Arc<dyn PageSource>,
    extractor: Arc<dyn MarketCapExtractor>,
    unit_size: Decimal,
}

impl TradeDesk {
    pub fn new(
        ledger: Arc<PositionLedger>,
        pages: Arc<dyn PageSource>,
        extractor: Arc<dyn MarketCapExtractor>,
        unit_size: Decimal,
    ) -> Self {
        Self {
            ledger,
            pages,
            extractor,
            unit_size,
        }
    }

    /// Read symbol and market cap for `mint`, from `html` when given.
    pub async fn read_page(
        &self,
        mint: &str,
        html: Option<String>,
    ) -> Result<PageReading, TradeError> {
        let page = match html {
            Some(html) => Page::new(mint, html),
            None => self.pages.fetch(mint).await?,
        };
        Ok(page.read(self.extractor.as_ref()))
    }

    pub async fn buy(&self, mint: &str, html: Option<String>) -> Result<TradeOutcome, TradeError> {
        let reading = self.priced_reading(mint, html).await?;

        let (position, trade) = self
            .ledger
            .open_or_increase(mint, &reading.symbol, reading.market_cap, self.unit_size)
            .await?;

        let message = format!("BUY Executed at ${}", format_mcap(reading.market_cap));
        info!("{}", message);

        Ok(TradeOutcome {
            trade,
            position: Some(position),
            message,
        })
    }

    pub async fn sell_all(
        &self,
        mint: &str,
        html: Option<String>,
    ) -> Result<TradeOutcome, TradeError> {
        let reading = self.priced_reading(mint, html).await?;

        let trade = match self
            .ledger
            .close_position(mint, reading.market_cap, &reading.symbol)
            .await
        {
            Ok(trade) => trade,
            Err(e @ LedgerError::NoOpenPosition { .. }) => {
                warn!("{}", e);
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        let message = sell_message(&trade);
        info!("{}", message);

        Ok(TradeOutcome {
            trade,
            position: None,
            message,
        })
    }

    /// Wipe every position and trade. Irreversible, so it must be confirmed.
    pub async fn reset(&self, confirm: bool) -> Result<(), TradeError> {
        if !confirm {
            return Err(TradeError::ResetNotConfirmed);
        }
        self.ledger.reset().await?;
        Ok(())
    }

    async fn priced_reading(
        &self,
        mint: &str,
        html: Option<String>,
    ) -> Result<PageReading, TradeError> {
        let reading = self.read_page(mint, html).await?;
        if reading.market_cap <= Decimal::ZERO {
            warn!("Wait for Market Cap to load... ({})", mint);
            return Err(LedgerError::MarketCapUnavailable {
                mint: mint.to_string(),
            }
            .into());
        }
        Ok(reading)
    }
}

fn sell_message(trade: &Trade) -> String {
    let TradeKind::Sell {
        entry_mcap,
        exit_mcap,
        profit_sol,
        ..
    } = trade.kind
    else {
        return format!("SELL {}", trade.symbol);
    };

    let roi_pct = PnlCalculator::profit_ratio(entry_mcap, exit_mcap)
        .ok()
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::ZERO)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let profit = profit_sol.round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero);

    format!("SELL: ROI {:.2}% ({:.3} SOL)", roi_pct, profit)
}
