use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Position, PositionState};
use crate::market::{format_mcap, mint_from_url};
use crate::services::LiveUpdate;

// Request DTOs

/// Identifies a token page. The mint comes from `mint`, else from the last
/// segment of `url`. `html` is the rendered page, when the client has it.
#[derive(Debug, Default, Deserialize)]
pub struct PageRequest {
    pub mint: Option<String>,
    pub url: Option<String>,
    pub html: Option<String>,
}

impl PageRequest {
    pub fn resolve_mint(&self) -> Option<String> {
        self.mint
            .as_deref()
            .map(str::trim)
            .filter(|mint| !mint.is_empty())
            .map(str::to_string)
            .or_else(|| self.url.as_deref().and_then(mint_from_url))
    }
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Deserialize)]
pub struct TradeHistoryQuery {
    pub limit: Option<usize>,
}

// Response DTOs

#[derive(Debug, Serialize)]
pub struct PositionDto {
    pub mint: String,
    pub symbol: String,
    pub amount: Decimal,
    pub entry_mcap: Decimal,
    pub last_seen_mcap: Decimal,
    pub entry_display: String,
    pub opened_at: DateTime<Utc>,
}

impl From<Position> for PositionDto {
    fn from(position: Position) -> Self {
        Self {
            entry_display: format!("${}", format_mcap(position.entry_mcap)),
            mint: position.mint,
            symbol: position.symbol,
            amount: position.amount,
            entry_mcap: position.entry_mcap,
            last_seen_mcap: position.last_seen_mcap,
            opened_at: position.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PositionDetailsDto {
    pub position: PositionDto,
    pub live: Option<LiveUpdate>,
}

/// The overlay's view of the current page.
#[derive(Debug, Serialize)]
pub struct LiveViewDto {
    pub mint: String,
    pub market_cap: Decimal,
    pub market_cap_display: String,
    /// Which action the page offers: BUY only, or BUY and SELL.
    pub state: PositionState,
    pub live: Option<LiveUpdate>,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub message: String,
}
