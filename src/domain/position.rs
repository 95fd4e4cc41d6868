use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An open paper position, one per token mint.
///
/// `entry_mcap` and `timestamp` are fixed by the first BUY and carried forward
/// by every additive BUY. A SELL always removes the whole position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub mint: String,
    pub symbol: String,
    pub entry_mcap: Decimal,
    pub amount: Decimal,
    pub last_seen_mcap: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Position {
    pub fn open(
        mint: impl Into<String>,
        symbol: impl Into<String>,
        mcap: Decimal,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            mint: mint.into(),
            symbol: symbol.into(),
            entry_mcap: mcap,
            amount,
            last_seen_mcap: mcap,
            timestamp: now,
        }
    }

    /// Additive buy: size grows, entry and creation time stay put.
    pub fn increase(&mut self, symbol: impl Into<String>, mcap: Decimal, amount: Decimal) {
        self.symbol = symbol.into();
        self.amount += amount;
        self.last_seen_mcap = mcap;
    }

    /// Market cap to mark against, falling back to entry when nothing live was seen.
    pub fn mark_mcap(&self) -> Decimal {
        if self.last_seen_mcap > Decimal::ZERO {
            self.last_seen_mcap
        } else {
            self.entry_mcap
        }
    }
}

/// Per-token lifecycle. There is no partial state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionState {
    None,
    Open,
}

impl PositionState {
    pub fn of(position: Option<&Position>) -> Self {
        match position {
            Some(_) => PositionState::Open,
            None => PositionState::None,
        }
    }
}
