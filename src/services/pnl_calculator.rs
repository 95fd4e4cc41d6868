use rust_decimal::Decimal;

use crate::error::LedgerError;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

pub struct PnlCalculator;

impl PnlCalculator {
    /// Relative move from entry to exit
    /// Formula: profit_ratio = (exit_mcap - entry_mcap) / entry_mcap
    pub fn profit_ratio(entry_mcap: Decimal, exit_mcap: Decimal) -> Result<Decimal, LedgerError> {
        if entry_mcap <= Decimal::ZERO {
            return Err(LedgerError::Arithmetic("profit ratio (entry mcap is not positive)"));
        }

        exit_mcap
            .checked_sub(entry_mcap)
            .and_then(|delta| delta.checked_div(entry_mcap))
            .ok_or(LedgerError::Arithmetic("profit ratio"))
    }

    /// Realized profit, in the same unit as `amount`
    /// Formula: profit_sol = amount × profit_ratio
    pub fn realized_profit(
        amount: Decimal,
        entry_mcap: Decimal,
        exit_mcap: Decimal,
    ) -> Result<Decimal, LedgerError> {
        let ratio = Self::profit_ratio(entry_mcap, exit_mcap)?;
        amount
            .checked_mul(ratio)
            .map(|profit| profit.normalize())
            .ok_or(LedgerError::Arithmetic("realized profit"))
    }

    /// Unrealized return in percent against a live reading
    /// Formula: roi = (live_mcap - entry_mcap) / entry_mcap × 100
    ///
    /// `None` when the live reading is missing (zero or negative).
    pub fn unrealized_roi(entry_mcap: Decimal, live_mcap: Decimal) -> Option<Decimal> {
        if live_mcap <= Decimal::ZERO {
            return None;
        }
        Self::profit_ratio(entry_mcap, live_mcap)
            .ok()
            .and_then(|ratio| ratio.checked_mul(HUNDRED))
    }

    /// Mark-to-market profit of an open position.
    pub fn unrealized_profit(
        amount: Decimal,
        entry_mcap: Decimal,
        live_mcap: Decimal,
    ) -> Option<Decimal> {
        if live_mcap <= Decimal::ZERO {
            return None;
        }
        Self::realized_profit(amount, entry_mcap, live_mcap).ok()
    }
}
