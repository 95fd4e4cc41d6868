use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregate numbers over the whole ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerStatistics {
    pub open_positions: usize,
    pub total_trades: usize,
    pub realized_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub total_realized_sol: Decimal,
    pub total_open_amount: Decimal,
}
