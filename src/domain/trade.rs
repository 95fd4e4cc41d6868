use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Side-specific fields of a trade record. Serialized inline next to the
/// common fields with a `type` tag, e.g. `{"type":"BUY","mcap":..,"amount":..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum TradeKind {
    Buy {
        mcap: Decimal,
        amount: Decimal,
    },
    #[serde(rename_all = "camelCase")]
    Sell {
        entry_mcap: Decimal,
        exit_mcap: Decimal,
        amount: Decimal,
        profit_sol: Decimal,
    },
}

/// Append-only trade log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: i64,
    pub mint: String,
    pub symbol: String,
    #[serde(flatten)]
    pub kind: TradeKind,
    pub timestamp: DateTime<Utc>,
}

impl Trade {
    pub fn side(&self) -> TradeSide {
        match self.kind {
            TradeKind::Buy { .. } => TradeSide::Buy,
            TradeKind::Sell { .. } => TradeSide::Sell,
        }
    }

    pub fn is_sell(&self) -> bool {
        self.side() == TradeSide::Sell
    }

    pub fn amount(&self) -> Decimal {
        match self.kind {
            TradeKind::Buy { amount, .. } | TradeKind::Sell { amount, .. } => amount,
        }
    }

    /// Realized profit, only present on SELL records.
    pub fn profit_sol(&self) -> Option<Decimal> {
        match self.kind {
            TradeKind::Sell { profit_sol, .. } => Some(profit_sol),
            TradeKind::Buy { .. } => None,
        }
    }
}

/// Next trade id: creation time in milliseconds, bumped past `last_id` so ids
/// stay strictly increasing even when two trades land in the same millisecond.
pub fn next_trade_id(last_id: Option<i64>, now: DateTime<Utc>) -> i64 {
    let millis = now.timestamp_millis();
    match last_id {
        Some(last) if last >= millis => last + 1,
        _ => millis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sell_record_wire_format() {
        let trade = Trade {
            id: 1,
            mint: "mint1".to_string(),
            symbol: "PEPE".to_string(),
            kind: TradeKind::Sell {
                entry_mcap: dec!(10000),
                exit_mcap: dec!(30000),
                amount: dec!(2),
                profit_sol: dec!(4),
            },
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&trade).unwrap();
        assert_eq!(json["type"], "SELL");
        assert!(json.get("exitMcap").is_some());
        assert!(json.get("profitSol").is_some());

        let back: Trade = serde_json::from_value(json).unwrap();
        assert_eq!(back, trade);
    }

    #[test]
    fn test_buy_record_reads_numeric_json() {
        let raw = r#"{"id":5,"mint":"m","symbol":"S","mcap":1500,"amount":1,"type":"BUY","timestamp":"2024-01-01T00:00:00.000Z"}"#;
        let trade: Trade = serde_json::from_str(raw).unwrap();

        assert_eq!(trade.side(), TradeSide::Buy);
        assert_eq!(trade.amount(), dec!(1));
        assert_eq!(trade.profit_sol(), None);
    }

    #[test]
    fn test_next_trade_id_is_monotonic() {
        let now = Utc::now();
        let millis = now.timestamp_millis();

        assert_eq!(next_trade_id(None, now), millis);
        assert_eq!(next_trade_id(Some(millis - 10), now), millis);
        assert_eq!(next_trade_id(Some(millis), now), millis + 1);
        assert_eq!(next_trade_id(Some(millis + 5), now), millis + 6);
    }
}
