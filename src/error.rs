use rust_decimal::Decimal;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store document is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[derive(Error, Debug)]
pub enum LedgerError {
    /// SELL without an open position. A user-facing rejection, nothing is mutated.
    #[error("No open position for {mint}")]
    NoOpenPosition { mint: String },

    /// A zero or negative market cap is a missing reading, never a price.
    #[error("Market cap for {mint} not available yet")]
    MarketCapUnavailable { mint: String },

    #[error("Invalid trade amount: {0}")]
    InvalidAmount(Decimal),

    #[error("Arithmetic overflow computing {0}")]
    Arithmetic(&'static str),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum PageError {
    #[error("Failed to fetch page for {mint}: {source}")]
    Fetch {
        mint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Page for {mint} returned HTTP {status}")]
    Status {
        mint: String,
        status: reqwest::StatusCode,
    },

    #[error("No page available for {mint}")]
    Missing { mint: String },
}

#[derive(Error, Debug)]
pub enum TradeError {
    #[error("Request names no token (give a mint or a page url)")]
    MissingMint,

    #[error("Reset requires explicit confirmation")]
    ResetNotConfirmed,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Page(#[from] PageError),
}
