use anyhow::{anyhow, Context, Result};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;

use crate::infrastructure::{DEFAULT_PAGE_BASE_URL, DEFAULT_STORE_KEY};
use crate::services::{PortfolioConfig, TrackerConfig};

/// Where the shared state lives.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    Json { path: PathBuf },
    Redis { url: String, key: String },
}

/// Service configuration, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub store: StoreBackend,
    pub page_base_url: String,
    pub unit_size: Decimal,
    pub tracker: TrackerConfig,
    pub portfolio: PortfolioConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            store: StoreBackend::Json {
                path: PathBuf::from("paper_trades.json"),
            },
            page_base_url: DEFAULT_PAGE_BASE_URL.to_string(),
            unit_size: Decimal::ONE,
            tracker: TrackerConfig::default(),
            portfolio: PortfolioConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let store = match lookup("STORE_BACKEND").as_deref().unwrap_or("json") {
            "json" => StoreBackend::Json {
                path: lookup("STORE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("paper_trades.json")),
            },
            "redis" => StoreBackend::Redis {
                url: lookup("REDIS_URL")
                    .unwrap_or_else(|| "redis://localhost:6379".to_string()),
                key: lookup("STORE_KEY").unwrap_or_else(|| DEFAULT_STORE_KEY.to_string()),
            },
            other => return Err(anyhow!("Unknown STORE_BACKEND: {}", other)),
        };

        let unit_size: Decimal = parse_or(&lookup, "TRADE_UNIT_SIZE", defaults.unit_size)?;
        if unit_size <= Decimal::ZERO {
            return Err(anyhow!("TRADE_UNIT_SIZE must be positive, got {}", unit_size));
        }

        let page_base_url = lookup("PAGE_BASE_URL").unwrap_or(defaults.page_base_url);

        Ok(Self {
            port: parse_or(&lookup, "PORT", defaults.port)?,
            store,
            page_base_url: page_base_url.clone(),
            unit_size,
            tracker: TrackerConfig {
                poll_interval_ms: parse_or(
                    &lookup,
                    "TRACKER_INTERVAL_MS",
                    defaults.tracker.poll_interval_ms,
                )?,
                live_sync_interval_ms: parse_or(
                    &lookup,
                    "LIVE_SYNC_INTERVAL_MS",
                    defaults.tracker.live_sync_interval_ms,
                )?,
            },
            portfolio: PortfolioConfig {
                poll_interval_ms: parse_or(
                    &lookup,
                    "PORTFOLIO_INTERVAL_MS",
                    defaults.portfolio.poll_interval_ms,
                )?,
                history_limit: parse_or(
                    &lookup,
                    "HISTORY_LIMIT",
                    defaults.portfolio.history_limit,
                )?,
                page_base_url,
            },
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
