pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod market;
pub mod services;

pub use api::create_router;
pub use config::AppConfig;
pub use services::{LiveTracker, PortfolioPoller, PositionLedger, TradeDesk};
