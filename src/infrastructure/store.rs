use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::{Position, Trade};
use crate::error::StoreError;

/// The whole persisted record: open positions by mint plus the trade log in
/// chronological order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    pub positions: HashMap<String, Position>,
    #[serde(default)]
    pub trades: Vec<Trade>,
}

impl StoreState {
    pub fn last_trade_id(&self) -> Option<i64> {
        self.trades.last().map(|trade| trade.id)
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() && self.trades.is_empty()
    }
}

/// Shared key-value persistence, read and written wholesale.
///
/// `read` returns an empty state when nothing has been stored yet. There is no
/// cross-writer isolation: a write replaces whatever is there.
#[async_trait]
pub trait Store: Send + Sync {
    async fn read(&self) -> Result<StoreState, StoreError>;
    async fn write(&self, state: &StoreState) -> Result<(), StoreError>;
}

/// Process-local store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn read(&self) -> Result<StoreState, StoreError> {
        Ok(self.state.read().await.clone())
    }

    async fn write(&self, state: &StoreState) -> Result<(), StoreError> {
        *self.state.write().await = state.clone();
        Ok(())
    }
}
