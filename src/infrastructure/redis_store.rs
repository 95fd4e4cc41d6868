use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::info;

use super::store::{Store, StoreState};
use crate::error::StoreError;

pub const DEFAULT_STORE_KEY: &str = "paper_trader:state";

/// The store as one JSON value under a namespaced Redis key.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    key: String,
}

impl RedisStore {
    pub async fn connect(redis_url: &str, key: impl Into<String>) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let connection = ConnectionManager::new(client).await?;
        let key = key.into();
        info!("Redis store connected (key: {})", key);
        Ok(Self { connection, key })
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn read(&self) -> Result<StoreState, StoreError> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = conn.get(&self.key).await?;
        match raw {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(StoreState::default()),
        }
    }

    async fn write(&self, state: &StoreState) -> Result<(), StoreError> {
        let json = serde_json::to_string(state)?;
        let mut conn = self.connection.clone();
        conn.set::<_, _, ()>(&self.key, json).await?;
        Ok(())
    }
}
