//! Key-value storage backends for the referral documents
//!
//! Each document lives under its own key as a JSON string. Backends know
//! nothing about the documents; decoding happens in the repository.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use referrify_common::{Error, Result};
use std::collections::HashMap;
use tracing::{debug, info};

/// Storage backend holding raw JSON documents by key
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the raw value under `key`
    async fn get(&mut self, key: &str) -> Result<Option<String>>;

    /// Replace the value under `key`
    async fn set(&mut self, key: &str, value: String) -> Result<()>;

    /// Verify the backend is reachable
    async fn ping(&mut self) -> Result<()>;
}

/// Redis-backed store
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Create a new storage instance
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        info!("Connected to Redis at {}", redis_url);

        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&mut self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = self.conn.get(key).await?;
        Ok(value)
    }

    async fn set(&mut self, key: &str, value: String) -> Result<()> {
        let _: () = self.conn.set(key, value).await?;
        debug!("Wrote key: {}", key);
        Ok(())
    }

    async fn ping(&mut self) -> Result<()> {
        let pong: String = redis::cmd("PING")
            .query_async(&mut self.conn)
            .await?;
        if pong != "PONG" {
            return Err(Error::Storage(format!("Unexpected PING reply: {}", pong)));
        }
        Ok(())
    }
}

/// In-process store, used for tests and `STORAGE_BACKEND=memory`
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&mut self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    async fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn ping(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_set_overwrites() {
        let mut store = MemoryStore::new();

        assert!(store.get("campaigns").await.unwrap().is_none());

        store.set("campaigns", "[]".to_string()).await.unwrap();
        assert_eq!(store.get("campaigns").await.unwrap().as_deref(), Some("[]"));

        store.set("campaigns", "[1]".to_string()).await.unwrap();
        assert_eq!(store.get("campaigns").await.unwrap().as_deref(), Some("[1]"));
        assert!(store.get("rewards").await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore] // Requires Redis to be running
    async fn test_redis_store_round_trip() {
        let mut store = RedisStore::new("redis://127.0.0.1:6379/15")
            .await
            .expect("Failed to connect to test Redis");

        store.ping().await.unwrap();

        let key = "referrify-test-round-trip";
        store.set(key, r#"{"email":"a@b.com"}"#.to_string()).await.unwrap();
        assert_eq!(
            store.get(key).await.unwrap().as_deref(),
            Some(r#"{"email":"a@b.com"}"#)
        );

        // Clean up
        let _: () = store.conn.del(key).await.unwrap();
    }
}
