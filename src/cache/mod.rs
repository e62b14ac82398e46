//! Best-effort key/value cache
//!
//! [`CacheStore`] is the raw backend contract. [`Cache`] wraps a store with
//! JSON (de)serialization and swallows every backend failure: a broken cache
//! behaves like an empty one and never fails the caller.

pub mod memory_store;
pub mod redis_store;

pub use memory_store::MemoryCacheStore;
pub use redis_store::RedisCacheStore;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Cache backend failures
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Raw cache backend storing serialized values with a TTL
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;

    /// Drop expired entries; stores that expire keys themselves keep the default
    async fn purge_expired(&self) -> Result<usize, CacheError> {
        Ok(0)
    }
}

/// Typed, failure-tolerant cache handle
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
}

impl Cache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Cache backed by a process-local [`MemoryCacheStore`]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCacheStore::new()))
    }

    /// Read a value; backend and decoding failures read as a miss
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!("Cache get failed for key {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Cache entry {} could not be decoded: {}", key, e);
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Cache set failed for key {}: {}", key, e);
                return;
            }
        };

        if let Err(e) = self.store.set(key, raw, ttl).await {
            tracing::warn!("Cache set failed for key {}: {}", key, e);
        }
    }

    pub async fn delete(&self, key: &str) {
        if let Err(e) = self.store.delete(key).await {
            tracing::warn!("Cache delete failed for key {}: {}", key, e);
        }
    }

    pub async fn health_check(&self) -> bool {
        self.store.ping().await.is_ok()
    }

    /// Drop expired entries from the backing store; returns how many went
    pub async fn purge_expired(&self) -> usize {
        match self.store.purge_expired().await {
            Ok(purged) => purged,
            Err(e) => {
                tracing::warn!("Cache purge failed: {}", e);
                0
            }
        }
    }

    /// Cache-aside read
    ///
    /// Returns the cached value when present. Otherwise runs `load`, stores a
    /// successful result under `key` for `ttl` and returns it. Errors from
    /// `load` are returned as-is and never cached.
    pub async fn get_or_try_insert_with<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        load: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get::<T>(key).await {
            tracing::debug!("Cache hit for {}", key);
            return Ok(hit);
        }

        let value = load().await?;
        self.set(key, &value, ttl).await;
        Ok(value)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Store whose every operation fails
    pub struct FailingStore;

    #[async_trait]
    impl CacheStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }

        async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }

        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }

        async fn ping(&self) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }
    }
}
