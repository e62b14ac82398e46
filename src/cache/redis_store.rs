use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::Client as RedisClient;
use tracing::debug;

use super::{CacheError, CacheStore};

/// Redis-backed cache store
///
/// Keys expire on the server (`SET ... PX`), so nothing needs purging here.
#[derive(Clone)]
pub struct RedisCacheStore {
    connection: MultiplexedConnection,
}

impl RedisCacheStore {
    /// Open a multiplexed connection to `redis_url`
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = RedisClient::open(redis_url)?;
        let connection = client.get_multiplexed_async_connection().await?;

        debug!("Connected to Redis at: {}", redis_url);

        Ok(Self { connection })
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        // PX rejects 0
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);

        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        let _: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Requires a live Redis; skipped when REDIS_URL is unset
    async fn store() -> Option<RedisCacheStore> {
        let url = std::env::var("REDIS_URL").ok()?;
        RedisCacheStore::connect(&url).await.ok()
    }

    #[tokio::test]
    #[ignore]
    async fn test_redis_round_trip_and_expiry() {
        let Some(store) = store().await else {
            return;
        };

        store.ping().await.unwrap();

        store
            .set("price-tracker:test", "{}".to_string(), Duration::from_millis(200))
            .await
            .unwrap();
        assert_eq!(
            store.get("price-tracker:test").await.unwrap(),
            Some("{}".to_string())
        );

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(store.get("price-tracker:test").await.unwrap(), None);

        store
            .set("price-tracker:test", "1".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        store.delete("price-tracker:test").await.unwrap();
        assert_eq!(store.get("price-tracker:test").await.unwrap(), None);
        assert_eq!(store.purge_expired().await.unwrap(), 0);
    }
}
