use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient};

use crate::cache::models::CacheEntry;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("cache entry serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("cache store did not answer within {0:?}")]
    Timeout(Duration),
}

/// 外部键值存储的抽象，过期由存储端负责
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    async fn set(&self, key: &str, entry: &CacheEntry, ttl: Duration) -> Result<(), CacheError>;
}

/// Redis 实现。建连和命令合计受 `timeout` 限制，超时按存储不可用处理
#[derive(Clone)]
pub struct RedisCacheStore {
    redis: Arc<RedisClient>,
    timeout: Duration,
}

impl RedisCacheStore {
    pub fn new(redis: Arc<RedisClient>, timeout: Duration) -> Self {
        Self { redis, timeout }
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, op).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(CacheError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let result: Option<Vec<u8>> = self
            .bounded(async {
                let mut conn = self.redis.get_multiplexed_async_connection().await?;
                conn.get::<_, Option<Vec<u8>>>(key).await
            })
            .await?;
        match result {
            Some(bytes) => Ok(Some(CacheEntry::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, entry: &CacheEntry, ttl: Duration) -> Result<(), CacheError> {
        let bytes = entry.to_bytes()?;
        self.bounded(async {
            let mut conn = self.redis.get_multiplexed_async_connection().await?;
            conn.set_ex::<_, _, ()>(key, bytes, ttl.as_secs()).await
        })
        .await
    }
}
