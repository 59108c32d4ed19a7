use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use redis::{AsyncCommands, Client as RedisClient, RedisResult, aio::MultiplexedConnection};
use tokio::time::Instant;

use super::memory::deadline_after;
use crate::cache::keys::{LEADERBOARD_KEY, idempotency_key};

/// 排行榜数据的存取。名次从 0 开始，按分数降序，同分按玩家名降序
#[async_trait]
pub trait LeaderboardStore: Send + Sync {
    /// 占用幂等键，键已存在且未过期时返回 false
    async fn claim_idempotency_key(&self, key: &str, ttl: Duration) -> RedisResult<bool>;

    /// 累加分数并返回新的总分
    async fn increment(&self, player: &str, delta: i64) -> RedisResult<f64>;

    async fn score(&self, player: &str) -> RedisResult<Option<f64>>;

    async fn rank(&self, player: &str) -> RedisResult<Option<usize>>;

    /// 闭区间 `[start, stop]` 内的玩家和分数
    async fn range(&self, start: usize, stop: usize) -> RedisResult<Vec<(String, f64)>>;

    async fn count(&self) -> RedisResult<u64>;
}

/// 基于 Redis 有序集合的实现
#[derive(Clone)]
pub struct RedisLeaderboardStore {
    redis: Arc<RedisClient>,
}

impl RedisLeaderboardStore {
    pub fn new(redis: Arc<RedisClient>) -> Self {
        Self { redis }
    }

    async fn conn(&self) -> RedisResult<MultiplexedConnection> {
        self.redis.get_multiplexed_async_connection().await
    }
}

#[async_trait]
impl LeaderboardStore for RedisLeaderboardStore {
    async fn claim_idempotency_key(&self, key: &str, ttl: Duration) -> RedisResult<bool> {
        let mut conn = self.conn().await?;
        // SET NX EX：第一次提交占住键
        let created: Option<String> = redis::cmd("SET")
            .arg(idempotency_key(key))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(created.is_some())
    }

    async fn increment(&self, player: &str, delta: i64) -> RedisResult<f64> {
        let mut conn = self.conn().await?;
        conn.zincr(LEADERBOARD_KEY, player, delta).await
    }

    async fn score(&self, player: &str) -> RedisResult<Option<f64>> {
        let mut conn = self.conn().await?;
        conn.zscore(LEADERBOARD_KEY, player).await
    }

    async fn rank(&self, player: &str) -> RedisResult<Option<usize>> {
        let mut conn = self.conn().await?;
        conn.zrevrank(LEADERBOARD_KEY, player).await
    }

    async fn range(&self, start: usize, stop: usize) -> RedisResult<Vec<(String, f64)>> {
        let mut conn = self.conn().await?;
        conn.zrevrange_withscores(
            LEADERBOARD_KEY,
            isize::try_from(start).unwrap_or(isize::MAX),
            isize::try_from(stop).unwrap_or(isize::MAX),
        )
        .await
    }

    async fn count(&self) -> RedisResult<u64> {
        let mut conn = self.conn().await?;
        conn.zcard(LEADERBOARD_KEY).await
    }
}

/// 进程内实现，排序规则与 ZREVRANGE 一致。用于测试和没有 Redis 的本地开发
#[derive(Debug, Default)]
pub struct MemoryLeaderboardStore {
    scores: DashMap<String, f64>,
    claims: DashMap<String, Instant>,
}

impl MemoryLeaderboardStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ranked(&self) -> Vec<(String, f64)> {
        let mut rows: Vec<(String, f64)> = self
            .scores
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        rows.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.0.cmp(&a.0))
        });
        rows
    }
}

#[async_trait]
impl LeaderboardStore for MemoryLeaderboardStore {
    async fn claim_idempotency_key(&self, key: &str, ttl: Duration) -> RedisResult<bool> {
        let now = Instant::now();
        let expires_at = deadline_after(now, ttl);
        match self.claims.entry(key.to_string()) {
            Entry::Occupied(entry) if *entry.get() > now => Ok(false),
            Entry::Occupied(mut entry) => {
                entry.insert(expires_at);
                Ok(true)
            }
            Entry::Vacant(entry) => {
                entry.insert(expires_at);
                Ok(true)
            }
        }
    }

    async fn increment(&self, player: &str, delta: i64) -> RedisResult<f64> {
        let mut score = self.scores.entry(player.to_string()).or_insert(0.0);
        *score += delta as f64;
        Ok(*score)
    }

    async fn score(&self, player: &str) -> RedisResult<Option<f64>> {
        Ok(self.scores.get(player).map(|score| *score))
    }

    async fn rank(&self, player: &str) -> RedisResult<Option<usize>> {
        Ok(self.ranked().iter().position(|(name, _)| name == player))
    }

    async fn range(&self, start: usize, stop: usize) -> RedisResult<Vec<(String, f64)>> {
        if stop < start {
            return Ok(Vec::new());
        }
        Ok(self
            .ranked()
            .into_iter()
            .skip(start)
            .take(stop - start + 1)
            .collect())
    }

    async fn count(&self) -> RedisResult<u64> {
        Ok(self.scores.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ranks_by_score_then_name_descending() {
        let store = MemoryLeaderboardStore::new();
        store.increment("alice", 10).await.unwrap();
        store.increment("bob", 30).await.unwrap();
        store.increment("carol", 10).await.unwrap();
        assert_eq!(store.increment("alice", 5).await.unwrap(), 15.0);

        assert_eq!(store.rank("bob").await.unwrap(), Some(0));
        assert_eq!(store.rank("alice").await.unwrap(), Some(1));
        assert_eq!(store.rank("carol").await.unwrap(), Some(2));
        assert_eq!(store.rank("dave").await.unwrap(), None);

        let rows = store.range(1, 9).await.unwrap();
        assert_eq!(
            rows,
            vec![("alice".to_string(), 15.0), ("carol".to_string(), 10.0)]
        );
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn idempotency_claim_expires() {
        let store = MemoryLeaderboardStore::new();
        let ttl = Duration::from_secs(120);
        assert!(store.claim_idempotency_key("k1", ttl).await.unwrap());
        assert!(!store.claim_idempotency_key("k1", ttl).await.unwrap());
        assert!(store.claim_idempotency_key("k2", ttl).await.unwrap());

        tokio::time::advance(Duration::from_secs(121)).await;
        assert!(store.claim_idempotency_key("k1", ttl).await.unwrap());
    }
}
