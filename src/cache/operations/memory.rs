use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use super::response::{CacheError, CacheStore};
use crate::cache::models::CacheEntry;

/// 超出 `Instant` 表示范围的 TTL 按这个上限处理
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// 进程内缓存，读取时惰性过期，写入时顺带清除所有已过期条目。用于测试和没有 Redis 的本地开发
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: DashMap<String, (Instant, Vec<u8>)>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 条目数量，包含尚未清除的过期条目
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `now + ttl`，溢出时取一个足够远的时间点
pub(super) fn deadline_after(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let bytes = match self.entries.get(key) {
            Some(entry) if entry.0 > Instant::now() => entry.1.clone(),
            Some(entry) => {
                drop(entry);
                self.entries.remove(key);
                return Ok(None);
            }
            None => return Ok(None),
        };
        Ok(Some(CacheEntry::from_bytes(&bytes)?))
    }

    async fn set(&self, key: &str, entry: &CacheEntry, ttl: Duration) -> Result<(), CacheError> {
        let bytes = entry.to_bytes()?;
        let now = Instant::now();
        let expires_at = deadline_after(now, ttl);
        self.entries.retain(|_, (deadline, _)| *deadline > now);
        self.entries.insert(key.to_string(), (expires_at, bytes));
        Ok(())
    }
}
