use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::identity::ClientKey;
use super::token_bucket::{BucketConfigError, Consumption, TokenBucket, next_second_boundary};

/// 单个访客：令牌桶加上最后访问时间
#[derive(Debug)]
pub struct Visitor {
    bucket: Mutex<TokenBucket>,
    last_seen_ms: AtomicI64,
}

impl Visitor {
    fn new(bucket: TokenBucket, now: DateTime<Utc>) -> Self {
        Self {
            bucket: Mutex::new(bucket),
            last_seen_ms: AtomicI64::new(now.timestamp_millis()),
        }
    }

    fn touch(&self, now: DateTime<Utc>) {
        self.last_seen_ms
            .fetch_max(now.timestamp_millis(), Ordering::Relaxed);
    }

    pub fn last_seen_ms(&self) -> i64 {
        self.last_seen_ms.load(Ordering::Relaxed)
    }

    /// 同一访客的消费通过桶锁串行化
    pub fn try_consume(&self, now: DateTime<Utc>) -> Consumption {
        self.with_bucket(|bucket| bucket.try_consume(now))
    }

    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        self.with_bucket(|bucket| bucket.retry_after_secs(now))
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> u32 {
        self.with_bucket(|bucket| bucket.available(now).floor() as u32)
    }

    fn with_bucket<T>(&self, f: impl FnOnce(&mut TokenBucket) -> T) -> T {
        let mut guard = self
            .bucket
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

/// 查找访客的结果，表满时 `visitor` 为 `None`
#[derive(Debug, Clone)]
pub struct Admission {
    pub visitor: Option<Arc<Visitor>>,
    pub remaining: u32,
    pub reset_at: i64,
}

/// 访客表：并发安全的 ClientKey -> Visitor 映射，带容量上限和空闲清理
#[derive(Debug)]
pub struct VisitorRegistry {
    visitors: DashMap<ClientKey, Arc<Visitor>>,
    live: AtomicUsize,
    template: TokenBucket,
    max_visitors: usize,
}

impl VisitorRegistry {
    pub fn new(
        refill_rate: f64,
        burst: u32,
        max_visitors: usize,
    ) -> Result<Self, BucketConfigError> {
        let template = TokenBucket::new(f64::from(burst), refill_rate, Utc::now())?;
        Ok(Self {
            visitors: DashMap::new(),
            live: AtomicUsize::new(0),
            template,
            max_visitors,
        })
    }

    pub fn admit(&self, key: &ClientKey, now: DateTime<Utc>) -> Admission {
        let reset_at = next_second_boundary(now);

        // 持有分片读锁时更新访问时间：sweep 要么看到新时间，要么已经删掉该记录
        let existing = self.visitors.get(key).map(|v| {
            v.touch(now);
            Arc::clone(v.value())
        });
        if let Some(existing) = existing {
            let remaining = existing.remaining(now);
            return Admission {
                visitor: Some(existing),
                remaining,
                reset_at,
            };
        }

        let fresh = Arc::new(Visitor::new(self.template.full_at(now), now));

        // entry() 持有分片写锁，插入判断是原子的
        match self.visitors.entry(key.clone()) {
            Entry::Occupied(entry) => {
                entry.get().touch(now);
                let winner = Arc::clone(entry.get());
                drop(entry);
                let remaining = winner.remaining(now);
                Admission {
                    visitor: Some(winner),
                    remaining,
                    reset_at,
                }
            }
            Entry::Vacant(entry) => {
                let previous = self.live.fetch_add(1, Ordering::AcqRel);
                if self.max_visitors > 0 && previous >= self.max_visitors {
                    self.live.fetch_sub(1, Ordering::AcqRel);
                    return Admission {
                        visitor: None,
                        remaining: 0,
                        reset_at,
                    };
                }
                entry.insert(Arc::clone(&fresh));
                Admission {
                    visitor: Some(fresh),
                    remaining: self.template.capacity() as u32,
                    reset_at,
                }
            }
        }
    }

    /// 删除空闲超过 `idle` 的访客，返回删除数量
    pub fn sweep(&self, now: DateTime<Utc>, idle: Duration) -> usize {
        let idle_ms = i64::try_from(idle.as_millis()).unwrap_or(i64::MAX);
        let cutoff = now.timestamp_millis().saturating_sub(idle_ms);
        let mut removed = 0;
        // 在分片锁内递减计数，避免清理期间计数高于实际数量
        self.visitors.retain(|_, visitor| {
            let keep = visitor.last_seen_ms() >= cutoff;
            if !keep {
                self.live.fetch_sub(1, Ordering::AcqRel);
                removed += 1;
            }
            keep
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &ClientKey) -> bool {
        self.visitors.contains_key(key)
    }

    /// 配置的补充速率，作为限流值对外报告
    pub fn limit(&self) -> f64 {
        self.template.refill_rate()
    }
}
