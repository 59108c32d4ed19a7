use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BucketConfigError {
    #[error("bucket capacity must be greater than zero, got {0}")]
    Capacity(f64),
    #[error("refill rate must be greater than zero, got {0}")]
    RefillRate(f64),
}

/// 单次消费的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Consumption {
    pub allowed: bool,
    pub remaining: u32,
}

/// 令牌桶：在调用时按经过的时间惰性补充令牌，没有后台定时器
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: f64,
    refill_rate: f64,
    tokens: f64,
    last_refill: DateTime<Utc>,
}

impl TokenBucket {
    /// 创建一个满额的桶
    pub fn new(capacity: f64, refill_rate: f64, now: DateTime<Utc>) -> Result<Self, BucketConfigError> {
        if !(capacity.is_finite() && capacity > 0.0) {
            return Err(BucketConfigError::Capacity(capacity));
        }
        if !(refill_rate.is_finite() && refill_rate > 0.0) {
            return Err(BucketConfigError::RefillRate(refill_rate));
        }
        Ok(Self {
            capacity,
            refill_rate,
            tokens: capacity,
            last_refill: now,
        })
    }

    /// 参数相同、从 `now` 开始计时的满额桶
    pub fn full_at(&self, now: DateTime<Utc>) -> Self {
        Self {
            tokens: self.capacity,
            last_refill: now,
            ..self.clone()
        }
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    /// 补充之后 `now` 时刻可用的令牌数
    pub fn available(&mut self, now: DateTime<Utc>) -> f64 {
        self.refill(now);
        self.tokens
    }

    pub fn try_consume(&mut self, now: DateTime<Utc>) -> Consumption {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Consumption {
                allowed: true,
                remaining: self.tokens.floor() as u32,
            }
        } else {
            Consumption {
                allowed: false,
                remaining: 0,
            }
        }
    }

    /// 距离下一个令牌到账的整秒数，至少为 1
    pub fn retry_after_secs(&mut self, now: DateTime<Utc>) -> u64 {
        self.refill(now);
        let deficit = (1.0 - self.tokens).max(0.0);
        ((deficit / self.refill_rate).ceil() as u64).max(1)
    }

    fn refill(&mut self, now: DateTime<Utc>) {
        // 时钟回拨时不补充，也不把 last_refill 往回拨
        if now <= self.last_refill {
            return;
        }
        let elapsed = (now - self.last_refill)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }
}

/// `now` 之后下一个整秒的 unix 时间戳
pub fn next_second_boundary(now: DateTime<Utc>) -> i64 {
    now.timestamp() + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert_eq!(
            TokenBucket::new(0.0, 1.0, t0()).unwrap_err(),
            BucketConfigError::Capacity(0.0)
        );
        assert_eq!(
            TokenBucket::new(5.0, -1.0, t0()).unwrap_err(),
            BucketConfigError::RefillRate(-1.0)
        );
        assert!(TokenBucket::new(5.0, f64::NAN, t0()).is_err());
    }

    #[test]
    fn allows_exactly_burst_then_rejects() {
        let mut bucket = TokenBucket::new(10.0, 60.0, t0()).unwrap();
        let remaining: Vec<u32> = (0..10)
            .map(|_| {
                let c = bucket.try_consume(t0());
                assert!(c.allowed);
                c.remaining
            })
            .collect();
        assert_eq!(remaining, vec![9, 8, 7, 6, 5, 4, 3, 2, 1, 0]);

        let denied = bucket.try_consume(t0());
        assert_eq!(
            denied,
            Consumption {
                allowed: false,
                remaining: 0
            }
        );
        assert_eq!(bucket.retry_after_secs(t0()), 1);
    }

    #[test]
    fn one_token_per_interval() {
        let mut bucket = TokenBucket::new(2.0, 4.0, t0()).unwrap();
        assert!(bucket.try_consume(t0()).allowed);
        assert!(bucket.try_consume(t0()).allowed);
        assert!(!bucket.try_consume(t0()).allowed);

        let later = t0() + Duration::milliseconds(250);
        assert!(bucket.try_consume(later).allowed);
        assert!(!bucket.try_consume(later).allowed);
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut bucket = TokenBucket::new(3.0, 100.0, t0()).unwrap();
        bucket.try_consume(t0());
        let much_later = t0() + Duration::days(30);
        assert_eq!(bucket.available(much_later), 3.0);
    }

    #[test]
    fn clock_going_backwards_does_not_refill() {
        let mut bucket = TokenBucket::new(3.0, 1.0, t0()).unwrap();
        for _ in 0..3 {
            bucket.try_consume(t0());
        }
        let earlier = t0() - Duration::hours(1);
        assert!(!bucket.try_consume(earlier).allowed);
        assert!(bucket.available(earlier) <= 3.0);
        // 回拨之后，从原来的基准时间继续补充
        assert!(bucket.try_consume(t0() + Duration::seconds(1)).allowed);
    }

    #[test]
    fn retry_after_scales_with_slow_rates() {
        let mut bucket = TokenBucket::new(1.0, 0.25, t0()).unwrap();
        assert!(bucket.try_consume(t0()).allowed);
        assert_eq!(bucket.retry_after_secs(t0()), 4);
    }

    #[test]
    fn reset_is_next_whole_second() {
        let now = t0() + Duration::milliseconds(400);
        assert_eq!(next_second_boundary(now), t0().timestamp() + 1);
    }
}
