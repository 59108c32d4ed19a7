use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

use super::identity::{ClientKey, resolve_client_key};
use super::token_bucket::BucketConfigError;
use super::visitor::VisitorRegistry;
use crate::{config::RateLimitConfig, error::AppError};

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// 放行请求时附带的限流信息
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitStatus {
    pub limit: f64,
    pub remaining: u32,
    pub reset_at: i64,
}

impl RateLimitStatus {
    fn apply(&self, headers: &mut HeaderMap) {
        for (name, value) in [
            (X_RATELIMIT_LIMIT, self.limit.to_string()),
            (X_RATELIMIT_REMAINING, self.remaining.to_string()),
            (X_RATELIMIT_RESET, self.reset_at.to_string()),
        ] {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(HeaderName::from_static(name), value);
            }
        }
    }
}

pub struct RateLimiter {
    registry: VisitorRegistry,
    config: RateLimitConfig,
    clock: Clock,
    shutdown: watch::Sender<bool>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Result<Self, BucketConfigError> {
        Self::with_clock(config, Arc::new(Utc::now))
    }

    pub fn with_clock(config: RateLimitConfig, clock: Clock) -> Result<Self, BucketConfigError> {
        let registry = VisitorRegistry::new(
            config.requests_per_second,
            config.burst,
            config.max_visitors,
        )?;
        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            registry,
            config,
            clock,
            shutdown,
        })
    }

    pub fn registry(&self) -> &VisitorRegistry {
        &self.registry
    }

    /// 判断某个调用方在 `now` 时刻能否通过
    pub fn check(&self, key: &ClientKey, now: DateTime<Utc>) -> Result<RateLimitStatus, AppError> {
        let admission = self.registry.admit(key, now);
        let Some(visitor) = admission.visitor else {
            return Err(AppError::CapacityExceeded);
        };

        let consumption = visitor.try_consume(now);
        if !consumption.allowed {
            return Err(AppError::RateLimited {
                limit: self.registry.limit(),
                retry_after: visitor.retry_after_secs(now),
                reset_at: admission.reset_at,
            });
        }

        Ok(RateLimitStatus {
            limit: self.registry.limit(),
            remaining: consumption.remaining,
            reset_at: admission.reset_at,
        })
    }

    pub async fn check_rate_limit(
        self: Arc<Self>,
        req: Request<Body>,
        next: Next,
    ) -> Result<Response, AppError> {
        let Some(key) = resolve_client_key(&req) else {
            tracing::warn!(method = %req.method(), path = %req.uri().path(), "unable to identify client ip");
            return Err(AppError::IdentityUnresolvable);
        };

        let now = (self.clock)();
        let status = match self.check(&key, now) {
            Ok(status) => status,
            Err(err) => {
                match &err {
                    AppError::CapacityExceeded => {
                        tracing::warn!(ip = %key, "deny 503: too many tracked visitors");
                    }
                    AppError::RateLimited {
                        retry_after,
                        reset_at,
                        ..
                    } => {
                        tracing::warn!(
                            ip = %key,
                            method = %req.method(),
                            path = %req.uri().path(),
                            reset = reset_at,
                            retry_after = retry_after,
                            "deny 429: rate limited"
                        );
                    }
                    _ => {}
                }
                return Err(err);
            }
        };

        tracing::debug!(
            ip = %key,
            method = %req.method(),
            path = %req.uri().path(),
            remaining = status.remaining,
            "request admitted"
        );

        let mut response = next.run(req).await;
        status.apply(response.headers_mut());
        Ok(response)
    }

    /// 启动后台清理任务，按固定间隔移除空闲访客，直到调用 [`RateLimiter::stop`]
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(limiter.config.cleanup_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                if *shutdown.borrow() {
                    break;
                }
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = limiter
                            .registry
                            .sweep((limiter.clock)(), limiter.config.idle_timeout());
                        if removed > 0 {
                            tracing::debug!(removed, live = limiter.registry.len(), "evicted idle visitors");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("visitor sweeper stopped");
        })
    }

    /// 可以重复调用
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    limiter.check_rate_limit(req, next).await
}
