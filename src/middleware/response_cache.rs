use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Method, Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::recorder::RecordedResponse;
use crate::{
    cache::{CacheStore, keys::response_cache_key},
    config::{CacheConfig, MAX_CACHE_TTL_SECS},
    error::AppError,
};

/// GET 响应缓存。不做并发未命中合并：同一个键的并发未命中会各自调用下游并各自写缓存
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    config: CacheConfig,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self { store, config }
    }

    fn is_cacheable(&self, req: &Request<Body>) -> bool {
        if req.method() != Method::GET {
            return false;
        }
        match self.config.bypass_header.as_deref() {
            Some(name) => req
                .headers()
                .get(name)
                .is_none_or(|value| value.as_bytes().is_empty()),
            None => true,
        }
    }

    fn ttl_for(&self, headers: &HeaderMap) -> Duration {
        if self.config.honor_response_ttl {
            let max_age = headers
                .get(header::CACHE_CONTROL)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_max_age);
            if let Some(secs) = max_age {
                return Duration::from_secs(secs.min(MAX_CACHE_TTL_SECS));
            }
        }
        self.config.default_ttl()
    }

    pub async fn handle(self: Arc<Self>, req: Request<Body>, next: Next) -> Result<Response, AppError> {
        if !self.is_cacheable(&req) {
            return Ok(next.run(req).await);
        }

        let key = response_cache_key(&req);
        match self.store.get(&key).await {
            Ok(Some(entry)) => match RecordedResponse::from_entry(entry) {
                Some(cached) => {
                    tracing::debug!(key = %key, path = %req.uri().path(), "cache hit");
                    return Ok(cached.into_response());
                }
                None => tracing::warn!(key = %key, "discarding malformed cache entry"),
            },
            Ok(None) => tracing::debug!(key = %key, path = %req.uri().path(), "cache miss"),
            // 缓存不可用时直接放行
            Err(e) => tracing::warn!(key = %key, "cache lookup failed, serving uncached: {}", e),
        }

        let response = next.run(req).await;
        let mut recorded = RecordedResponse::capture(response).await.map_err(|e| {
            tracing::error!("Failed to read downstream response body: {}", e);
            AppError::InternalServerError
        })?;

        if recorded.status.is_success() {
            let ttl = self.ttl_for(&recorded.headers);
            if !recorded.headers.contains_key(header::CACHE_CONTROL) {
                if let Ok(value) =
                    HeaderValue::from_str(&format!("public, max-age={}", ttl.as_secs()))
                {
                    recorded.headers.insert(header::CACHE_CONTROL, value);
                }
            }

            if ttl.as_secs() > 0 {
                let store = Arc::clone(&self.store);
                let entry = recorded.to_entry();
                tokio::spawn(async move {
                    if let Err(e) = store.set(&key, &entry, ttl).await {
                        tracing::warn!(key = %key, "failed to store cached response: {}", e);
                    }
                });
            }
        }

        Ok(recorded.into_response())
    }
}

pub async fn response_cache(
    State(cache): State<Arc<ResponseCache>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    cache.handle(req, next).await
}

/// 解析 Cache-Control 中的 `max-age=N`
pub fn parse_max_age(cache_control: &str) -> Option<u64> {
    cache_control.split(',').find_map(|directive| {
        let directive = directive.trim();
        let (name, value) = directive.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("max-age") {
            value.trim().trim_matches('"').parse().ok()
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;

    fn cache(honor_response_ttl: bool) -> ResponseCache {
        ResponseCache::new(
            Arc::new(MemoryCacheStore::new()),
            CacheConfig {
                default_ttl_secs: 60,
                honor_response_ttl,
                ..CacheConfig::default()
            },
        )
    }

    fn cache_control(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn ttl_follows_max_age_within_bounds() {
        let cache = cache(true);
        assert_eq!(cache.ttl_for(&HeaderMap::new()), Duration::from_secs(60));
        assert_eq!(
            cache.ttl_for(&cache_control("max-age=5")),
            Duration::from_secs(5)
        );
        assert_eq!(
            cache.ttl_for(&cache_control(&format!("max-age={}", u64::MAX))),
            Duration::from_secs(MAX_CACHE_TTL_SECS)
        );
        assert_eq!(
            self::cache(false).ttl_for(&cache_control("max-age=5")),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn parses_max_age_directive() {
        assert_eq!(parse_max_age("public, max-age=60"), Some(60));
        assert_eq!(parse_max_age("MAX-AGE=\"30\", private"), Some(30));
        assert_eq!(parse_max_age("s-maxage=10, max-age=5"), Some(5));
        assert_eq!(parse_max_age("no-cache"), None);
        assert_eq!(parse_max_age("max-age=soon"), None);
        assert_eq!(parse_max_age("max-age=-1"), None);
    }
}
