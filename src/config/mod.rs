use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("invalid rate limit settings: {0}")]
    RateLimit(String),
}

/// 令牌桶限流配置
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_second: f64,
    pub burst: u32,
    pub cleanup_interval_secs: u64,
    pub idle_timeout_secs: u64,
    /// 0 表示不限制
    pub max_visitors: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10.0,
            burst: 20,
            cleanup_interval_secs: 60,
            idle_timeout_secs: 180,
            max_visitors: 0,
        }
    }
}

impl RateLimitConfig {
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// 响应缓存配置
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub default_ttl_secs: u64,
    pub bypass_header: Option<String>,
    pub honor_response_ttl: bool,
    /// 单次缓存读写的超时，超时按未命中处理
    pub store_timeout_ms: u64,
}

pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
/// 响应头 max-age 的上限：一年
pub const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            bypass_header: Some("X-Skip-Cache".to_string()),
            honor_response_ttl: true,
            store_timeout_ms: 200,
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        if self.default_ttl_secs == 0 {
            Duration::from_secs(DEFAULT_CACHE_TTL_SECS)
        } else {
            Duration::from_secs(self.default_ttl_secs)
        }
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms.max(1))
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub request_timeout_secs: u64,
    pub cors_allowed_origins: Vec<String>,
    pub idempotency_ttl_secs: u64,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源解析配置，缺失的键使用默认值
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let rate_defaults = RateLimitConfig::default();
        let cache_defaults = CacheConfig::default();

        let rate_limit = RateLimitConfig {
            requests_per_second: parse_or(
                &lookup,
                "RATE_LIMIT_RPS",
                rate_defaults.requests_per_second,
            )?,
            burst: parse_or(&lookup, "RATE_LIMIT_BURST", rate_defaults.burst)?,
            cleanup_interval_secs: parse_or(
                &lookup,
                "RATE_LIMIT_CLEANUP_SECS",
                rate_defaults.cleanup_interval_secs,
            )?,
            idle_timeout_secs: parse_or(
                &lookup,
                "RATE_LIMIT_IDLE_SECS",
                rate_defaults.idle_timeout_secs,
            )?,
            max_visitors: parse_or(
                &lookup,
                "RATE_LIMIT_MAX_VISITORS",
                rate_defaults.max_visitors,
            )?,
        };
        if !(rate_limit.requests_per_second.is_finite() && rate_limit.requests_per_second > 0.0) {
            return Err(ConfigError::RateLimit(
                "RATE_LIMIT_RPS must be greater than zero".into(),
            ));
        }
        if rate_limit.burst == 0 {
            return Err(ConfigError::RateLimit(
                "RATE_LIMIT_BURST must be greater than zero".into(),
            ));
        }

        let bypass_header = match lookup("CACHE_BYPASS_HEADER") {
            Some(name) if name.trim().is_empty() => None,
            Some(name) => Some(name.trim().to_string()),
            None => cache_defaults.bypass_header,
        };
        let cache = CacheConfig {
            default_ttl_secs: parse_or(
                &lookup,
                "CACHE_DEFAULT_TTL_SECS",
                cache_defaults.default_ttl_secs,
            )?,
            bypass_header,
            honor_response_ttl: parse_or(
                &lookup,
                "CACHE_HONOR_RESPONSE_TTL",
                cache_defaults.honor_response_ttl,
            )?,
            store_timeout_ms: parse_or(
                &lookup,
                "CACHE_STORE_TIMEOUT_MS",
                cache_defaults.store_timeout_ms,
            )?,
        };

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Config {
            redis_url: lookup("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379".into()),
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            server_port: parse_or(&lookup, "SERVER_PORT", 8080)?,
            request_timeout_secs: parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?,
            cors_allowed_origins,
            idempotency_ttl_secs: parse_or(&lookup, "IDEMPOTENCY_TTL_SECS", 120)?,
            rate_limit,
            cache,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn idempotency_ttl(&self) -> Duration {
        Duration::from_secs(self.idempotency_ttl_secs)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw })
        }
        _ => Ok(default),
    }
}
