mod cors;
mod error_handler;
pub mod identity;
mod rate_limit;
pub mod recorder;
mod response_cache;
mod timeout;
pub mod token_bucket;
pub mod visitor;

pub use cors::cors_layer;
pub use error_handler::log_errors;
pub use identity::{ClientKey, resolve_client_key};
pub use rate_limit::{
    Clock, RateLimitStatus, RateLimiter, X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING,
    X_RATELIMIT_RESET, rate_limit,
};
pub use recorder::RecordedResponse;
pub use response_cache::{ResponseCache, parse_max_age, response_cache};
pub use timeout::timeout_layer;
