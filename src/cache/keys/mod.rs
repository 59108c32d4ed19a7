/// 缓存键模块

pub mod response_keys;
pub mod score_keys;

pub use response_keys::{RESPONSE_CACHE_PREFIX, response_cache_key};
pub use score_keys::{LEADERBOARD_KEY, idempotency_key};
