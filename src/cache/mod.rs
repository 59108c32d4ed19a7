// 缓存模块
// 响应缓存和排行榜的键、数据结构和存储操作

pub mod keys;
pub mod models;
pub mod operations;

pub use models::CacheEntry;
pub use operations::{
    CacheError, CacheStore, LeaderboardStore, MemoryCacheStore, MemoryLeaderboardStore,
    RedisCacheStore, RedisLeaderboardStore,
};
