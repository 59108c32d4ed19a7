/// 缓存存储操作

pub mod leaderboard;
pub mod memory;
pub mod response;

pub use leaderboard::{LeaderboardStore, MemoryLeaderboardStore, RedisLeaderboardStore};
pub use memory::MemoryCacheStore;
pub use response::{CacheError, CacheStore, RedisCacheStore};
