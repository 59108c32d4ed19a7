/// 缓存数据模型

pub mod response;

pub use response::CacheEntry;
