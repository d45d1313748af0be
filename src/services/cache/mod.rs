// 缓存模块 - 提取结果的两级缓存
//
// 本模块提供：
// - 缓存键生成（URL 规范化 + SHA-256）
// - Redis 快速后端
// - 文件后端（Redis 不可用时使用）
// - 启动时的后端选择与读穿透 / 写穿透缓存

pub mod error;
pub mod file_store;
pub mod key;
pub mod manager;
pub mod redis_store;
pub mod store;

pub use error::StoreError;
pub use file_store::{CacheCleanupTask, FileCacheStore};
pub use key::{normalize_url, CacheKey};
pub use manager::{describe_ttl, CacheManager, CacheSettings};
pub use redis_store::RedisCacheStore;
pub use store::{CacheEntry, CacheStore};
