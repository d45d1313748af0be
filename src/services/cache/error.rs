// 缓存模块错误类型定义
//
// 缓存后端失败只会降低命中率，不会让用户请求失败

use thiserror::Error;

/// 缓存存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("连接错误: {0}")]
    Connection(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("配置错误: {0}")]
    Config(String),
}

// 实现从 redis::RedisError 到 StoreError 的转换
impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Connection(err.to_string())
    }
}
