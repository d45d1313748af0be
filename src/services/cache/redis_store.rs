// Redis 缓存后端
//
// 使用 ConnectionManager（可克隆、并发安全、断线自动重连），
// 条目以 JSON 存储，过期由 Redis 的 `SET ... EX` 负责。

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

use super::error::StoreError;
use super::key::CacheKey;
use super::store::{CacheEntry, CacheStore};
use crate::models::{CacheBackend, ExtractionResult};

/// Redis 缓存
#[derive(Clone)]
pub struct RedisCacheStore {
    connection: ConnectionManager,
    /// 存活探测超时
    probe_timeout: Duration,
}

impl RedisCacheStore {
    /// 连接 Redis
    ///
    /// # 参数
    /// - `redis_url`: 连接字符串（`redis://` 或 `rediss://`）
    /// - `probe_timeout`: 建立连接与 PING 的超时时间
    ///
    /// # 返回
    /// - `Err(StoreError::Config)`: 连接字符串无效
    /// - `Err(StoreError::Connection)`: 超时内无法连接
    pub async fn connect(redis_url: &str, probe_timeout: Duration) -> Result<Self, StoreError> {
        if !Self::is_supported_url(redis_url) {
            return Err(StoreError::Config(format!(
                "不支持的 Redis 连接字符串: {}",
                redis_url
            )));
        }

        let client = redis::Client::open(redis_url)
            .map_err(|e| StoreError::Config(format!("Redis 连接字符串无效: {}", e)))?;

        let connection = timeout(probe_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::Connection("连接 Redis 超时".to_string()))??;

        info!("Redis 连接成功");

        Ok(Self {
            connection,
            probe_timeout,
        })
    }

    /// 是否为可用的 Redis 连接字符串
    pub fn is_supported_url(redis_url: &str) -> bool {
        redis_url.starts_with("redis://") || redis_url.starts_with("rediss://")
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    fn backend(&self) -> CacheBackend {
        CacheBackend::Fast
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key.as_str()).await?;

        match value {
            Some(json) => {
                let entry: CacheEntry = serde_json::from_str(&json)?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &CacheKey,
        value: &ExtractionResult,
        ttl_seconds: u64,
    ) -> Result<(), StoreError> {
        let entry = CacheEntry::new(key, value.clone(), ttl_seconds);
        let json = serde_json::to_string(&entry)?;

        let mut conn = self.connection.clone();
        let _: () = redis::cmd("SET")
            .arg(key.as_str())
            .arg(json)
            .arg("EX")
            .arg(ttl_seconds.max(1))
            .query_async(&mut conn)
            .await?;

        debug!("Redis 缓存已写入: {} (ttl {}s)", key, ttl_seconds);
        Ok(())
    }

    async fn is_available(&self) -> bool {
        let mut conn = self.connection.clone();
        let ping = async {
            let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
            pong
        };

        matches!(timeout(self.probe_timeout, ping).await, Ok(Ok(_)))
    }
}
