// 缓存存储接口
//
// 快速后端与文件后端实现同一组能力：get / set / is_available

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::StoreError;
use super::key::CacheKey;
use crate::models::{CacheBackend, ExtractionResult};

/// 缓存条目
///
/// 只会被整体替换或过期，不会被修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: ExtractionResult,
    pub stored_at: DateTime<Utc>,
    pub ttl_seconds: u64,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: &CacheKey, value: ExtractionResult, ttl_seconds: u64) -> Self {
        let stored_at = Utc::now();
        let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
        let expires_at = Duration::try_seconds(ttl)
            .and_then(|d| stored_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            key: key.as_str().to_string(),
            value,
            stored_at,
            ttl_seconds,
            expires_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// 缓存存储接口
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// 后端类型
    fn backend(&self) -> CacheBackend;

    /// 读取缓存，未命中或已过期返回 `Ok(None)`
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError>;

    /// 写入缓存（覆盖已有条目）
    async fn set(
        &self,
        key: &CacheKey,
        value: &ExtractionResult,
        ttl_seconds: u64,
    ) -> Result<(), StoreError>;

    /// 轻量存活探测，只在启动选择后端时调用
    async fn is_available(&self) -> bool;
}
