// 文件缓存后端
//
// 每个缓存键对应缓存目录下的一个 JSON 文件，内容为完整的 CacheEntry（含过期时间）。
// 过期在读取时惰性检查，过期或损坏的文件视为未命中并删除。
// 写入先写临时文件再重命名，同一个键的并发写入以最后一次为准。

use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

use super::error::StoreError;
use super::key::CacheKey;
use super::store::{CacheEntry, CacheStore};
use crate::models::{CacheBackend, ExtractionResult};

/// 文件缓存
pub struct FileCacheStore {
    /// 缓存目录
    cache_dir: PathBuf,
}

impl FileCacheStore {
    /// 临时文件后缀
    const TEMP_SUFFIX: &'static str = ".tmp";

    /// 创建文件缓存，目录不存在时自动创建
    ///
    /// # 参数
    /// - `cache_dir`: 缓存目录路径
    ///
    /// # 返回
    /// - `Err(StoreError::Io)`: 无法创建目录
    pub async fn new(cache_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir).await?;

        info!("文件缓存目录: {}", cache_dir.display());

        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// 缓存键对应的文件路径
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(key.file_name())
    }

    /// 删除文件，文件不存在不算错误
    async fn remove_quietly(path: &Path) -> Result<(), StoreError> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// 清理所有过期或损坏的缓存文件
    ///
    /// # 返回
    /// 删除的文件数量
    pub async fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = Utc::now();
        let mut removed = 0;
        let mut dir = fs::read_dir(&self.cache_dir).await?;

        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let stale = match fs::read(&path).await {
                Ok(bytes) => match serde_json::from_slice::<CacheEntry>(&bytes) {
                    Ok(entry) => entry.is_expired_at(now),
                    Err(_) => true,
                },
                // 其他请求可能已经删除了它
                Err(e) if e.kind() == ErrorKind::NotFound => false,
                Err(e) => return Err(e.into()),
            };

            if stale {
                Self::remove_quietly(&path).await?;
                removed += 1;
            }
        }

        if removed > 0 {
            debug!("清理过期缓存文件 {} 个", removed);
        }

        Ok(removed)
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    fn backend(&self) -> CacheBackend {
        CacheBackend::Fallback
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        let path = self.entry_path(key);

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry = match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("缓存文件损坏，删除: {:?} - {}", path, e);
                Self::remove_quietly(&path).await?;
                return Ok(None);
            }
        };

        if entry.is_expired() {
            debug!("缓存已过期: {}", key);
            Self::remove_quietly(&path).await?;
            return Ok(None);
        }

        Ok(Some(entry))
    }

    async fn set(
        &self,
        key: &CacheKey,
        value: &ExtractionResult,
        ttl_seconds: u64,
    ) -> Result<(), StoreError> {
        let entry = CacheEntry::new(key, value.clone(), ttl_seconds);
        let json = serde_json::to_vec_pretty(&entry)?;

        let path = self.entry_path(key);
        let temp_path = self.cache_dir.join(format!(
            "{}{}",
            uuid::Uuid::new_v4(),
            Self::TEMP_SUFFIX
        ));

        fs::write(&temp_path, json).await?;
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!("缓存已写入: {:?}", path);
        Ok(())
    }

    async fn is_available(&self) -> bool {
        fs::metadata(&self.cache_dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }
}

/// 文件缓存清理任务
pub struct CacheCleanupTask {
    store: Arc<FileCacheStore>,
    interval: Duration,
}

impl CacheCleanupTask {
    pub fn new(store: Arc<FileCacheStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// 启动定期清理任务
    pub async fn start(self) {
        let mut interval = tokio::time::interval(self.interval);

        loop {
            interval.tick().await;
            match self.store.purge_expired().await {
                Ok(removed) => {
                    tracing::debug!("Cache cleanup completed. Removed: {}", removed)
                }
                Err(e) => tracing::warn!("Cache cleanup failed: {}", e),
            }
        }
    }
}
