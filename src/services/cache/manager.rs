// 缓存管理器
//
// 负责：
// - 启动时选择缓存后端（优先 Redis，不可用时使用文件缓存），之后不再切换
// - 根据目标 URL 生成缓存键
// - 围绕 抓取 + 提取 流程做读穿透 / 写穿透缓存
//
// 同一 URL 的并发请求在首次写入前可能重复计算，这是可接受的限制。

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::error::StoreError;
use super::file_store::FileCacheStore;
use super::key::CacheKey;
use super::redis_store::RedisCacheStore;
use super::store::CacheStore;
use crate::models::{CacheBackend, ExtractionResult, Provenance, TargetUrl};

/// 缓存设置
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Redis 连接字符串，为空时直接使用文件缓存
    pub redis_url: Option<String>,
    /// 缓存有效期（秒）
    pub ttl_seconds: u64,
    /// 缓存键前缀
    pub key_prefix: String,
    /// 文件缓存目录
    pub cache_dir: PathBuf,
    /// Redis 连接与探测超时
    pub probe_timeout: Duration,
}

/// 缓存管理器
///
/// 在 `main` 中创建一次，通过 `Arc` 在所有请求间共享
#[derive(Clone)]
pub struct CacheManager {
    store: Arc<dyn CacheStore>,
    key_prefix: String,
    ttl_seconds: u64,
}

impl CacheManager {
    /// 使用已有的存储创建管理器
    pub fn new(store: Arc<dyn CacheStore>, key_prefix: impl Into<String>, ttl_seconds: u64) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
            ttl_seconds: ttl_seconds.max(1),
        }
    }

    /// 根据配置选择后端并创建管理器
    ///
    /// # 选择规则
    /// 1. 配置了 `redis://` / `rediss://` 连接字符串，且在超时内连接成功、PING 通过 → Redis
    /// 2. 否则 → 文件缓存
    ///
    /// # 返回
    /// - `Err(StoreError)`: 文件缓存目录也无法创建
    pub async fn from_settings(settings: &CacheSettings) -> Result<Self, StoreError> {
        let store = Self::select_store(settings).await?;
        info!(
            "缓存后端: {}，有效期 {}",
            store.backend().as_str(),
            describe_ttl(settings.ttl_seconds)
        );
        Ok(Self::new(store, settings.key_prefix.clone(), settings.ttl_seconds))
    }

    async fn select_store(settings: &CacheSettings) -> Result<Arc<dyn CacheStore>, StoreError> {
        let redis_url = settings
            .redis_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty());

        match redis_url {
            Some(url) if RedisCacheStore::is_supported_url(url) => {
                info!("尝试连接 Redis...");
                match RedisCacheStore::connect(url, settings.probe_timeout).await {
                    Ok(store) => {
                        if store.is_available().await {
                            return Ok(Arc::new(store));
                        }
                        error!("Redis PING 失败，使用文件缓存");
                    }
                    Err(e) => error!("Redis 连接失败: {}，使用文件缓存", e),
                }
            }
            Some(url) => warn!("Redis 连接字符串无效: {}，使用文件缓存", url),
            None => info!("未配置 Redis，使用文件缓存"),
        }

        let store = FileCacheStore::new(&settings.cache_dir).await?;
        Ok(Arc::new(store))
    }

    pub fn backend(&self) -> CacheBackend {
        self.store.backend()
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    pub fn key_for(&self, url: &TargetUrl) -> CacheKey {
        CacheKey::derive(&self.key_prefix, url)
    }

    /// 读取缓存，未命中时计算并写入
    ///
    /// # 参数
    /// - `url`: 目标 URL
    /// - `ttl_seconds`: 写入时的有效期
    /// - `compute`: 未命中时执行的 抓取 + 提取 流程
    ///
    /// # 行为
    /// - 命中：返回缓存结果，`cached = true`
    /// - 未命中：执行 `compute`，成功后写入缓存（包括没有图片的结果），`cached = false`
    /// - `compute` 失败：直接返回错误，不写缓存
    /// - 缓存读写失败只记录日志，不影响返回结果
    pub async fn lookup_or_compute<F, Fut, E>(
        &self,
        url: &TargetUrl,
        ttl_seconds: u64,
        compute: F,
    ) -> Result<(ExtractionResult, Provenance), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ExtractionResult, E>>,
    {
        let key = self.key_for(url);
        let backend = self.backend();

        match self.store.get(&key).await {
            Ok(Some(entry)) => {
                debug!("[CACHE][GET] HIT {} ({})", key, backend.as_str());
                return Ok((
                    entry.value,
                    Provenance {
                        cached: true,
                        backend,
                    },
                ));
            }
            Ok(None) => debug!("[CACHE][GET] MISS {} ({})", key, backend.as_str()),
            Err(e) => warn!("[CACHE][GET] 读取缓存失败，按未命中处理: {} - {}", key, e),
        }

        let result = compute().await?;

        match self.store.set(&key, &result, ttl_seconds.max(1)).await {
            Ok(()) => debug!("[CACHE][SET] {} ({})", key, backend.as_str()),
            Err(e) => warn!("[CACHE][SET] 写入缓存失败: {} - {}", key, e),
        }

        Ok((
            result,
            Provenance {
                cached: false,
                backend,
            },
        ))
    }

    /// 使用默认有效期的 [`CacheManager::lookup_or_compute`]
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        url: &TargetUrl,
        compute: F,
    ) -> Result<(ExtractionResult, Provenance), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ExtractionResult, E>>,
    {
        self.lookup_or_compute(url, self.ttl_seconds, compute).await
    }
}

/// 可读的有效期描述，用于启动日志
pub fn describe_ttl(seconds: u64) -> String {
    const MINUTE: u64 = 60;
    const HOUR: u64 = 3600;
    const DAY: u64 = 86400;

    if seconds >= DAY {
        format!("{:.1} days ({} seconds)", seconds as f64 / DAY as f64, seconds)
    } else if seconds >= HOUR {
        format!("{:.1} hours ({} seconds)", seconds as f64 / HOUR as f64, seconds)
    } else if seconds >= MINUTE {
        format!("{:.1} minutes ({} seconds)", seconds as f64 / MINUTE as f64, seconds)
    } else {
        format!("{} seconds", seconds)
    }
}
