// 请求处理流程
//
// 校验 URL → 查缓存 → 未命中时抓取页面并提取图片 → 写缓存 → 返回结果。
// URL 校验失败时不访问网络，也不访问缓存。

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

use super::cache::CacheManager;
use super::extractor::{ExtractionError, ImageExtractor};
use super::fetcher::{FetchError, PageFetcher};
use crate::models::{CacheBackend, ExtractionResult, HostValidator, TargetUrl, ValidationError};

/// 单次请求的选项，只影响日志，不影响结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// 以 info 级别输出每一步的细节
    pub debug: bool,
    /// 记录每一步的耗时
    pub profile: bool,
}

/// 提取失败的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    UpstreamTimeout,
    UpstreamUnreachable,
    UpstreamStatus,
    UnsupportedContentType,
    MalformedContent,
    Internal,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::UpstreamTimeout => "upstream_timeout",
            FailureReason::UpstreamUnreachable => "upstream_unreachable",
            FailureReason::UpstreamStatus => "upstream_status",
            FailureReason::UnsupportedContentType => "unsupported_content_type",
            FailureReason::MalformedContent => "malformed_content",
            FailureReason::Internal => "internal",
        }
    }
}

/// 请求错误
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("{0}")]
    InvalidUrl(#[from] ValidationError),

    #[error("{message}")]
    ExtractionFailed {
        reason: FailureReason,
        message: String,
        /// 上游返回的 HTTP 状态码
        upstream_status: Option<u16>,
    },
}

impl RequestError {
    fn extraction_failed(reason: FailureReason, message: impl Into<String>) -> Self {
        RequestError::ExtractionFailed {
            reason,
            message: message.into(),
            upstream_status: None,
        }
    }
}

impl From<FetchError> for RequestError {
    fn from(err: FetchError) -> Self {
        let message = err.to_string();
        match err {
            FetchError::Timeout => Self::extraction_failed(FailureReason::UpstreamTimeout, message),
            FetchError::Network(_) => {
                Self::extraction_failed(FailureReason::UpstreamUnreachable, message)
            }
            FetchError::Http { status } => RequestError::ExtractionFailed {
                reason: FailureReason::UpstreamStatus,
                message,
                upstream_status: Some(status),
            },
            FetchError::UnsupportedContentType(_) => {
                Self::extraction_failed(FailureReason::UnsupportedContentType, message)
            }
            FetchError::BodyTooLarge { .. } => {
                Self::extraction_failed(FailureReason::MalformedContent, message)
            }
        }
    }
}

impl From<ExtractionError> for RequestError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::MalformedContent(_) => {
                Self::extraction_failed(FailureReason::MalformedContent, err.to_string())
            }
        }
    }
}

/// 成功响应
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookImageResponse {
    pub success: bool,
    pub image_url: Option<String>,
    pub book_url: String,
    pub processing_time_seconds: f64,
    pub cached: bool,
    pub cache_backend: CacheBackend,
}

/// 封面图片服务
pub struct BookImageService {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<ImageExtractor>,
    cache: CacheManager,
    hosts: HostValidator,
    /// 整个抓取过程的超时
    fetch_timeout: Duration,
}

impl BookImageService {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: ImageExtractor,
        cache: CacheManager,
        hosts: HostValidator,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            extractor: Arc::new(extractor),
            cache,
            hosts,
            fetch_timeout,
        }
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// 处理一次查询
    pub async fn handle(&self, raw_url: &str) -> Result<BookImageResponse, RequestError> {
        self.handle_with_options(raw_url, RequestOptions::default())
            .await
    }

    /// 处理一次查询
    ///
    /// # 参数
    /// - `raw_url`: 调用方传入的商品页面地址
    /// - `options`: 调试与耗时日志开关
    ///
    /// # 返回
    /// - `Ok(BookImageResponse)`: 提取成功（可能没有图片）
    /// - `Err(RequestError::InvalidUrl)`: 地址不合法，未访问网络和缓存
    /// - `Err(RequestError::ExtractionFailed)`: 抓取或解析失败，结果不会被缓存
    pub async fn handle_with_options(
        &self,
        raw_url: &str,
        options: RequestOptions,
    ) -> Result<BookImageResponse, RequestError> {
        let started = Instant::now();
        let target = TargetUrl::parse(raw_url, &self.hosts)?;

        if options.debug {
            info!("Processing book URL: {}", target);
        }

        let (result, provenance) = self
            .cache
            .get_or_compute(&target, || self.fetch_and_extract(&target, options))
            .await?;

        let elapsed = started.elapsed().as_secs_f64();

        if options.profile {
            info!(
                "[TIMING] Total processing time: {:.2} seconds (cached: {}, backend: {})",
                elapsed,
                provenance.cached,
                provenance.backend.as_str()
            );
        }
        if options.debug {
            info!(
                "Result for {}: {:?} (cached: {})",
                target, result.image_url, provenance.cached
            );
        }

        Ok(BookImageResponse {
            success: true,
            image_url: result.image_url,
            book_url: target.as_str().to_string(),
            processing_time_seconds: elapsed,
            cached: provenance.cached,
            cache_backend: provenance.backend,
        })
    }

    /// 抓取页面并提取图片（缓存未命中时执行）
    async fn fetch_and_extract(
        &self,
        target: &TargetUrl,
        options: RequestOptions,
    ) -> Result<ExtractionResult, RequestError> {
        let fetch_start = Instant::now();
        let content = self.fetcher.fetch(target, self.fetch_timeout).await?;

        if options.profile {
            info!(
                "[TIMING] HTTP Request completed in {:.2} seconds",
                fetch_start.elapsed().as_secs_f64()
            );
        }
        if options.debug {
            info!(
                "Fetched {} ({} bytes, {})",
                content.final_url,
                content.body.len(),
                content.content_type
            );
        } else {
            debug!("Fetched {} ({} bytes)", content.final_url, content.body.len());
        }

        // 解析 HTML 是 CPU 密集型操作，放到阻塞线程池
        let extractor = Arc::clone(&self.extractor);
        let result = tokio::task::spawn_blocking(move || {
            extractor.extract_profiled(&content, options.profile)
        })
        .await
        .map_err(|e| {
            RequestError::extraction_failed(
                FailureReason::Internal,
                format!("提取任务异常: {}", e),
            )
        })??;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::cache::FileCacheStore;
    use crate::services::fetcher::RawContent;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// 返回固定结果并记录调用次数的抓取器
    struct StubFetcher {
        response: Result<String, FetchError>,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn html(body: &str) -> Self {
            Self {
                response: Ok(body.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(err: FetchError) -> Self {
            Self {
                response: Err(err),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(
            &self,
            url: &TargetUrl,
            _timeout: Duration,
        ) -> Result<RawContent, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response
                .clone()
                .map(|body| RawContent::html(url.as_str(), body))
        }
    }

    async fn create_test_service(
        fetcher: Arc<StubFetcher>,
    ) -> (BookImageService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileCacheStore::new(temp_dir.path()).await.unwrap();
        let cache = CacheManager::new(Arc::new(store), "test", 3600);
        let service = BookImageService::new(
            fetcher,
            ImageExtractor::default(),
            cache,
            HostValidator::default(),
            Duration::from_secs(5),
        );
        (service, temp_dir)
    }

    const COVER_PAGE: &str = r#"<html><body>
        <img id="landingImage" src="https://m.media-amazon.com/images/I/cover._SL1500_.jpg">
    </body></html>"#;

    #[tokio::test]
    async fn test_invalid_url_skips_fetch() {
        let fetcher = Arc::new(StubFetcher::html(COVER_PAGE));
        let (service, _temp_dir) = create_test_service(fetcher.clone()).await;

        for raw in ["", "not a url", "ftp://www.amazon.com/x", "https://example.com/dp/1"] {
            let err = service.handle(raw).await.unwrap_err();
            assert!(matches!(err, RequestError::InvalidUrl(_)), "{}", raw);
        }
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_request_is_cached() {
        let fetcher = Arc::new(StubFetcher::html(COVER_PAGE));
        let (service, _temp_dir) = create_test_service(fetcher.clone()).await;
        let url = "https://www.amazon.com/dp/B00BD1Q0IQ";

        let first = service.handle(url).await.unwrap();
        assert!(!first.cached);
        assert_eq!(first.cache_backend, CacheBackend::Fallback);
        assert_eq!(
            first.image_url.as_deref(),
            Some("https://m.media-amazon.com/images/I/cover._SL1500_.jpg")
        );

        let second = service.handle(url).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.image_url, first.image_url);
        assert_eq!(second.book_url, url);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_errors_are_not_cached() {
        let fetcher = Arc::new(StubFetcher::failing(FetchError::Http { status: 503 }));
        let (service, _temp_dir) = create_test_service(fetcher.clone()).await;
        let url = "https://www.amazon.com/dp/B00BD1Q0IQ";

        for _ in 0..2 {
            match service.handle(url).await.unwrap_err() {
                RequestError::ExtractionFailed {
                    reason,
                    upstream_status,
                    ..
                } => {
                    assert_eq!(reason, FailureReason::UpstreamStatus);
                    assert_eq!(upstream_status, Some(503));
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_malformed_content_reason() {
        let fetcher = Arc::new(StubFetcher::html("plain text"));
        let (service, _temp_dir) = create_test_service(fetcher).await;

        match service.handle("https://www.amazon.com/dp/X").await.unwrap_err() {
            RequestError::ExtractionFailed { reason, .. } => {
                assert_eq!(reason, FailureReason::MalformedContent)
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_options_do_not_change_output() {
        let fetcher = Arc::new(StubFetcher::html(COVER_PAGE));
        let (service, _temp_dir) = create_test_service(fetcher).await;
        let url = "https://www.amazon.com/dp/B00BD1Q0IQ";

        let plain = service.handle(url).await.unwrap();
        let verbose = service
            .handle_with_options(
                url,
                RequestOptions {
                    debug: true,
                    profile: true,
                },
            )
            .await
            .unwrap();

        assert_eq!(plain.image_url, verbose.image_url);
        assert_eq!(plain.book_url, verbose.book_url);
    }

    #[test]
    fn test_fetch_error_mapping() {
        let cases = [
            (FetchError::Timeout, FailureReason::UpstreamTimeout),
            (
                FetchError::Network("refused".to_string()),
                FailureReason::UpstreamUnreachable,
            ),
            (
                FetchError::UnsupportedContentType("image/png".to_string()),
                FailureReason::UnsupportedContentType,
            ),
            (
                FetchError::BodyTooLarge { limit: 1024 },
                FailureReason::MalformedContent,
            ),
        ];

        for (err, expected) in cases {
            match RequestError::from(err) {
                RequestError::ExtractionFailed { reason, .. } => assert_eq!(reason, expected),
                other => panic!("unexpected error: {:?}", other),
            }
        }
    }

    #[test]
    fn test_failure_reason_serialization() {
        assert_eq!(
            serde_json::to_string(&FailureReason::UnsupportedContentType).unwrap(),
            "\"unsupported_content_type\""
        );
        assert_eq!(FailureReason::UpstreamTimeout.as_str(), "upstream_timeout");
    }
}
