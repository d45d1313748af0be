// 集成测试共用的工具

#![allow(dead_code)]

use async_trait::async_trait;
use book_image_backend::models::{HostValidator, TargetUrl};
use book_image_backend::services::{
    BookImageService, CacheManager, FetchError, FileCacheStore, ImageExtractor, PageFetcher,
    RawContent,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const BOOK_URL: &str = "https://www.amazon.com/dp/B00BD1Q0IQ";
pub const COVER_URL: &str = "https://m.media-amazon.com/images/I/51Zymoq7UnL._SL1500_.jpg";

/// 带封面的商品页面
pub fn cover_page() -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Some Book</title></head>
<body>
  <div id="main-image-container">
    <img id="imgBlkFront"
         src="https://m.media-amazon.com/images/I/51Zymoq7UnL._SX218_.jpg"
         data-a-dynamic-image='{{"https://m.media-amazon.com/images/I/51Zymoq7UnL._SX218_.jpg":[218,330],"{}":[991,1500]}}'>
  </div>
</body>
</html>"#,
        COVER_URL
    )
}

/// 没有封面的商品页面
pub const NO_COVER_PAGE: &str = r#"<html><body>
  <img src="https://images-na.ssl-images-amazon.com/images/G/01/x-locale/common/grey-pixel.gif">
  <p>Currently unavailable.</p>
</body></html>"#;

/// 返回固定结果并记录调用次数的抓取器
pub struct CountingFetcher {
    response: Result<String, FetchError>,
    calls: AtomicUsize,
    /// 每次抓取前的等待时间
    delay: Duration,
}

impl CountingFetcher {
    pub fn html(body: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(body.into()),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        })
    }

    pub fn slow_html(body: impl Into<String>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(body.into()),
            calls: AtomicUsize::new(0),
            delay,
        })
    }

    pub fn failing(err: FetchError) -> Arc<Self> {
        Arc::new(Self {
            response: Err(err),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for CountingFetcher {
    async fn fetch(&self, url: &TargetUrl, _timeout: Duration) -> Result<RawContent, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.response
            .clone()
            .map(|body| RawContent::html(url.as_str(), body))
    }
}

/// 使用临时目录文件缓存的服务
pub async fn create_test_service(
    fetcher: Arc<CountingFetcher>,
    ttl_seconds: u64,
) -> (BookImageService, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = FileCacheStore::new(temp_dir.path().join("cache"))
        .await
        .unwrap();
    let cache = CacheManager::new(Arc::new(store), "amazon_book_image", ttl_seconds);

    let service = BookImageService::new(
        fetcher,
        ImageExtractor::default(),
        cache,
        HostValidator::default(),
        Duration::from_secs(5),
    );

    (service, temp_dir)
}
