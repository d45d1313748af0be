// 页面抓取器 - 获取商品页面 HTML
//
// 每次调用只发出一个请求，不做重试，也不做缓存。
// 超时覆盖整个过程（连接 + 响应 + 读取正文），正文大小受 MAX_BODY_BYTES 限制。

use async_trait::async_trait;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONTENT_TYPE, REFERER,
    USER_AGENT,
};
use reqwest::{Client, Response};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::debug;

use crate::models::TargetUrl;

/// 默认 User-Agent 列表
pub const DEFAULT_USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.5 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36 Edg/114.0.1823.58",
];

/// 页面正文的最大字节数
pub const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// 抓取到的页面内容
#[derive(Debug, Clone)]
pub struct RawContent {
    /// 请求的目标 URL
    pub source_url: String,
    /// 重定向后的最终 URL，用于解析相对地址
    pub final_url: String,
    /// 响应的 Content-Type
    pub content_type: String,
    /// 页面正文（按 UTF-8 解码，非法字节被替换）
    pub body: String,
}

impl RawContent {
    /// 直接由 HTML 构造（测试与离线提取使用）
    pub fn html(source_url: impl Into<String>, body: impl Into<String>) -> Self {
        let source_url = source_url.into();
        Self {
            final_url: source_url.clone(),
            source_url,
            content_type: "text/html; charset=utf-8".to_string(),
            body: body.into(),
        }
    }
}

/// 抓取错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("网络错误: {0}")]
    Network(String),

    #[error("请求超时")]
    Timeout,

    #[error("HTTP 错误: 状态码 {status}")]
    Http { status: u16 },

    #[error("不支持的内容类型: {0}")]
    UnsupportedContentType(String),

    #[error("响应正文超过 {limit} 字节")]
    BodyTooLarge { limit: usize },
}

// 实现从 reqwest::Error 到 FetchError 的转换
impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = err.status() {
            FetchError::Http {
                status: status.as_u16(),
            }
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// 页面抓取接口
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// 抓取页面
    ///
    /// # 参数
    /// - `url`: 已校验的目标 URL
    /// - `timeout`: 整个抓取过程的超时时间
    async fn fetch(&self, url: &TargetUrl, timeout: Duration) -> Result<RawContent, FetchError>;
}

/// 判断 Content-Type 是否为 HTML
pub fn is_html_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}

/// 把一块正文追加到缓冲区，超过上限时返回错误
fn append_limited(body: &mut Vec<u8>, chunk: &[u8], limit: usize) -> Result<(), FetchError> {
    if body.len() + chunk.len() > limit {
        return Err(FetchError::BodyTooLarge { limit });
    }
    body.extend_from_slice(chunk);
    Ok(())
}

/// 分块读取正文，声明长度或实际长度超过上限时提前停止
async fn read_body(mut response: Response, limit: usize) -> Result<Vec<u8>, FetchError> {
    if response
        .content_length()
        .map_or(false, |len| len > limit as u64)
    {
        return Err(FetchError::BodyTooLarge { limit });
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        append_limited(&mut body, &chunk, limit)?;
    }
    Ok(body)
}

/// 基于 reqwest 的页面抓取器
pub struct HttpPageFetcher {
    /// HTTP 客户端（连接池在所有请求间共享）
    client: Client,
    user_agents: Vec<String>,
    /// 轮换 User-Agent 的游标
    next_agent: AtomicUsize,
}

impl HttpPageFetcher {
    /// 创建抓取器
    ///
    /// # 参数
    /// - `connect_timeout`: 建立连接的超时
    /// - `user_agents`: 轮换使用的 User-Agent，为空时使用默认列表
    pub fn new(connect_timeout: Duration, user_agents: Vec<String>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| FetchError::Network(format!("创建 HTTP 客户端失败: {}", e)))?;

        let user_agents = if user_agents.is_empty() {
            DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect()
        } else {
            user_agents
        };

        Ok(Self {
            client,
            user_agents,
            next_agent: AtomicUsize::new(0),
        })
    }

    fn next_user_agent(&self) -> &str {
        let index = self.next_agent.fetch_add(1, Ordering::Relaxed) % self.user_agents.len();
        &self.user_agents[index]
    }

    fn headers(&self, url: &TargetUrl) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(ua) = HeaderValue::from_str(self.next_user_agent()) {
            headers.insert(USER_AGENT, ua);
        }
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
        if let Ok(referer) = HeaderValue::from_str(&url.origin()) {
            headers.insert(REFERER, referer);
        }
        headers
    }

    async fn fetch_once(&self, url: &TargetUrl) -> Result<RawContent, FetchError> {
        let response = self
            .client
            .get(url.as_url().clone())
            .headers(self.headers(url))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !is_html_content_type(&content_type) {
            return Err(FetchError::UnsupportedContentType(if content_type.is_empty() {
                "missing".to_string()
            } else {
                content_type
            }));
        }

        let final_url = response.url().to_string();
        let bytes = read_body(response, MAX_BODY_BYTES).await?;
        let body = String::from_utf8_lossy(&bytes).into_owned();

        debug!(
            "Response status code: {}, content length: {} bytes",
            status,
            body.len()
        );

        Ok(RawContent {
            source_url: url.as_str().to_string(),
            final_url,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &TargetUrl, timeout_duration: Duration) -> Result<RawContent, FetchError> {
        debug!("开始抓取页面: {}", url);

        match timeout(timeout_duration, self.fetch_once(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        }
    }
}
