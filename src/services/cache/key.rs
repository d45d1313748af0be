// 缓存键生成
//
// 规范化规则（固定，修改会使已有缓存全部失效）：
// - scheme 与 host 小写，去掉默认端口
// - 空路径记为 `/`
// - 丢弃 fragment
// - 查询参数按 (名称, 值) 排序后重新做 form-urlencoded 编码，空查询省略
//
// 缓存键格式：`{prefix}:{sha256(规范化 URL) 的十六进制}`

use sha2::{Digest, Sha256};
use std::fmt;
use url::{form_urlencoded, Url};

use crate::models::TargetUrl;

/// 缓存键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// 从目标 URL 生成缓存键
    pub fn derive(prefix: &str, url: &TargetUrl) -> Self {
        let normalized = normalize_url(url.as_url());

        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        let hash = hasher.finalize();

        CacheKey(format!("{}:{:x}", prefix, hash))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 文件后端使用的文件名
    ///
    /// 只保留 `[A-Za-z0-9_-]`，其余字符替换为 `_`
    pub fn file_name(&self) -> String {
        let safe: String = self
            .0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}.json", safe)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 规范化 URL
pub fn normalize_url(url: &Url) -> String {
    let mut normalized = format!(
        "{}://{}",
        url.scheme().to_ascii_lowercase(),
        url.host_str().unwrap_or_default().to_ascii_lowercase()
    );

    // Url::port() 对默认端口返回 None
    if let Some(port) = url.port() {
        normalized.push_str(&format!(":{}", port));
    }

    let path = url.path();
    if path.is_empty() {
        normalized.push('/');
    } else {
        normalized.push_str(path);
    }

    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    if !pairs.is_empty() {
        pairs.sort();
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs.iter())
            .finish();
        normalized.push('?');
        normalized.push_str(&query);
    }

    normalized
}
