use thiserror::Error;

/// URL 验证错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("URL cannot be empty")]
    EmptyUrl,

    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),

    #[error("Unsupported URL scheme: {0} (must be http or https)")]
    UnsupportedScheme(String),

    #[error("URL has no host")]
    MissingHost,

    #[error("Host is not supported: {0}")]
    HostNotAccepted(String),
}

/// 常见的通用顶级域
const GENERIC_TLDS: [&str; 3] = ["com", "net", "org"];

/// 国家顶级域下用作二级后缀的标签，如 `co.uk`、`com.au`、`co.jp`
const SECOND_LEVEL_LABELS: [&str; 6] = ["co", "com", "net", "org", "ne", "or"];

/// 主机名验证工具
///
/// 关键字必须是可注册域名的主体标签，即顶级域（或 `co.uk` 这类二级后缀）
/// 之前的那一个标签。关键字 `amazon` 接受 `www.amazon.com`、`amazon.co.uk`、
/// `amazon.de`，不接受 `notamazon.com`、`amazon.evil.example`、`amazon.localhost`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostValidator {
    keywords: Vec<String>,
}

impl HostValidator {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.into().trim().to_ascii_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn validate_host(&self, host: &str) -> Result<(), ValidationError> {
        let host = host.to_ascii_lowercase();
        let accepted = registrable_label(host.trim_end_matches('.'))
            .map_or(false, |label| self.keywords.iter().any(|k| k == label));

        if accepted {
            Ok(())
        } else {
            Err(ValidationError::HostNotAccepted(host))
        }
    }
}

/// 取出可注册域名的主体标签
///
/// 顶级域只认通用域名和两位字母的国家域名，其余（`localhost`、`example`、IP 地址）返回 `None`
fn registrable_label(host: &str) -> Option<&str> {
    let labels: Vec<&str> = host.split('.').collect();
    let (tld, rest) = labels.split_last()?;

    let is_country = tld.len() == 2 && tld.bytes().all(|b| b.is_ascii_lowercase());
    if !is_country && !GENERIC_TLDS.contains(tld) {
        return None;
    }

    let label = match rest {
        [.., name, second] if is_country && SECOND_LEVEL_LABELS.contains(second) => *name,
        [.., name] => *name,
        [] => return None,
    };

    (!label.is_empty()).then_some(label)
}

impl Default for HostValidator {
    fn default() -> Self {
        Self::new(["amazon"])
    }
}
