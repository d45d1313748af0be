// 目标页面 URL
//
// 经过校验的商品页面地址，创建后不可变

use std::fmt;
use url::Url;

use super::validation::{HostValidator, ValidationError};

/// 已校验的目标 URL
///
/// 只能通过 [`TargetUrl::parse`] 构造，保证：
/// - 是绝对 URL，协议为 http 或 https
/// - 主机名属于允许的主机列表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl {
    raw: String,
    url: Url,
}

impl TargetUrl {
    /// 校验并构造目标 URL
    ///
    /// # 参数
    /// - `raw`: 调用方传入的原始字符串（会去除首尾空白）
    /// - `hosts`: 允许的主机校验器
    ///
    /// # 返回
    /// - `Ok(TargetUrl)`: 校验通过
    /// - `Err(ValidationError)`: 格式、协议或主机不合法
    pub fn parse(raw: &str, hosts: &HostValidator) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyUrl);
        }

        let url = Url::parse(trimmed)
            .map_err(|e| ValidationError::InvalidUrl(format!("{}: {}", trimmed, e)))?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(ValidationError::UnsupportedScheme(other.to_string())),
        }

        let host = url.host_str().ok_or(ValidationError::MissingHost)?;
        hosts.validate_host(host)?;

        Ok(Self {
            raw: trimmed.to_string(),
            url,
        })
    }

    /// 原始输入（去除空白后）
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn as_url(&self) -> &Url {
        &self.url
    }

    /// 页面来源（`scheme://host/`），用作请求的 Referer
    pub fn origin(&self) -> String {
        format!(
            "{}://{}/",
            self.url.scheme(),
            self.url.host_str().unwrap_or_default()
        )
    }
}

impl fmt::Display for TargetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
