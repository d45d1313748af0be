use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 图片提取结果
///
/// `image_url` 为 `None` 表示页面中没有找到封面图，
/// 这是一次成功的提取，与抓取/解析失败不同，同样会被缓存。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub image_url: Option<String>,
    pub source_url: String,
    pub extracted_at: DateTime<Utc>,
}

impl ExtractionResult {
    pub fn found(source_url: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            image_url: Some(image_url.into()),
            source_url: source_url.into(),
            extracted_at: Utc::now(),
        }
    }

    pub fn not_found(source_url: impl Into<String>) -> Self {
        Self {
            image_url: None,
            source_url: source_url.into(),
            extracted_at: Utc::now(),
        }
    }

    pub fn has_image(&self) -> bool {
        self.image_url.is_some()
    }
}

/// 缓存后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    /// 快速后端（Redis）
    Fast,
    /// 文件后端
    Fallback,
}

impl CacheBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheBackend::Fast => "fast",
            CacheBackend::Fallback => "fallback",
        }
    }
}

/// 结果来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub cached: bool,
    pub backend: CacheBackend,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_backend_serialization() {
        assert_eq!(serde_json::to_string(&CacheBackend::Fast).unwrap(), "\"fast\"");
        assert_eq!(
            serde_json::to_string(&CacheBackend::Fallback).unwrap(),
            "\"fallback\""
        );
        assert_eq!(CacheBackend::Fallback.as_str(), "fallback");
    }

    #[test]
    fn test_not_found_result_serializes_null_image() {
        let result = ExtractionResult::not_found("https://www.amazon.com/dp/X");
        assert!(!result.has_image());

        let json = serde_json::to_value(&result).unwrap();
        assert!(json["image_url"].is_null());
        assert_eq!(json["source_url"], "https://www.amazon.com/dp/X");

        let back: ExtractionResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }
}
