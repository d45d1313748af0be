// 图片提取器 - 从商品页面中找出封面大图地址
//
// 按优先级依次尝试各个策略，第一个找到有效地址的策略胜出，
// 后面的策略不再执行。所有策略都没有结果时返回"没有图片"，这不是错误。
// 提取是纯计算，不做任何 I/O。

pub mod candidate;
pub mod strategy;

use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

pub use candidate::{is_valid_image_url, Candidate};
pub use strategy::{ExtractionStrategy, Page, StrategyOutcome};

use crate::models::ExtractionResult;
use crate::services::fetcher::RawContent;

/// 提取错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// 内容无法作为页面解析（空正文或没有任何标记元素）
    #[error("页面内容无效: {0}")]
    MalformedContent(String),
}

/// 图片提取器
#[derive(Debug, Clone)]
pub struct ImageExtractor {
    strategies: Vec<ExtractionStrategy>,
}

impl Default for ImageExtractor {
    fn default() -> Self {
        Self::new(ExtractionStrategy::ALL.to_vec())
    }
}

impl ImageExtractor {
    /// 使用指定的策略列表（按给定顺序尝试）
    pub fn new(strategies: Vec<ExtractionStrategy>) -> Self {
        Self { strategies }
    }

    pub fn strategies(&self) -> &[ExtractionStrategy] {
        &self.strategies
    }

    /// 提取封面图片地址
    pub fn extract(&self, content: &RawContent) -> Result<ExtractionResult, ExtractionError> {
        self.extract_profiled(content, false)
    }

    /// 提取封面图片地址，`profile` 为 true 时记录每一步的耗时
    pub fn extract_profiled(
        &self,
        content: &RawContent,
        profile: bool,
    ) -> Result<ExtractionResult, ExtractionError> {
        if content.body.trim().is_empty() {
            return Err(ExtractionError::MalformedContent("页面正文为空".to_string()));
        }

        let parse_start = Instant::now();
        let page = Page::parse(content);
        if profile {
            info!(
                "[TIMING] HTML parsing completed in {:.2} seconds",
                parse_start.elapsed().as_secs_f64()
            );
        }

        if !page.has_markup() {
            return Err(ExtractionError::MalformedContent(
                "页面中没有任何标记元素".to_string(),
            ));
        }

        for strategy in &self.strategies {
            let started = Instant::now();
            let outcome = strategy.apply(&page);

            if profile {
                info!(
                    "[TIMING] Strategy {} completed in {:.2} seconds ({})",
                    strategy.name(),
                    started.elapsed().as_secs_f64(),
                    if matches!(outcome, StrategyOutcome::Found(_)) {
                        "found image"
                    } else {
                        "no image found"
                    }
                );
            }

            if let StrategyOutcome::Found(image_url) = outcome {
                debug!("策略 {} 找到图片: {}", strategy.name(), image_url);
                return Ok(ExtractionResult::found(&content.source_url, image_url));
            }
        }

        debug!("所有策略均未找到图片: {}", content.source_url);
        Ok(ExtractionResult::not_found(&content.source_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "https://www.amazon.com/dp/B00BD1Q0IQ";

    fn extract(body: &str) -> Result<ExtractionResult, ExtractionError> {
        ImageExtractor::default().extract(&RawContent::html(SOURCE, body))
    }

    #[test]
    fn test_default_uses_all_strategies() {
        assert_eq!(
            ImageExtractor::default().strategies(),
            &ExtractionStrategy::ALL[..]
        );
    }

    #[test]
    fn test_higher_priority_strategy_wins() {
        // 通用策略里的图片更大，但封面区域优先
        let body = r#"<html><body>
            <img id="imgBlkFront" data-a-dynamic-image='{"https://m.media-amazon.com/images/I/front.jpg":[300,450]}'>
            <img width="1000" height="1500" src="https://m.media-amazon.com/images/I/huge.jpg">
        </body></html>"#;

        let result = extract(body).unwrap();
        assert_eq!(
            result.image_url.as_deref(),
            Some("https://m.media-amazon.com/images/I/front.jpg")
        );
        assert_eq!(result.source_url, SOURCE);
    }

    #[test]
    fn test_falls_through_to_later_strategy() {
        let body = r#"<html><body>
            <img id="landingImage" src="https://images-na.ssl-images-amazon.com/images/G/01/x-locale/common/transparent-pixel.gif">
            <img alt="Product image" src="https://m.media-amazon.com/images/I/product.jpg">
        </body></html>"#;

        let result = extract(body).unwrap();
        assert_eq!(
            result.image_url.as_deref(),
            Some("https://m.media-amazon.com/images/I/product.jpg")
        );
    }

    #[test]
    fn test_no_image_is_success() {
        let result = extract("<html><body><p>Sorry, no cover</p></body></html>").unwrap();
        assert!(!result.has_image());
        assert_eq!(result.source_url, SOURCE);
    }

    #[test]
    fn test_empty_body_is_malformed() {
        assert!(matches!(
            extract("   \n"),
            Err(ExtractionError::MalformedContent(_))
        ));
    }

    #[test]
    fn test_plain_text_is_malformed() {
        assert!(matches!(
            extract("this is not html at all"),
            Err(ExtractionError::MalformedContent(_))
        ));
    }

    #[test]
    fn test_custom_strategy_list() {
        let body = r#"<meta property="og:image" content="https://m.media-amazon.com/images/I/og.jpg">
            <img alt="book" src="https://m.media-amazon.com/images/I/alt.jpg">"#;
        let extractor = ImageExtractor::new(vec![ExtractionStrategy::AltText]);

        let result = extractor.extract(&RawContent::html(SOURCE, body)).unwrap();
        assert_eq!(
            result.image_url.as_deref(),
            Some("https://m.media-amazon.com/images/I/alt.jpg")
        );
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let body = r#"<div id="main-image-container">
            <img src="https://m.media-amazon.com/images/I/a._SX300_.jpg">
            <img src="https://m.media-amazon.com/images/I/b._SX500_.jpg">
        </div>"#;

        let first = extract(body).unwrap();
        let second = extract(body).unwrap();
        assert_eq!(first.image_url, second.image_url);
        assert_eq!(
            first.image_url.as_deref(),
            Some("https://m.media-amazon.com/images/I/b._SX500_.jpg")
        );
    }
}
