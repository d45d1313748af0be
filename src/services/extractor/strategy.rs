// 提取策略
//
// 按固定优先级排列，每个策略只负责收集候选地址，
// 解析、校验与择优统一由 Page::best_candidate 完成。

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use url::Url;

use super::candidate::{is_valid_image_url, parse_srcset, pick_largest, resolve_url, Candidate};
use crate::services::fetcher::RawContent;

lazy_static::lazy_static! {
    static ref DYNAMIC_IMAGE: Selector =
        Selector::parse("#imgBlkFront, #ebooksImgBlkFront").expect("选择器解析失败");
    static ref SCRIPT: Selector = Selector::parse("script").expect("选择器解析失败");
    static ref GALLERY_IMAGE: Selector = Selector::parse(
        "#imageBlock_feature_div img, #main-image-container img, #imgTagWrapperId img"
    )
    .expect("选择器解析失败");
    static ref MAIN_IMAGE: Selector =
        Selector::parse("#landingImage, #imgBlkFront, #main-image, #img-canvas img")
            .expect("选择器解析失败");
    static ref BOOK_DETAILS: Selector = Selector::parse(
        ".a-fixed-left-grid-col img, .a-fixed-right-grid-col img, .dp-title-col img"
    )
    .expect("选择器解析失败");
    static ref OPEN_GRAPH: Selector =
        Selector::parse(r#"meta[property="og:image"], meta[name="twitter:image"]"#)
            .expect("选择器解析失败");
    static ref IMG: Selector = Selector::parse("img").expect("选择器解析失败");
    static ref ANY_ELEMENT: Selector = Selector::parse("*").expect("选择器解析失败");

    /// 脚本中的 `var data = {...};`
    static ref SCRIPT_DATA: Regex =
        Regex::new(r"(?s)var data = (\{.*?\});").expect("脚本数据正则表达式编译失败");
    /// 脚本中的图片地址
    static ref SCRIPT_IMAGE_URL: Regex =
        Regex::new(r#"https://[^"\s]+\.(?:jpg|jpeg|png|gif)"#).expect("脚本图片正则表达式编译失败");
}

/// 通用策略的最小边长
const LARGE_IMAGE_MIN_SIDE: u32 = 200;

/// 替代文本中的关键词
const ALT_KEYWORDS: [&str; 3] = ["book", "cover", "product"];

/// 解析后的页面
///
/// `scraper::Html` 不是 `Send`，只能在同一线程内使用
pub struct Page {
    document: Html,
    /// 解析相对地址的基准（重定向后的最终地址）
    base: Option<Url>,
}

impl Page {
    pub fn parse(content: &RawContent) -> Self {
        let base = Url::parse(&content.final_url)
            .or_else(|_| Url::parse(&content.source_url))
            .ok();

        Self {
            document: Html::parse_document(&content.body),
            base,
        }
    }

    /// 文档中是否有实际的标记元素
    ///
    /// 解析器总会补齐 html / head / body，这三个不算
    pub fn has_markup(&self) -> bool {
        self.document
            .select(&ANY_ELEMENT)
            .any(|el| !matches!(el.value().name(), "html" | "head" | "body"))
    }

    /// 解析、校验候选地址，并选出声明面积最大的一个
    fn best_candidate(&self, candidates: Vec<Candidate>) -> Option<String> {
        let valid = candidates.into_iter().filter_map(|candidate| {
            let url = resolve_url(&candidate.url, self.base.as_ref())?;
            if is_valid_image_url(&url) {
                Some(Candidate { url, ..candidate })
            } else {
                None
            }
        });

        pick_largest(valid).map(|candidate| candidate.url)
    }
}

/// 单个策略的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyOutcome {
    Found(String),
    NotFound,
}

/// 提取策略（按优先级排列）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionStrategy {
    /// 封面区域 `data-a-dynamic-image` 中的尺寸表
    DynamicImage,
    /// 内联脚本中的图库数据
    ScriptGallery,
    /// 图库区域的图片
    GalleryImage,
    /// 主图区域
    MainImage,
    /// 图书详情区域
    BookDetails,
    /// Open Graph / Twitter 卡片元数据
    OpenGraph,
    /// 替代文本提到 book / cover / product 的图片
    AltText,
    /// 声明尺寸足够大的任意图片
    LargestImage,
}

impl ExtractionStrategy {
    pub const ALL: [ExtractionStrategy; 8] = [
        ExtractionStrategy::DynamicImage,
        ExtractionStrategy::ScriptGallery,
        ExtractionStrategy::GalleryImage,
        ExtractionStrategy::MainImage,
        ExtractionStrategy::BookDetails,
        ExtractionStrategy::OpenGraph,
        ExtractionStrategy::AltText,
        ExtractionStrategy::LargestImage,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ExtractionStrategy::DynamicImage => "dynamic_image",
            ExtractionStrategy::ScriptGallery => "script_gallery",
            ExtractionStrategy::GalleryImage => "gallery_image",
            ExtractionStrategy::MainImage => "main_image",
            ExtractionStrategy::BookDetails => "book_details",
            ExtractionStrategy::OpenGraph => "open_graph",
            ExtractionStrategy::AltText => "alt_text",
            ExtractionStrategy::LargestImage => "largest_image",
        }
    }

    /// 在页面上执行策略
    pub fn apply(&self, page: &Page) -> StrategyOutcome {
        let candidates = match self {
            ExtractionStrategy::DynamicImage => dynamic_image_candidates(page),
            ExtractionStrategy::ScriptGallery => script_candidates(page),
            ExtractionStrategy::GalleryImage => page
                .document
                .select(&GALLERY_IMAGE)
                .flat_map(|el| image_element_candidates(el, false))
                .collect(),
            ExtractionStrategy::MainImage => page
                .document
                .select(&MAIN_IMAGE)
                .flat_map(|el| image_element_candidates(el, true))
                .collect(),
            ExtractionStrategy::BookDetails => page
                .document
                .select(&BOOK_DETAILS)
                .filter_map(src_candidate)
                .collect(),
            ExtractionStrategy::OpenGraph => page
                .document
                .select(&OPEN_GRAPH)
                .filter_map(|el| el.value().attr("content"))
                .map(Candidate::new)
                .collect(),
            ExtractionStrategy::AltText => page
                .document
                .select(&IMG)
                .filter(|el| {
                    let alt = el.value().attr("alt").unwrap_or_default().to_lowercase();
                    ALT_KEYWORDS.iter().any(|keyword| alt.contains(keyword))
                })
                .filter_map(src_candidate)
                .collect(),
            ExtractionStrategy::LargestImage => page
                .document
                .select(&IMG)
                .filter_map(src_candidate)
                .filter(|candidate| {
                    matches!(
                        (candidate.width, candidate.height),
                        (Some(w), Some(h)) if w >= LARGE_IMAGE_MIN_SIDE && h >= LARGE_IMAGE_MIN_SIDE
                    )
                })
                .collect(),
        };

        match page.best_candidate(candidates) {
            Some(url) => StrategyOutcome::Found(url),
            None => StrategyOutcome::NotFound,
        }
    }
}

/// 读取元素的尺寸属性
fn dimension_attr(el: &ElementRef, name: &str) -> Option<u32> {
    el.value()
        .attr(name)
        .and_then(|value| value.trim().trim_end_matches("px").parse::<u32>().ok())
}

/// `src` 属性，附带元素声明的宽高
fn src_candidate(el: ElementRef) -> Option<Candidate> {
    let src = el.value().attr("src")?;
    Some(Candidate::with_dimensions(
        src,
        dimension_attr(&el, "width"),
        dimension_attr(&el, "height"),
    ))
}

/// 解析 `data-a-dynamic-image`：`{"url": [width, height], ...}`
///
/// JSON 格式错误时返回空列表
fn parse_dynamic_image(json: &str) -> Vec<Candidate> {
    let map = match serde_json::from_str::<serde_json::Map<String, Value>>(json) {
        Ok(map) => map,
        Err(e) => {
            tracing::debug!("data-a-dynamic-image 解析失败: {}", e);
            return Vec::new();
        }
    };

    map.into_iter()
        .map(|(url, dims)| {
            let dim = |index: usize| {
                dims.get(index)
                    .and_then(Value::as_u64)
                    .and_then(|v| u32::try_from(v).ok())
            };
            Candidate::with_dimensions(url, dim(0), dim(1))
        })
        .collect()
}

fn dynamic_image_candidates(page: &Page) -> Vec<Candidate> {
    page.document
        .select(&DYNAMIC_IMAGE)
        .filter_map(|el| el.value().attr("data-a-dynamic-image"))
        .flat_map(parse_dynamic_image)
        .collect()
}

/// 图片元素上的所有候选：动态尺寸表（可选）、高清图、srcset、src
fn image_element_candidates(el: ElementRef, with_dynamic: bool) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    if with_dynamic {
        if let Some(json) = el.value().attr("data-a-dynamic-image") {
            candidates.extend(parse_dynamic_image(json));
        }
    }
    if let Some(src) = src_candidate(el) {
        candidates.push(src);
    }
    if let Some(hires) = el.value().attr("data-old-hires") {
        candidates.push(Candidate::new(hires));
    }
    if let Some(srcset) = el.value().attr("srcset") {
        candidates.extend(parse_srcset(srcset));
    }

    candidates
}

/// 内联脚本中的图片：`imageGalleryData[*].mainUrl` 与 `ImageBlockATF` 中的地址
fn script_candidates(page: &Page) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for script in page.document.select(&SCRIPT) {
        if script.value().attr("src").is_some() {
            continue;
        }
        let text: String = script.text().collect();

        if text.contains("imageGalleryData") {
            for caps in SCRIPT_DATA.captures_iter(&text) {
                let data = match serde_json::from_str::<Value>(&caps[1]) {
                    Ok(data) => data,
                    Err(_) => continue,
                };
                if let Some(items) = data.get("imageGalleryData").and_then(Value::as_array) {
                    candidates.extend(
                        items
                            .iter()
                            .filter_map(|item| item.get("mainUrl").and_then(Value::as_str))
                            .map(Candidate::new),
                    );
                }
            }
        }

        if text.contains("ImageBlockATF") {
            candidates.extend(
                SCRIPT_IMAGE_URL
                    .find_iter(&text)
                    .map(|m| Candidate::new(m.as_str())),
            );
        }
    }

    candidates
}
