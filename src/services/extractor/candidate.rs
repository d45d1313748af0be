// 候选图片 URL - 地址解析、有效性检查与择优
//
// 有效的候选需要同时满足：
// - 解析为绝对 http(s) 地址
// - 不是占位图
// - 来自 Amazon 图片服务器
// - 带有图片扩展名，或者是 images-amazon 地址
// - URL 中同时编码了 _SX / _SY 尺寸时，两者都不小于 100

use regex::Regex;
use url::Url;

lazy_static::lazy_static! {
    /// Amazon 图片 URL 中的尺寸标记，例如 `_SX500_`、`_SL1500_`
    static ref SIZE_TOKEN: Regex =
        Regex::new(r"_(SX|SY|SL|UL|SS|UX|UY)(\d+)").expect("尺寸标记正则表达式编译失败");
}

/// 占位图特征
pub const PLACEHOLDER_MARKERS: [&str; 9] = [
    "grey-pixel.gif",
    "transparent-pixel.gif",
    "loading-img",
    "no-img",
    "no-image",
    "placeholder",
    "spinner",
    "loading",
    "blank",
];

/// 认可的图片扩展名
const IMAGE_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".png", ".gif", ".webp"];

/// 编码了尺寸时的最小边长
const MIN_ENCODED_SIDE: u32 = 100;

/// 候选图片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: String,
    /// 页面声明的宽度（JSON 尺寸、width 属性或 srcset 描述符）
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Candidate {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            width: None,
            height: None,
        }
    }

    pub fn with_dimensions(url: impl Into<String>, width: Option<u32>, height: Option<u32>) -> Self {
        Self {
            url: url.into(),
            width,
            height,
        }
    }

    /// 声明的面积
    ///
    /// 优先使用页面声明的尺寸，其次使用 URL 中的尺寸标记，都没有时为 0
    pub fn declared_area(&self) -> u64 {
        match (self.width, self.height) {
            (Some(w), Some(h)) => w as u64 * h as u64,
            (Some(side), None) | (None, Some(side)) => side as u64 * side as u64,
            (None, None) => EncodedSize::parse(&self.url).area(),
        }
    }
}

/// URL 中编码的尺寸
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct EncodedSize {
    width: Option<u32>,
    height: Option<u32>,
    /// 最长边（_SL / _UL / _SS / _UX / _UY）
    side: Option<u32>,
}

impl EncodedSize {
    fn parse(url: &str) -> Self {
        let mut size = Self::default();

        for caps in SIZE_TOKEN.captures_iter(url) {
            let value = match caps[2].parse::<u32>() {
                Ok(value) => value,
                Err(_) => continue,
            };
            match &caps[1] {
                "SX" => size.width = size.width.or(Some(value)),
                "SY" => size.height = size.height.or(Some(value)),
                _ => size.side = size.side.or(Some(value)),
            }
        }

        size
    }

    fn area(&self) -> u64 {
        match (self.width, self.height, self.side) {
            (Some(w), Some(h), _) => w as u64 * h as u64,
            (_, _, Some(side)) => side as u64 * side as u64,
            (Some(d), None, None) | (None, Some(d), None) => d as u64 * d as u64,
            (None, None, None) => 0,
        }
    }
}

/// 把页面中的图片地址解析为绝对地址
///
/// # 参数
/// - `raw`: 属性或脚本中的原始地址
/// - `base`: 页面最终 URL，用于解析相对地址和协议相对地址
///
/// # 返回
/// 绝对 http(s) 地址；`data:` 地址、空值和无法解析的地址返回 `None`
pub fn resolve_url(raw: &str, base: Option<&Url>) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("data:") {
        return None;
    }

    let resolved = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => match base {
            Some(base) => base.join(raw).ok()?,
            None if raw.starts_with("//") => Url::parse(&format!("https:{}", raw)).ok()?,
            None => return None,
        },
        Err(_) => return None,
    };

    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}

/// 检查是否为有效的封面图片地址
pub fn is_valid_image_url(url: &str) -> bool {
    let lower = url.to_lowercase();

    if PLACEHOLDER_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return false;
    }

    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }

    let from_amazon = parsed
        .host_str()
        .map(|host| host.to_lowercase().contains("amazon"))
        .unwrap_or(false);
    if !from_amazon {
        return false;
    }

    let path = parsed.path().to_lowercase();
    let has_extension = IMAGE_EXTENSIONS.iter().any(|ext| path.contains(ext));
    if !has_extension && !lower.contains("images-amazon") {
        return false;
    }

    // 过滤图标等小图
    let size = EncodedSize::parse(url);
    if let (Some(w), Some(h)) = (size.width, size.height) {
        if w < MIN_ENCODED_SIDE || h < MIN_ENCODED_SIDE {
            return false;
        }
    }

    true
}

/// 从候选中选出声明面积最大的一个，面积相同时取先出现的
pub fn pick_largest<I>(candidates: I) -> Option<Candidate>
where
    I: IntoIterator<Item = Candidate>,
{
    let mut best: Option<(u64, Candidate)> = None;

    for candidate in candidates {
        let area = candidate.declared_area();
        let larger = best
            .as_ref()
            .map_or(true, |(best_area, _)| area > *best_area);
        if larger {
            best = Some((area, candidate));
        }
    }

    best.map(|(_, candidate)| candidate)
}

/// 解析 srcset 属性
///
/// 按 HTML 的规则切分：地址一直延伸到空白处，只有描述符之后的逗号才分隔条目，
/// 因此 `_CR,0,0,342,445_` 这类带逗号的地址保持完整。`w` 描述符作为声明宽度
pub fn parse_srcset(srcset: &str) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    let mut rest = srcset;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_ascii_whitespace() || c == ',');
        if rest.is_empty() {
            break;
        }

        let url_end = rest
            .find(|c: char| c.is_ascii_whitespace())
            .unwrap_or(rest.len());
        let (raw_url, after) = rest.split_at(url_end);

        // 地址以逗号结尾时没有描述符
        let (url, descriptors) = if raw_url.ends_with(',') {
            rest = after;
            (raw_url.trim_end_matches(','), "")
        } else {
            let end = descriptor_end(after);
            rest = &after[end..];
            (raw_url, &after[..end])
        };

        if url.is_empty() {
            continue;
        }

        let width = descriptors
            .split_ascii_whitespace()
            .filter_map(|d| d.strip_suffix('w'))
            .find_map(|w| w.parse::<u32>().ok());
        candidates.push(Candidate::with_dimensions(url, width, None));
    }

    candidates
}

/// 描述符结束的位置：括号外的第一个逗号
fn descriptor_end(text: &str) -> usize {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return i,
            _ => {}
        }
    }
    text.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_amazon_image() {
        assert!(is_valid_image_url(
            "https://m.media-amazon.com/images/I/51Zymoq7UnL._SL1500_.jpg"
        ));
        assert!(is_valid_image_url(
            "https://images-na.ssl-images-amazon.com/images/I/81abc._AC_SX300_SY400_.jpg"
        ));
    }

    #[test]
    fn test_placeholders_rejected() {
        assert!(!is_valid_image_url(
            "https://images-na.ssl-images-amazon.com/images/G/01/x-locale/common/grey-pixel.gif"
        ));
        assert!(!is_valid_image_url(
            "https://m.media-amazon.com/images/G/01/loading-img.png"
        ));
        assert!(!is_valid_image_url(
            "https://m.media-amazon.com/images/I/no-image-available.jpg"
        ));
    }

    #[test]
    fn test_non_amazon_host_rejected() {
        assert!(!is_valid_image_url("https://example.com/images/cover.jpg"));
    }

    #[test]
    fn test_missing_extension_rejected() {
        assert!(!is_valid_image_url("https://www.amazon.com/dp/B00BD1Q0IQ"));
        assert!(is_valid_image_url(
            "https://images-amazon.com/images/P/B00BD1Q0IQ"
        ));
    }

    #[test]
    fn test_tiny_encoded_size_rejected() {
        assert!(!is_valid_image_url(
            "https://m.media-amazon.com/images/I/51abc._SX38_SY50_.jpg"
        ));
        // 只编码了一个方向时不做限制
        assert!(is_valid_image_url(
            "https://m.media-amazon.com/images/I/51abc._SX38_.jpg"
        ));
    }

    #[test]
    fn test_relative_and_unsupported_urls() {
        assert!(!is_valid_image_url("/images/I/51abc.jpg"));
        assert!(!is_valid_image_url("ftp://m.media-amazon.com/images/I/51abc.jpg"));
    }

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://www.amazon.com/dp/B00BD1Q0IQ").unwrap();

        assert_eq!(
            resolve_url("//m.media-amazon.com/images/I/a.jpg", Some(&base)).as_deref(),
            Some("https://m.media-amazon.com/images/I/a.jpg")
        );
        assert_eq!(
            resolve_url("/images/I/a.jpg", Some(&base)).as_deref(),
            Some("https://www.amazon.com/images/I/a.jpg")
        );
        assert_eq!(
            resolve_url("  https://m.media-amazon.com/images/I/a.jpg ", None).as_deref(),
            Some("https://m.media-amazon.com/images/I/a.jpg")
        );
        assert_eq!(
            resolve_url("//m.media-amazon.com/images/I/a.jpg", None).as_deref(),
            Some("https://m.media-amazon.com/images/I/a.jpg")
        );
        assert_eq!(resolve_url("data:image/gif;base64,R0lGOD", Some(&base)), None);
        assert_eq!(resolve_url("", Some(&base)), None);
        assert_eq!(resolve_url("javascript:void(0)", Some(&base)), None);
        assert_eq!(resolve_url("/images/I/a.jpg", None), None);
    }

    #[test]
    fn test_declared_area_sources() {
        assert_eq!(
            Candidate::with_dimensions("x", Some(300), Some(400)).declared_area(),
            120_000
        );
        assert_eq!(Candidate::with_dimensions("x", Some(500), None).declared_area(), 250_000);
        assert_eq!(Candidate::new("a._SL1500_.jpg").declared_area(), 2_250_000);
        assert_eq!(Candidate::new("a._SX300_SY400_.jpg").declared_area(), 120_000);
        assert_eq!(Candidate::new("a.jpg").declared_area(), 0);
    }

    #[test]
    fn test_pick_largest_prefers_area() {
        let picked = pick_largest(vec![
            Candidate::new("a._SX300_.jpg"),
            Candidate::new("b._SL1500_.jpg"),
            Candidate::new("c._SY500_.jpg"),
        ])
        .unwrap();
        assert_eq!(picked.url, "b._SL1500_.jpg");
    }

    #[test]
    fn test_pick_largest_ties_keep_first() {
        let picked = pick_largest(vec![
            Candidate::new("first.jpg"),
            Candidate::new("second.jpg"),
        ])
        .unwrap();
        assert_eq!(picked.url, "first.jpg");

        assert!(pick_largest(Vec::new()).is_none());
    }

    #[test]
    fn test_parse_srcset() {
        let candidates = parse_srcset(
            "https://m.media-amazon.com/a._SX200_.jpg 200w, https://m.media-amazon.com/a._SX600_.jpg 600w",
        );
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].width, Some(600));

        let density = parse_srcset("https://m.media-amazon.com/a.jpg 2x");
        assert_eq!(density[0].width, None);
    }

    #[test]
    fn test_parse_srcset_keeps_commas_in_urls() {
        let candidates = parse_srcset(
            "https://m.media-amazon.com/images/I/51X._SX342_SY445_CR,0,0,342,445_.jpg 1x, \
             https://m.media-amazon.com/images/I/51X._SX684_SY890_CR,0,0,684,890_.jpg 2x",
        );
        let urls: Vec<&str> = candidates.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://m.media-amazon.com/images/I/51X._SX342_SY445_CR,0,0,342,445_.jpg",
                "https://m.media-amazon.com/images/I/51X._SX684_SY890_CR,0,0,684,890_.jpg",
            ]
        );
    }

    #[test]
    fn test_parse_srcset_without_descriptors() {
        let candidates = parse_srcset("a.jpg, b.jpg 300w,, c.jpg");
        let urls: Vec<&str> = candidates.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["a.jpg", "b.jpg", "c.jpg"]);
        assert_eq!(candidates[1].width, Some(300));

        assert!(parse_srcset("  , ,").is_empty());
    }
}
