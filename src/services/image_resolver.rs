//! 图片解析服务 - 业务能力层
//!
//! 负责从响应式图片候选集中挑出画质最高的 URL，并把它改写为向 CDN 请求最大分辨率。
//!
//! 候选集的键即描述符：
//! - `480w` - 宽度描述符
//! - `2x` / `1.5x` - 像素密度描述符
//! - `url` - 没有描述符的裸 URL

use serde_json::Value;
use url::Url;

use crate::error::UrlUpgradeError;
use crate::models::ImageCandidateSet;

/// 裸 URL 所在的列名
const BARE_URL_KEY: &str = "url";

/// 描述符类型
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Descriptor {
    Width(u64),
    Density(f64),
}

impl Descriptor {
    /// 解析描述符列名，不是描述符时返回 None
    pub fn parse(key: &str) -> Option<Self> {
        if let Some(width) = key.strip_suffix('w') {
            return width.parse().ok().map(Descriptor::Width);
        }
        if let Some(density) = key.strip_suffix('x') {
            return density
                .parse::<f64>()
                .ok()
                .filter(|d| d.is_finite())
                .map(Descriptor::Density);
        }
        None
    }
}

/// 选出候选集中最佳的 URL
///
/// 优先级：裸 `url` > 最大宽度描述符 > 最大密度描述符。
/// 同一组内取数值最大的非空候选，数值相同时保留先声明的那个。
pub fn resolve_best_url(candidates: &ImageCandidateSet) -> Option<String> {
    if let Some(url) = non_empty_str(candidates.get(BARE_URL_KEY)) {
        return Some(url.to_string());
    }

    let mut best_width: Option<(u64, &str)> = None;
    let mut best_density: Option<(f64, &str)> = None;

    for (key, value) in candidates {
        let Some(url) = non_empty_str(Some(value)) else {
            continue;
        };
        match Descriptor::parse(key) {
            Some(Descriptor::Width(w)) if best_width.map_or(true, |(bw, _)| w > bw) => {
                best_width = Some((w, url));
            }
            Some(Descriptor::Density(d)) if best_density.map_or(true, |(bd, _)| d > bd) => {
                best_density = Some((d, url));
            }
            _ => {}
        }
    }

    best_width
        .map(|(_, url)| url)
        .or(best_density.map(|(_, url)| url))
        .map(str::to_string)
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// 把 URL 中的宽度参数改写为最大分辨率
///
/// 带 `w` 参数时改写为 `w=<max_resolution>&h=-1`（-1 表示按比例自适应），
/// 其他参数保持原顺序；不带 `w` 参数时原样返回。
pub fn upgrade(url: &str, max_resolution: u32) -> Result<String, UrlUpgradeError> {
    let mut parsed = Url::parse(url).map_err(|source| UrlUpgradeError::Parse {
        url: url.to_string(),
        source,
    })?;

    // 重复的键只保留第一个值
    let mut params: Vec<(String, String)> = Vec::new();
    for (key, value) in parsed.query_pairs() {
        if !params.iter().any(|(k, _)| *k == key) {
            params.push((key.into_owned(), value.into_owned()));
        }
    }

    if !params.iter().any(|(k, _)| k == "w") {
        return Ok(url.to_string());
    }

    let width = max_resolution.to_string();
    let mut has_height = false;
    for (key, value) in params.iter_mut() {
        match key.as_str() {
            "w" => *value = width.clone(),
            "h" => {
                *value = "-1".to_string();
                has_height = true;
            }
            _ => {}
        }
    }
    if !has_height {
        params.push(("h".to_string(), "-1".to_string()));
    }

    parsed.set_fragment(None);
    parsed.query_pairs_mut().clear().extend_pairs(params);

    Ok(parsed.to_string())
}
