use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 任务请求参数
///
/// `max_places` / `max_reviews` 在抓取端已经生效，这里只用于生成文件名。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    pub keyword: String,
    pub save_images: bool,
    pub max_places: u32,
    pub max_reviews: u32,
}

/// 地点坐标
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaceCoords {
    pub lat: f64,
    pub lng: f64,
}

/// 一个抓取到的地点
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRecord {
    pub name: String,
    pub place_type: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_coords: Option<PlaceCoords>,
    pub reviews: Vec<Map<String, Value>>,
}

/// 一张图片的候选集合，形如 `{"480w": url, "960w": url}` 或 `{"url": url}`
///
/// 键的声明顺序需要保留（同等级描述符取先声明者），依赖 `serde_json` 的
/// `preserve_order` 特性。
pub type ImageCandidateSet = Map<String, Value>;
