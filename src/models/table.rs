use serde_json::{Map, Value};
use uuid::Uuid;

use super::job::ImageCandidateSet;

/// 评论表中的一行
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRow {
    pub review_id: Uuid,
    /// 评论原始字段（不含 `images`）
    pub fields: Map<String, Value>,
    pub place_name: String,
    pub place_location: Option<String>,
    pub place_type: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub place_url: String,
}

/// 图片表中的一行
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRow {
    pub review_id: Uuid,
    /// 原始描述符列
    pub candidates: ImageCandidateSet,
    /// 解析并升级后的最佳 URL
    pub url: Option<String>,
    /// 本地文件名，下载失败或未下载时为空
    pub file_name: String,
}

impl ImageRow {
    pub fn new(review_id: Uuid, candidates: ImageCandidateSet) -> Self {
        Self {
            review_id,
            candidates,
            url: None,
            file_name: String::new(),
        }
    }
}

pub type ReviewTable = Vec<ReviewRow>;
pub type ImageTable = Vec<ImageRow>;
