//! 表格化服务 - 业务能力层
//!
//! 只负责把"地点 → 评论 → 图片"的嵌套结构拆成评论表和图片表

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ImageRow, ImageTable, PlaceRecord, ReviewRow, ReviewTable};

/// 展开后被移出评论表的字段
const IMAGES_KEY: &str = "images";

/// 把地点记录展开成 (评论表, 图片表)
///
/// - 没有评论的地点整体跳过
/// - 每条评论分配一个新的 `review_id`，图片行通过它关联评论行
/// - 两张表都为空表示"没有可导出的内容"，不是错误
pub fn flatten(places: &[Value]) -> AppResult<(ReviewTable, ImageTable)> {
    let mut reviews = ReviewTable::new();
    let mut images = ImageTable::new();

    for (place_index, raw) in places.iter().enumerate() {
        let place: PlaceRecord = serde_json::from_value(raw.clone())
            .map_err(|e| AppError::malformed_record(place_index, e.to_string()))?;

        if place.reviews.is_empty() {
            debug!("地点 #{} ({}) 没有评论，跳过", place_index, place.name);
            continue;
        }

        for mut fields in place.reviews.iter().cloned() {
            let review_id = Uuid::new_v4();

            match fields.shift_remove(IMAGES_KEY) {
                None | Some(Value::Null) => {}
                Some(Value::Array(sets)) => {
                    for set in sets {
                        match set {
                            Value::Object(candidates) => {
                                images.push(ImageRow::new(review_id, candidates))
                            }
                            other => {
                                return Err(AppError::malformed_record(
                                    place_index,
                                    format!("图片候选集不是对象: {}", other),
                                ))
                            }
                        }
                    }
                }
                Some(other) => {
                    return Err(AppError::malformed_record(
                        place_index,
                        format!("images 字段不是数组: {}", other),
                    ))
                }
            }

            reviews.push(ReviewRow {
                review_id,
                fields,
                place_name: place.name.clone(),
                place_location: place.place_location.clone(),
                place_type: place.place_type.clone(),
                lat: place.place_coords.map(|c| c.lat),
                lng: place.place_coords.map(|c| c.lng),
                place_url: place.url.clone(),
            });
        }
    }

    debug!("表格化完成: {} 条评论, {} 张图片", reviews.len(), images.len());

    Ok((reviews, images))
}
