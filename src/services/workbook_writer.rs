//! 表格导出服务 - 业务能力层
//!
//! 把评论表和图片表渲染为一个多工作表的 xlsx 文件。空表不生成工作表。

use rust_xlsxwriter::Workbook;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::{ImageTable, ReviewTable};
use crate::utils::logging::truncate_text;

pub const REVIEW_SHEET: &str = "review";
pub const IMAGES_SHEET: &str = "images";

/// xlsx 单元格允许的最大字符数
const MAX_CELL_CHARS: usize = 32_767;

/// 由地点写入评论行的列，与评论自身的同名字段冲突时以地点为准
const PLACE_COLUMNS: [&str; 7] = [
    "place_name",
    "place_location",
    "place_type",
    "lat",
    "lng",
    "url",
    "review_id",
];

/// 图片表中追加在描述符列之后的列
const IMAGE_COLUMNS: [&str; 3] = ["review_id", "url", "file_name"];

/// 单元格
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl From<&Value> for Cell {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Empty,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Empty),
            Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }
}

impl From<Option<&str>> for Cell {
    fn from(value: Option<&str>) -> Self {
        value.map_or(Cell::Empty, |s| Cell::Text(s.to_string()))
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Empty, Cell::Number)
    }
}

/// 一个待写入的工作表
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// 按顺序收集所有行出现过的键（去重、保持首次出现顺序）
fn union_keys<'a>(maps: impl Iterator<Item = &'a serde_json::Map<String, Value>>, skip: &[&str]) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for map in maps {
        for key in map.keys() {
            if !skip.contains(&key.as_str()) && !keys.contains(key) {
                keys.push(key.clone());
            }
        }
    }
    keys
}

/// 评论表 → 工作表，空表返回 None
pub fn review_sheet(reviews: &ReviewTable) -> Option<Sheet> {
    if reviews.is_empty() {
        return None;
    }

    let field_keys = union_keys(reviews.iter().map(|r| &r.fields), &PLACE_COLUMNS);

    let rows = reviews
        .iter()
        .map(|review| {
            let mut row: Vec<Cell> = field_keys
                .iter()
                .map(|key| review.fields.get(key).map_or(Cell::Empty, Cell::from))
                .collect();
            row.extend([
                Cell::Text(review.place_name.clone()),
                Cell::from(review.place_location.as_deref()),
                Cell::Text(review.place_type.clone()),
                Cell::from(review.lat),
                Cell::from(review.lng),
                Cell::Text(review.place_url.clone()),
                Cell::Text(review.review_id.to_string()),
            ]);
            row
        })
        .collect();

    let mut headers = field_keys;
    headers.extend(PLACE_COLUMNS.iter().map(|c| c.to_string()));

    Some(Sheet {
        name: REVIEW_SHEET.to_string(),
        headers,
        rows,
    })
}

/// 图片表 → 工作表，空表返回 None
pub fn image_sheet(images: &ImageTable) -> Option<Sheet> {
    if images.is_empty() {
        return None;
    }

    let descriptor_keys = union_keys(images.iter().map(|i| &i.candidates), &IMAGE_COLUMNS);

    let rows = images
        .iter()
        .map(|image| {
            let mut row: Vec<Cell> = descriptor_keys
                .iter()
                .map(|key| image.candidates.get(key).map_or(Cell::Empty, Cell::from))
                .collect();
            row.extend([
                Cell::Text(image.review_id.to_string()),
                Cell::from(image.url.as_deref()),
                Cell::Text(image.file_name.clone()),
            ]);
            row
        })
        .collect();

    let mut headers = descriptor_keys;
    headers.extend(IMAGE_COLUMNS.iter().map(|c| c.to_string()));

    Some(Sheet {
        name: IMAGES_SHEET.to_string(),
        headers,
        rows,
    })
}

/// 生成全部非空工作表
pub fn build_sheets(reviews: &ReviewTable, images: &ImageTable) -> Vec<Sheet> {
    review_sheet(reviews)
        .into_iter()
        .chain(image_sheet(images))
        .collect()
}

/// 把工作表写成 xlsx 文件
///
/// 先在内存中生成完整文件，写入 `<path>.part` 后再重命名，失败时不会留下半成品。
pub async fn write_workbook(path: &Path, sheets: Vec<Sheet>) -> AppResult<()> {
    let render_path = path.to_path_buf();
    let bytes = tokio::task::spawn_blocking(move || render(&render_path, &sheets)).await??;

    let part_path = part_path(path);
    tokio::fs::write(&part_path, &bytes)
        .await
        .map_err(|e| AppError::export_failed(&part_path, e))?;

    if let Err(e) = tokio::fs::rename(&part_path, path).await {
        let _ = tokio::fs::remove_file(&part_path).await;
        return Err(AppError::export_failed(path, e));
    }

    debug!("表格已写入: {} ({} 字节)", path.display(), bytes.len());
    Ok(())
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn render(path: &Path, sheets: &[Sheet]) -> AppResult<Vec<u8>> {
    let export_err = |e: rust_xlsxwriter::XlsxError| AppError::export_failed(path, e);
    let index_err = |e: std::num::TryFromIntError| AppError::export_failed(path, e);

    let mut workbook = Workbook::new();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name).map_err(export_err)?;

        for (col, header) in sheet.headers.iter().enumerate() {
            let col = u16::try_from(col).map_err(index_err)?;
            worksheet.write_string(0, col, header.as_str()).map_err(export_err)?;
        }

        for (row_idx, row) in sheet.rows.iter().enumerate() {
            let row_num = u32::try_from(row_idx + 1).map_err(index_err)?;
            for (col, cell) in row.iter().enumerate() {
                let col = u16::try_from(col).map_err(index_err)?;
                match cell {
                    Cell::Empty => {}
                    Cell::Text(text) => {
                        let text = if text.chars().count() > MAX_CELL_CHARS {
                            truncate_text(text, MAX_CELL_CHARS - 3)
                        } else {
                            text.clone()
                        };
                        worksheet.write_string(row_num, col, text.as_str()).map_err(export_err)?;
                    }
                    Cell::Number(n) => {
                        worksheet.write_number(row_num, col, *n).map_err(export_err)?;
                    }
                    Cell::Bool(b) => {
                        worksheet.write_boolean(row_num, col, *b).map_err(export_err)?;
                    }
                }
            }
        }
    }

    workbook.save_to_buffer().map_err(export_err)
}
