//! 原始数据归档服务 - 业务能力层
//!
//! 把任务的原始输入写成 JSON 文件，并能读回来离线重放

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::JobRequest;

#[derive(Serialize)]
struct RawArchive<'a> {
    inputs: &'a JobRequest,
    output: &'a [Value],
}

/// 从归档读回的任务
#[derive(Debug, Clone, Deserialize)]
pub struct ArchivedJob {
    pub inputs: JobRequest,
    pub output: Vec<Value>,
}

/// 写入原始数据归档（4 空格缩进）
pub async fn write_archive(path: &Path, inputs: &JobRequest, output: &[Value]) -> AppResult<()> {
    let bytes = to_pretty_json(&RawArchive { inputs, output })?;

    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| AppError::io(path, e))?;

    debug!("原始数据已归档: {}", path.display());
    Ok(())
}

/// 读取原始数据归档
pub async fn read_archive(path: &Path) -> AppResult<ArchivedJob> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| AppError::io(path, e))?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn to_pretty_json<T: Serialize>(value: &T) -> AppResult<Vec<u8>> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    Ok(buf)
}
