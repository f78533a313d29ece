//! 图片下载服务 - 业务能力层
//!
//! 只负责"把一个 URL 下载到图片目录"能力，不关心图片表和流程

use futures::StreamExt;
use reqwest::Response;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::error::DownloadError;
use crate::infrastructure::ImageSession;

/// 每次写入磁盘的最大字节数
const CHUNK_SIZE: usize = 4096;

/// 图片下载服务
///
/// 职责：
/// - 从 URL 路径推导本地文件名
/// - 流式下载并分块写入临时文件，完成后重命名为最终文件名
/// - 失败时返回 [`DownloadError`]，由调用方记录日志
#[derive(Clone)]
pub struct ImageFetcher {
    session: ImageSession,
    image_dir: PathBuf,
}

impl ImageFetcher {
    pub fn new(session: ImageSession, image_dir: impl Into<PathBuf>) -> Self {
        Self {
            session,
            image_dir: image_dir.into(),
        }
    }

    /// 下载图片，成功时返回保存的文件名
    pub async fn fetch(&self, url: &str) -> Result<String, DownloadError> {
        let file_name = file_name_from_url(url).ok_or_else(|| DownloadError::NoFileName {
            url: url.to_string(),
        })?;

        let response = self
            .session
            .get(url)
            .await
            .map_err(|source| DownloadError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::BadStatus {
                url: url.to_string(),
                status,
            });
        }

        // 同名下载各写各的临时文件，重命名是原子的，最后完成的那个生效
        let part_path = self
            .image_dir
            .join(format!(".{}.{}.part", file_name, Uuid::new_v4().simple()));
        let path = self.image_dir.join(&file_name);

        let saved = match write_body(url, &part_path, response).await {
            Ok(()) => tokio::fs::rename(&part_path, &path)
                .await
                .map_err(|source| DownloadError::Write {
                    path: path.clone(),
                    source,
                }),
            Err(e) => Err(e),
        };

        if let Err(e) = saved {
            if let Err(remove_err) = tokio::fs::remove_file(&part_path).await {
                debug!("清理临时文件失败 {}: {}", part_path.display(), remove_err);
            }
            return Err(e);
        }

        debug!("已保存图片 {}", file_name);
        Ok(file_name)
    }
}

/// 把响应体分块写入文件
async fn write_body(url: &str, path: &Path, response: Response) -> Result<(), DownloadError> {
    let write_err = |source: std::io::Error| DownloadError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::create(path).await.map_err(write_err)?;
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|source| DownloadError::Request {
            url: url.to_string(),
            source,
        })?;
        for part in chunk.chunks(CHUNK_SIZE) {
            file.write_all(part).await.map_err(write_err)?;
        }
    }

    file.flush().await.map_err(write_err)?;
    Ok(())
}

/// 由 URL 路径推导文件名：去掉首尾 `/` 后用 `-` 连接各段
///
/// 不同主机上路径相同的图片会得到同一个文件名，后完成的会整体覆盖先完成的。
pub fn file_name_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let name = parsed
        .path()
        .trim_matches('/')
        .split('/')
        .collect::<Vec<_>>()
        .join("-");

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}
