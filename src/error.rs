use std::path::PathBuf;
use thiserror::Error;

/// 应用程序错误类型
///
/// 除 [`DownloadError`] 外，任务内出现的任何错误都会升级为任务级 `ERROR`。
#[derive(Debug, Error)]
pub enum AppError {
    /// INIT 消息缺少必需字段或无法解析
    #[error("请求格式错误: {0}")]
    MalformedRequest(String),

    /// 地点/评论记录不符合表格化的结构要求
    #[error("记录格式错误 (地点 #{place_index}): {reason}")]
    MalformedRecord { place_index: usize, reason: String },

    /// 表格文件导出失败
    #[error("导出失败 ({}): {source}", .path.display())]
    Export {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// 处理中又收到 INIT
    #[error("协议违例: 当前连接已有任务在处理中")]
    ProtocolViolation,

    /// 文件操作错误
    #[error("文件错误 ({}): {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON 序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket 传输层错误
    #[error("传输错误: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// HTTP 客户端创建失败
    #[error("HTTP客户端错误: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// 下载并发控制失效
    #[error("并发控制错误: {0}")]
    Concurrency(#[from] tokio::sync::AcquireError),

    /// 后台任务异常退出
    #[error("任务执行失败: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// 单张图片下载错误
///
/// 只在图片级别记录（`file_name` 置空），不会导致整个任务失败。
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("请求失败 ({url}): {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("CDN 返回非成功状态 ({url}): {status}")]
    BadStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("写入文件失败 ({}): {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("无法从 URL 推导文件名: {url}")]
    NoFileName { url: String },
}

/// 图片 URL 升级错误
#[derive(Debug, Error)]
pub enum UrlUpgradeError {
    #[error("无法解析 URL ({url}): {source}")]
    Parse {
        url: String,
        source: url::ParseError,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件操作错误
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.into(),
            source,
        }
    }

    /// 创建记录格式错误
    pub fn malformed_record(place_index: usize, reason: impl Into<String>) -> Self {
        AppError::MalformedRecord {
            place_index,
            reason: reason.into(),
        }
    }

    /// 创建导出错误
    pub fn export_failed(
        path: impl Into<PathBuf>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Export {
            path: path.into(),
            source: Box::new(source),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
