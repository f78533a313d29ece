//! 任务上下文
//!
//! 封装"这个任务的结果写到哪里、叫什么名字"这一信息

use regex::Regex;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::JobRequest;

/// 图片子目录名
pub const IMAGE_DIR_NAME: &str = "images";

/// 任务上下文
#[derive(Debug, Clone)]
pub struct JobCtx {
    /// 搜索关键词
    pub keyword: String,

    /// 输出目录 `<output_root>/<keyword>`
    pub job_dir: PathBuf,

    /// 文件基础名 `<slug>-<timestamp>-<随机后缀>`
    pub base_name: String,

    /// 是否下载图片
    pub save_images: bool,
}

impl JobCtx {
    /// 根据请求创建任务上下文（不创建目录）
    pub fn new(output_root: &Path, request: &JobRequest) -> AppResult<Self> {
        let dir_name = job_dir_name(request)?;

        let seed = format!(
            "{} maxPlaces {} maxReviews {}",
            request.keyword, request.max_places, request.max_reviews
        );
        let timestamp = chrono::Local::now().format("%Y%m%d%H%M%S%3f");
        // 同一毫秒内的相同请求也不能共用文件名
        let suffix = Uuid::new_v4().simple().to_string();

        Ok(Self {
            keyword: request.keyword.clone(),
            job_dir: output_root.join(dir_name),
            base_name: format!("{}-{}-{}", slugify(&seed), timestamp, &suffix[..8]),
            save_images: request.save_images,
        })
    }

    /// 原始数据归档路径
    pub fn archive_path(&self) -> PathBuf {
        self.job_dir.join(format!("{}.json", self.base_name))
    }

    /// 表格文件路径
    pub fn artifact_path(&self) -> PathBuf {
        self.job_dir.join(format!("{}.xlsx", self.base_name))
    }

    /// 图片目录
    pub fn image_dir(&self) -> PathBuf {
        self.job_dir.join(IMAGE_DIR_NAME)
    }
}

impl Display for JobCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[任务 {}#{}]", self.keyword, self.base_name)
    }
}

/// 转为小写并把非字母数字的连续字符替换为 `-`
pub fn slugify(text: &str) -> String {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    let re = NON_WORD.get_or_init(|| Regex::new(r"[^\p{L}\p{N}]+").expect("合法的正则表达式"));

    re.replace_all(&text.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

/// 请求对应的输出目录名，关键词无法用作目录名时返回 `MalformedRequest`
pub fn job_dir_name(request: &JobRequest) -> AppResult<String> {
    sanitize_dir_name(&request.keyword).ok_or_else(|| {
        AppError::MalformedRequest(format!("关键词无法用作目录名: {:?}", request.keyword))
    })
}

/// 把关键词处理成单层目录名，无法处理时返回 None
fn sanitize_dir_name(keyword: &str) -> Option<String> {
    let name: String = keyword
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    match name.as_str() {
        "" | "." | ".." => None,
        _ => Some(name),
    }
}
