//! 任务处理流程 - 流程层
//!
//! 核心职责：定义"一个任务"的完整处理流程
//!
//! 流程顺序：
//! 1. 创建输出目录
//! 2. 生成文件基础名
//! 3. 归档原始数据（之后任何步骤失败，原始数据都可以重放）
//! 4. 表格化（没有评论时直接完成）
//! 5. 解析最佳图片 URL，按需下载图片
//! 6. 写出表格文件
//!
//! 任何一步出错都会转为 [`JobOutcome::Error`]，只有单张图片的下载失败会被吸收。

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::ImageSession;
use crate::models::{ImageTable, JobRequest};
use crate::services::{archive_writer, image_resolver, tabulator, workbook_writer, ImageFetcher};
use crate::utils::logging::{log_job_report, log_job_start};
use crate::workflow::job_ctx::JobCtx;

/// 任务处理结果
#[derive(Debug)]
pub enum JobOutcome {
    /// 处理成功
    Complete(JobReport),
    /// 处理失败，错误原因只用于日志
    Error(AppError),
}

impl JobOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, JobOutcome::Complete(_))
    }
}

/// 任务统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobReport {
    pub reviews: usize,
    pub images: usize,
    pub downloaded: usize,
    pub failed_downloads: usize,
    pub archive: PathBuf,
    /// 没有可导出内容时为 None
    pub artifact: Option<PathBuf>,
    /// 写入表格的图片行（含最终 URL 和文件名）
    pub image_rows: ImageTable,
}

/// 下载统计
#[derive(Debug, Default, Clone, Copy)]
struct DownloadStats {
    downloaded: usize,
    failed: usize,
}

/// 任务处理流程
///
/// - 编排完整的任务处理流程
/// - 每个任务独占自己的输出目录、表格和 HTTP 会话
/// - 只依赖业务能力（services）
#[derive(Clone)]
pub struct JobFlow {
    config: Config,
}

impl JobFlow {
    /// 创建新的任务处理流程
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// 运行任务，错误不会抛给调用方
    pub async fn run(&self, request: JobRequest, records: Vec<Value>) -> JobOutcome {
        let ctx = match JobCtx::new(&self.config.output_root, &request) {
            Ok(ctx) => ctx,
            Err(e) => {
                error!("[任务 {}] ❌ 无法创建任务上下文: {}", request.keyword, e);
                return JobOutcome::Error(e);
            }
        };

        log_job_start(&ctx, records.len());

        match self.process(&ctx, &request, &records).await {
            Ok(report) => {
                log_job_report(&ctx, &report);
                JobOutcome::Complete(report)
            }
            Err(e) => {
                error!("{} ❌ 处理过程中发生错误: {}", ctx, e);
                JobOutcome::Error(e)
            }
        }
    }

    /// 离线重放一个原始数据归档，按归档中的请求重新跑一遍完整流程
    pub async fn replay(&self, archive: &Path) -> JobOutcome {
        match archive_writer::read_archive(archive).await {
            Ok(job) => {
                info!("🔁 重放归档: {}", archive.display());
                self.run(job.inputs, job.output).await
            }
            Err(e) => {
                error!("❌ 无法读取归档 {}: {}", archive.display(), e);
                JobOutcome::Error(e)
            }
        }
    }

    async fn process(
        &self,
        ctx: &JobCtx,
        request: &JobRequest,
        records: &[Value],
    ) -> AppResult<JobReport> {
        // ========== 步骤 1: 输出目录（已存在时复用），步骤 2 的基础名已在 JobCtx 中生成 ==========
        tokio::fs::create_dir_all(&ctx.job_dir)
            .await
            .map_err(|e| AppError::io(&ctx.job_dir, e))?;

        // ========== 步骤 3: 归档原始数据 ==========
        let archive = ctx.archive_path();
        archive_writer::write_archive(&archive, request, records).await?;

        // ========== 步骤 4: 表格化 ==========
        let (reviews, mut images) = tabulator::flatten(records)?;

        let mut report = JobReport {
            reviews: reviews.len(),
            images: images.len(),
            archive,
            ..Default::default()
        };

        if reviews.is_empty() && images.is_empty() {
            return Ok(report);
        }

        // ========== 步骤 5: 图片 ==========
        resolve_urls(&mut images, self.config.max_image_resolution);

        if ctx.save_images {
            let image_dir = ctx.image_dir();
            tokio::fs::create_dir_all(&image_dir)
                .await
                .map_err(|e| AppError::io(&image_dir, e))?;

            let fetcher = ImageFetcher::new(ImageSession::new()?, image_dir);
            let stats = self.download_images(ctx, &fetcher, &mut images).await?;
            report.downloaded = stats.downloaded;
            report.failed_downloads = stats.failed;
        }

        // ========== 步骤 6: 导出表格 ==========
        let artifact = ctx.artifact_path();
        let sheets = workbook_writer::build_sheets(&reviews, &images);
        workbook_writer::write_workbook(&artifact, sheets).await?;
        report.artifact = Some(artifact);
        report.image_rows = images;

        Ok(report)
    }

    /// 并发下载所有已解析出 URL 的图片，全部结束后才返回
    async fn download_images(
        &self,
        ctx: &JobCtx,
        fetcher: &ImageFetcher,
        images: &mut ImageTable,
    ) -> AppResult<DownloadStats> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_downloads.max(1)));
        let mut handles = Vec::new();

        for (idx, row) in images.iter().enumerate() {
            let Some(url) = row.url.clone() else {
                continue;
            };
            let permit = semaphore.clone().acquire_owned().await?;
            let fetcher = fetcher.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let result = fetcher.fetch(&url).await;
                (url, result)
            });
            handles.push((idx, handle));
        }

        let mut stats = DownloadStats::default();

        for (idx, handle) in handles {
            match handle.await {
                Ok((_, Ok(file_name))) => {
                    images[idx].file_name = file_name;
                    stats.downloaded += 1;
                }
                Ok((url, Err(e))) => {
                    warn!("{} ⚠️ 图片下载失败 {}: {}", ctx, url, e);
                    stats.failed += 1;
                }
                Err(e) => {
                    error!("{} 图片下载任务执行失败: {}", ctx, e);
                    stats.failed += 1;
                }
            }
        }

        Ok(stats)
    }
}

/// 为每一行解析最佳 URL 并升级到最大分辨率
///
/// URL 无法升级时保留原 URL。
pub fn resolve_urls(images: &mut ImageTable, max_resolution: u32) {
    for row in images.iter_mut() {
        row.url = image_resolver::resolve_best_url(&row.candidates).map(|best| {
            match image_resolver::upgrade(&best, max_resolution) {
                Ok(upgraded) => upgraded,
                Err(e) => {
                    debug!("URL 升级失败，保留原 URL: {}", e);
                    best
                }
            }
        });
    }
}
