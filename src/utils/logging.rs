/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use tracing::info;

use crate::config::Config;
use crate::workflow::{JobCtx, JobReport};

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 服务启动 - 评论导出模式");
    info!("🔌 监听地址: ws://{}", config.listen_addr());
    info!("📁 输出目录: {}", config.output_root.display());
    info!("📊 单任务最大并发下载数: {}", config.max_concurrent_downloads);
    info!("{}", "=".repeat(60));
}

/// 记录任务开始信息
pub fn log_job_start(ctx: &JobCtx, place_count: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 {} 开始处理", ctx);
    info!("📄 地点数量: {} | 保存图片: {}", place_count, ctx.save_images);
    info!("{}", "=".repeat(60));
}

/// 打印任务完成统计
pub fn log_job_report(ctx: &JobCtx, report: &JobReport) {
    info!("\n{}", "─".repeat(60));
    info!("📊 {} 处理完成", ctx);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("📝 评论: {} 条 | 🖼️ 图片: {} 张", report.reviews, report.images);
    if ctx.save_images {
        info!("✅ 下载成功: {} | ❌ 下载失败: {}", report.downloaded, report.failed_downloads);
    }
    match &report.artifact {
        Some(path) => info!("💾 结果已保存至: {}", path.display()),
        None => info!("💡 没有可导出的评论，未生成表格文件"),
    }
    info!("{}", "─".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
