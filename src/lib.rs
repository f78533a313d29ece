//! # Review Exporter
//!
//! 接收浏览器插件抓取到的"地点 + 评论"数据，整理成表格并下载评论图片的 WebSocket 服务
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（HTTP 连接池），只暴露能力
//! - `ImageSession` - 每个任务一个，所有图片请求共享
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不关心流程
//! - `tabulator` - 嵌套记录 → 评论表 + 图片表
//! - `image_resolver` - 选出最佳图片 URL 并升级分辨率
//! - `ImageFetcher` - 下载单张图片
//! - `archive_writer` / `workbook_writer` - 写原始数据和 xlsx
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个任务"的完整处理流程
//! - `JobCtx` - 上下文封装（输出目录 + 文件基础名）
//! - `JobFlow` - 流程编排（归档 → 表格化 → 图片 → 导出）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/server` - 监听端口，每个连接一个任务
//! - `orchestrator/job_handler` - 单个连接的状态机
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult, DownloadError};
pub use infrastructure::ImageSession;
pub use models::{JobRequest, StatusKind, StatusMessage};
pub use orchestrator::{JobHandler, Server};
pub use workflow::{JobCtx, JobFlow, JobOutcome, JobReport};
