//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责连接管理和任务调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `server` - 服务入口
//! - 监听端口，限制入站消息大小
//! - 每个连接一个 tokio 任务
//!
//! ### `job_handler` - 连接处理器
//! - 每个连接的 Idle / Processing / Closed 状态机
//! - 同一连接同一时间只允许一个任务
//! - 向客户端回报 ACK / COMPLETE / ERROR
//!
//! ## 层次关系
//!
//! ```text
//! server (处理多个连接)
//!     ↓
//! job_handler (处理单个连接上的消息)
//!     ↓
//! workflow::JobFlow (处理单个任务)
//!     ↓
//! services (能力层：tabulate / resolve / fetch / archive / export)
//!     ↓
//! infrastructure (基础设施：ImageSession)
//! ```

pub mod job_handler;
pub mod server;

// 重新导出主要类型
pub use job_handler::{HandlerState, JobHandler};
pub use server::Server;
