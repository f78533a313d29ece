//! 图片会话 - 基础设施层
//!
//! 持有一个任务内共享的 HTTP 客户端（连接池），只暴露"发起 GET"的能力

use reqwest::{Client, Response};

/// 图片会话
///
/// 职责：
/// - 每个任务创建一次，所有图片请求复用同一个连接池
/// - 不认识图片表 / 文件名
/// - 不处理业务流程
///
/// 不设置请求超时，卡住的请求会一直占用一个下载名额。
#[derive(Clone)]
pub struct ImageSession {
    client: Client,
}

impl ImageSession {
    /// 创建新的会话
    pub fn new() -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// 发起 GET 请求，响应体由调用方以流的方式读取
    pub async fn get(&self, url: &str) -> reqwest::Result<Response> {
        self.client.get(url).send().await
    }
}
