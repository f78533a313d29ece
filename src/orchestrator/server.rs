//! 服务入口 - 编排层
//!
//! 监听端口，每个连接分配一个 tokio 任务和一个 [`JobHandler`]。

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tracing::{info, warn};

use crate::config::Config;
use crate::orchestrator::job_handler::JobHandler;
use crate::utils::logging::log_startup;
use crate::workflow::JobFlow;

/// WebSocket 服务
pub struct Server {
    config: Config,
    listener: TcpListener,
}

impl Server {
    /// 按配置绑定监听地址
    pub async fn bind(config: Config) -> Result<Self> {
        let addr = config.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("无法监听地址: {}", addr))?;
        Ok(Self { config, listener })
    }

    /// 使用已绑定的监听器（测试中绑定随机端口）
    pub fn from_listener(listener: TcpListener, config: Config) -> Self {
        Self { config, listener }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// 接受连接，直到监听器出错
    pub async fn run(self) -> Result<()> {
        log_startup(&self.config);

        let ws_config = WebSocketConfig {
            max_message_size: Some(self.config.max_inbound_message_bytes),
            max_frame_size: Some(self.config.max_inbound_message_bytes),
            ..Default::default()
        };
        let flow = JobFlow::new(self.config.clone());

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("接受连接失败: {}", e);
                    continue;
                }
            };

            let flow = flow.clone();
            tokio::spawn(async move {
                handle_connection(stream, peer, ws_config, flow).await;
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    ws_config: WebSocketConfig,
    flow: JobFlow,
) {
    let ws = match tokio_tungstenite::accept_async_with_config(stream, Some(ws_config)).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket 握手失败 ({}): {}", peer, e);
            return;
        }
    };

    let conn_id = uuid::Uuid::new_v4().to_string();
    info!(conn_id = %conn_id, "🔌 新连接: {}", peer);

    JobHandler::new(conn_id, flow).serve(ws).await;
}
