//! 连接处理器 - 编排层
//!
//! ## 职责
//!
//! 每个连接一个处理器，负责：
//!
//! 1. **消息分发**：INIT / ECHO / KEEPALIVE
//! 2. **任务准入**：同一连接同一时间最多一个任务
//! 3. **状态回报**：ACK → COMPLETE / ERROR
//!
//! ## 状态机
//!
//! ```text
//! Idle --INIT--> Processing --任务结束--> Idle
//!   \                |
//!    +---断开--------+------> Closed
//! ```
//!
//! 任务在独立的 tokio 任务中运行，连接任务通过 `select!` 同时等待任务结果和新消息。
//! 处理中断开连接时，任务在后台继续跑完，结果只写日志。

use futures::{Sink, SinkExt, StreamExt};
use std::fmt::Display;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::{JoinError, JoinHandle};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, trace, warn};

use crate::error::AppError;
use crate::models::message::{JOB_FAILED_MESSAGE, JOB_IN_PROGRESS_MESSAGE, MALFORMED_REQUEST_MESSAGE};
use crate::models::{Inbound, InitPayload, StatusMessage};
use crate::utils::logging::truncate_text;
use crate::workflow::job_ctx::job_dir_name;
use crate::workflow::{JobFlow, JobOutcome};

/// 连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    Idle,
    Processing,
    Closed,
}

/// 收到一条消息后要执行的动作
#[derive(Debug)]
pub enum Action {
    /// 发送状态消息
    Send(StatusMessage),
    /// 原样回显
    Echo(String),
    /// 发送 ACK 并启动任务
    StartJob(InitPayload),
    Ignore,
}

/// 连接处理器
pub struct JobHandler {
    conn_id: String,
    state: HandlerState,
    flow: JobFlow,
}

impl JobHandler {
    pub fn new(conn_id: impl Into<String>, flow: JobFlow) -> Self {
        Self {
            conn_id: conn_id.into(),
            state: HandlerState::Idle,
            flow,
        }
    }

    pub fn state(&self) -> HandlerState {
        self.state
    }

    /// 处理一条文本消息，返回要执行的动作
    pub fn on_text(&mut self, text: &str) -> Action {
        let inbound = match Inbound::parse(text) {
            Ok(inbound) => inbound,
            Err(e) => {
                warn!(conn_id = %self.conn_id, "拒绝消息: {} ({})", e, truncate_text(text, 80));
                return Action::Send(StatusMessage::error(MALFORMED_REQUEST_MESSAGE));
            }
        };

        match inbound {
            Inbound::Init(_) if self.state == HandlerState::Processing => {
                warn!(conn_id = %self.conn_id, "{}", AppError::ProtocolViolation);
                Action::Send(StatusMessage::error(JOB_IN_PROGRESS_MESSAGE))
            }
            Inbound::Init(payload) => {
                if let Err(e) = job_dir_name(&payload.inputs) {
                    warn!(conn_id = %self.conn_id, "拒绝任务: {}", e);
                    return Action::Send(StatusMessage::error(MALFORMED_REQUEST_MESSAGE));
                }
                info!(
                    conn_id = %self.conn_id,
                    "📥 收到任务: 关键词 {} | {} 个地点",
                    payload.inputs.keyword,
                    payload.output.len()
                );
                self.state = HandlerState::Processing;
                Action::StartJob(payload)
            }
            Inbound::Echo(raw) => Action::Echo(raw),
            Inbound::KeepAlive => {
                trace!(conn_id = %self.conn_id, "KEEPALIVE");
                Action::Ignore
            }
            Inbound::Unknown(kind) => {
                warn!(conn_id = %self.conn_id, "忽略未知消息类型: {}", kind);
                Action::Ignore
            }
        }
    }

    /// 任务结束，返回要发送的终态消息
    pub fn on_job_finished(&mut self, result: Result<JobOutcome, JoinError>) -> StatusMessage {
        self.state = HandlerState::Idle;
        match result {
            Ok(JobOutcome::Complete(_)) => StatusMessage::complete(),
            Ok(JobOutcome::Error(_)) => StatusMessage::error(JOB_FAILED_MESSAGE),
            Err(e) => {
                error!(conn_id = %self.conn_id, "任务执行失败: {}", e);
                StatusMessage::error(JOB_FAILED_MESSAGE)
            }
        }
    }

    pub fn on_disconnect(&mut self) {
        self.state = HandlerState::Closed;
    }

    /// 在一个 WebSocket 连接上运行消息循环，直到连接断开
    pub async fn serve<S>(mut self, ws: WebSocketStream<S>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (mut sink, mut stream) = ws.split();
        let mut job: Option<JoinHandle<JobOutcome>> = None;

        loop {
            tokio::select! {
                result = join_job(&mut job), if job.is_some() => {
                    job = None;
                    let status = self.on_job_finished(result);
                    send_status(&mut sink, &self.conn_id, &status).await;
                }
                incoming = stream.next() => match incoming {
                    Some(Ok(Message::Text(text))) => match self.on_text(&text) {
                        Action::Send(status) => send_status(&mut sink, &self.conn_id, &status).await,
                        Action::Echo(raw) => send_text(&mut sink, &self.conn_id, raw).await,
                        Action::StartJob(payload) => {
                            send_status(&mut sink, &self.conn_id, &StatusMessage::ack()).await;
                            let flow = self.flow.clone();
                            job = Some(tokio::spawn(async move {
                                flow.run(payload.inputs, payload.output).await
                            }));
                        }
                        Action::Ignore => {}
                    },
                    Some(Ok(Message::Binary(data))) => {
                        warn!(conn_id = %self.conn_id, "忽略二进制消息 ({} 字节)", data.len());
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        self.on_disconnect();
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(conn_id = %self.conn_id, "接收消息失败: {}", e);
                        self.on_disconnect();
                        break;
                    }
                },
            }
        }

        if job.is_some() {
            info!(conn_id = %self.conn_id, "连接已断开，任务将在后台继续运行");
        }
        info!(conn_id = %self.conn_id, "🔌 连接已关闭");
    }
}

async fn join_job(job: &mut Option<JoinHandle<JobOutcome>>) -> Result<JobOutcome, JoinError> {
    match job {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

async fn send_status<K>(sink: &mut K, conn_id: &str, status: &StatusMessage)
where
    K: Sink<Message> + Unpin,
    K::Error: Display,
{
    match status.to_json() {
        Ok(json) => send_text(sink, conn_id, json).await,
        Err(e) => error!(conn_id = %conn_id, "状态消息序列化失败: {}", e),
    }
}

async fn send_text<K>(sink: &mut K, conn_id: &str, text: String)
where
    K: Sink<Message> + Unpin,
    K::Error: Display,
{
    if let Err(e) = sink.send(Message::Text(text)).await {
        warn!(conn_id = %conn_id, "发送消息失败（连接可能已断开）: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::StatusKind;
    use crate::workflow::JobReport;

    fn handler() -> JobHandler {
        JobHandler::new("test", JobFlow::new(Config::default()))
    }

    const INIT: &str = r#"{
        "type": "INIT",
        "inputs": {"keyword": "darjeeling", "saveImages": false, "maxPlaces": 1, "maxReviews": 1},
        "output": []
    }"#;

    #[test]
    fn test_init_starts_job_when_idle() {
        let mut handler = handler();

        assert!(matches!(handler.on_text(INIT), Action::StartJob(_)));
        assert_eq!(handler.state(), HandlerState::Processing);
    }

    #[test]
    fn test_second_init_is_rejected_while_processing() {
        let mut handler = handler();
        handler.on_text(INIT);

        match handler.on_text(INIT) {
            Action::Send(status) => assert_eq!(status.kind, StatusKind::Error),
            other => panic!("应该拒绝第二个 INIT: {:?}", other),
        }
        assert_eq!(handler.state(), HandlerState::Processing);
    }

    #[test]
    fn test_malformed_init_keeps_idle() {
        let mut handler = handler();

        match handler.on_text(r#"{"type": "INIT", "inputs": {}}"#) {
            Action::Send(status) => {
                assert_eq!(status.kind, StatusKind::Error);
                assert_eq!(status.message, MALFORMED_REQUEST_MESSAGE);
            }
            other => panic!("应该返回 ERROR: {:?}", other),
        }
        assert_eq!(handler.state(), HandlerState::Idle);
    }

    #[test]
    fn test_unusable_keyword_is_rejected_before_ack() {
        let mut handler = handler();
        let init = INIT.replace(r#""keyword": "darjeeling""#, r#""keyword": "..""#);

        match handler.on_text(&init) {
            Action::Send(status) => {
                assert_eq!(status.kind, StatusKind::Error);
                assert_eq!(status.message, MALFORMED_REQUEST_MESSAGE);
            }
            other => panic!("不应启动任务: {:?}", other),
        }
        assert_eq!(handler.state(), HandlerState::Idle);
    }

    #[test]
    fn test_echo_and_keepalive() {
        let mut handler = handler();
        let echo = r#"{"type":"ECHO","n":1}"#;

        assert!(matches!(handler.on_text(echo), Action::Echo(raw) if raw == echo));
        assert!(matches!(handler.on_text(r#"{"type":"KEEPALIVE"}"#), Action::Ignore));
        assert!(matches!(handler.on_text(r#"{"type":"WHATEVER"}"#), Action::Ignore));
        assert_eq!(handler.state(), HandlerState::Idle);
    }

    #[test]
    fn test_job_finished_returns_to_idle() {
        let mut handler = handler();
        handler.on_text(INIT);

        let status = handler.on_job_finished(Ok(JobOutcome::Complete(JobReport::default())));
        assert_eq!(status, StatusMessage::complete());
        assert_eq!(handler.state(), HandlerState::Idle);

        handler.on_text(INIT);
        let status = handler.on_job_finished(Ok(JobOutcome::Error(AppError::ProtocolViolation)));
        assert_eq!(status.kind, StatusKind::Error);
        assert_eq!(status.message, JOB_FAILED_MESSAGE);
        assert_eq!(handler.state(), HandlerState::Idle);
    }

    #[test]
    fn test_disconnect_closes() {
        let mut handler = handler();
        handler.on_disconnect();
        assert_eq!(handler.state(), HandlerState::Closed);
    }
}
