//! 连接上收发的消息格式

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::job::JobRequest;
use crate::error::{AppError, AppResult};

pub const ACK_MESSAGE: &str = "job queued at server-side. processing...";
pub const COMPLETE_MESSAGE: &str = "processing complete";
/// 对客户端只暴露笼统的失败信息，具体原因只写日志
pub const JOB_FAILED_MESSAGE: &str = "processing failed";
pub const MALFORMED_REQUEST_MESSAGE: &str = "malformed request";
pub const JOB_IN_PROGRESS_MESSAGE: &str = "a job is already being processed on this connection";

/// INIT 消息的有效负载
#[derive(Debug, Clone, Deserialize)]
pub struct InitPayload {
    pub inputs: JobRequest,
    /// 地点记录保持原始 JSON，结构校验交给表格化步骤
    pub output: Vec<Value>,
}

/// 入站消息
#[derive(Debug, Clone)]
pub enum Inbound {
    Init(InitPayload),
    /// 原样回显的文本
    Echo(String),
    KeepAlive,
    Unknown(String),
}

impl Inbound {
    /// 解析一条文本消息
    pub fn parse(text: &str) -> AppResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| AppError::MalformedRequest(format!("不是合法的 JSON: {}", e)))?;

        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::MalformedRequest("缺少 type 字段".to_string()))?;

        match kind {
            "INIT" => {
                let payload: InitPayload = serde_json::from_value(value)
                    .map_err(|e| AppError::MalformedRequest(e.to_string()))?;
                Ok(Inbound::Init(payload))
            }
            "ECHO" => Ok(Inbound::Echo(text.to_string())),
            "KEEPALIVE" => Ok(Inbound::KeepAlive),
            other => Ok(Inbound::Unknown(other.to_string())),
        }
    }
}

/// 出站状态消息类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusKind {
    Ack,
    Complete,
    Error,
}

/// 出站状态消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    #[serde(rename = "type")]
    pub kind: StatusKind,
    pub message: String,
}

impl StatusMessage {
    pub fn ack() -> Self {
        Self::new(StatusKind::Ack, ACK_MESSAGE)
    }

    pub fn complete() -> Self {
        Self::new(StatusKind::Complete, COMPLETE_MESSAGE)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(StatusKind::Error, message)
    }

    fn new(kind: StatusKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
