//! 事件通道消息协议
//!
//! 入站：任务分配 `{taskId, description, whiteboard?}` 与控制消息 `{"type": "no_more_tasks" | "session_complete"}`；
//! 出站：以 `type` 为标签的 Worker 事件，每行一个 JSON（NDJSON）。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::TerminationReason;

/// 编排端分配的任务
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAssignment {
    pub task_id: String,
    pub description: String,
    /// 任务开始时的白板快照
    #[serde(default)]
    pub whiteboard: Option<String>,
}

/// 编排端控制消息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    NoMoreTasks,
    SessionComplete,
}

impl ControlMessage {
    pub fn reason(&self) -> TerminationReason {
        match self {
            ControlMessage::NoMoreTasks => TerminationReason::NoMoreTasks,
            ControlMessage::SessionComplete => TerminationReason::SessionComplete,
        }
    }
}

/// 入站消息：带 type 的是控制消息，否则按任务分配解析
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum InboundMessage {
    Control(ControlMessage),
    Task(TaskAssignment),
}

/// Worker 发往编排端的事件
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum WorkerEvent {
    /// 远程桌面就绪
    SandboxReady { sandbox_id: String, stream_url: String },
    /// 进度：任务开始或某回合执行了工具
    Log {
        action: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_args: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        action_id: Option<String>,
    },
    /// 某回合的思考文本
    Reasoning { reasoning: String, action_id: String },
    /// 任务结束；result 以 "Error: " 开头表示失败
    #[serde(rename = "complete")]
    TaskCompleted { task_id: String, result: String },
    Error { error: String },
    WhiteboardUpdated { content: String },
    ReplayComplete { manifest_url: String, frame_count: usize },
    Terminated,
}

impl WorkerEvent {
    /// 不带工具信息的进度日志
    pub fn log(action: impl Into<String>) -> Self {
        WorkerEvent::Log {
            action: action.into(),
            tool_name: None,
            tool_args: None,
            action_id: None,
        }
    }
}
