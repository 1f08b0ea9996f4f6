//! Worker 错误类型
//!
//! 每个边界一个 thiserror 枚举：核心循环用 AgentError，推理层用 LlmError（见 llm::traits），
//! 桌面层用 DesktopError（见 desktop），回放导出用 ReplayError（见 replay::export）。

use thiserror::Error;

use crate::llm::LlmError;

/// 任务运行过程中无法就地恢复的错误（推理失败、配置错误、工具目录不一致、会话启动失败）
#[derive(Error, Debug)]
pub enum AgentError {
    /// 推理调用在重试耗尽后仍失败，对当前任务是致命的
    #[error("Reasoning failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Tool catalog mismatch: {0}")]
    Catalog(String),

    /// 远程桌面无法创建，对整个 Worker 是致命的
    #[error("Sandbox bootstrap failed: {0}")]
    Bootstrap(String),
}

impl AgentError {
    /// 转为事件边界上的文本（任务失败不单独走通道，调用方检查前缀）
    pub fn to_wire_text(&self) -> String {
        format!("Error: {self}")
    }
}
