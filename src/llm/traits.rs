//! 推理客户端抽象与重试包装
//!
//! ReasoningClient::converse 发出一次「下一步动作」请求；RetryingReasoningClient 对瞬时错误做有界指数退避：
//! 最多 max_attempts 次，第 attempt 次（从 0 计）失败后等待 base_delay * 2^attempt，最后一次失败原样向上抛出。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::types::{AssistantTurn, ChatMessage};
use crate::tools::ToolSpec;

/// 推理调用错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// 连接失败、超时等传输层错误
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("server error {status}: {body}")]
    Server { status: u16, body: String },

    /// 4xx（429 除外）：请求本身有问题，重试无意义
    #[error("request rejected {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("undecodable response: {0}")]
    Decode(String),

    /// 请求在本地就无法组装（工具定义或消息不合法）
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl LlmError {
    /// 是否值得重试
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::Transport(_) | LlmError::RateLimited(_) | LlmError::Server { .. }
        )
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            LlmError::Decode(e.to_string())
        } else {
            LlmError::Transport(e.to_string())
        }
    }
}

/// 推理客户端：给定完整历史与工具目录，返回下一回合
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    async fn converse(
        &self,
        history: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<AssistantTurn, LlmError>;
}

/// 重试策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// 总尝试次数（含第一次）
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryConfig {
    /// 第 attempt 次（从 0 计）失败后的等待时间
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// 带重试的推理客户端
pub struct RetryingReasoningClient {
    inner: Arc<dyn ReasoningClient>,
    config: RetryConfig,
}

impl RetryingReasoningClient {
    pub fn new(inner: Arc<dyn ReasoningClient>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl ReasoningClient for RetryingReasoningClient {
    async fn converse(
        &self,
        history: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<AssistantTurn, LlmError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match self.inner.converse(history, tools).await {
                Ok(turn) => return Ok(turn),
                Err(e) if e.is_transient() && attempt + 1 < max_attempts => {
                    let delay = self.config.delay_for(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Reasoning call failed: {}, retrying",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(attempt = attempt + 1, "Reasoning call failed: {}", e);
                    return Err(e);
                }
            }
        }
    }
}
