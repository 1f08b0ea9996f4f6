//! Mock 推理客户端（用于测试，无需 API）
//!
//! 按脚本依次返回预设回合或错误；脚本耗尽后可重复一个固定回合。
//! 记录每次调用收到的历史与调用时刻（tokio 时钟，便于在暂停时钟下断言退避间隔）。

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::llm::types::{AssistantTurn, ChatMessage};
use crate::llm::{LlmError, ReasoningClient};
use crate::tools::ToolSpec;

#[derive(Debug, Default)]
pub struct ScriptedReasoningClient {
    script: Mutex<VecDeque<Result<AssistantTurn, LlmError>>>,
    repeat: Option<AssistantTurn>,
    histories: Mutex<Vec<Vec<ChatMessage>>>,
    call_times: Mutex<Vec<Instant>>,
}

impl ScriptedReasoningClient {
    pub fn new(script: Vec<Result<AssistantTurn, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    /// 按顺序返回这些回合
    pub fn turns(turns: Vec<AssistantTurn>) -> Self {
        Self::new(turns.into_iter().map(Ok).collect())
    }

    /// 脚本耗尽后一直返回该回合
    pub fn then_repeat(mut self, turn: AssistantTurn) -> Self {
        self.repeat = Some(turn);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_times.lock().map(|t| t.len()).unwrap_or_default()
    }

    /// 相邻两次调用之间的间隔
    pub fn call_gaps(&self) -> Vec<Duration> {
        let times = self.call_times.lock().map(|t| t.clone()).unwrap_or_default();
        times.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// 第 n 次调用收到的历史
    pub fn history(&self, n: usize) -> Option<Vec<ChatMessage>> {
        self.histories.lock().ok().and_then(|h| h.get(n).cloned())
    }
}

#[async_trait]
impl ReasoningClient for ScriptedReasoningClient {
    async fn converse(
        &self,
        history: &[ChatMessage],
        _tools: &[ToolSpec],
    ) -> Result<AssistantTurn, LlmError> {
        if let Ok(mut times) = self.call_times.lock() {
            times.push(Instant::now());
        }
        if let Ok(mut h) = self.histories.lock() {
            h.push(history.to_vec());
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match (next, &self.repeat) {
            (Some(step), _) => step,
            (None, Some(turn)) => Ok(turn.clone()),
            (None, None) => Ok(AssistantTurn::answer("(script exhausted)")),
        }
    }
}
