//! Observe -> Think -> Act 主循环
//!
//! 每回合：先截图作为最新观察（旧截图在历史中替换为占位文本），再请求推理引擎给出下一步，
//! 最后执行其选择的唯一工具。`done` 工具、无工具调用的回合、最大步数和终止信号都会结束循环。
//! 终止信号只在回合开始时检查，已经发出的远程调用不会被打断。

use serde_json::Value;

use crate::core::{AgentError, TerminationSignal};
use crate::llm::{ChatMessage, ContentBlock, ReasoningClient};
use crate::react::events::{StepObserver, StepRecord};
use crate::react::prompt::{build_system_prompt, task_message, DEFAULT_SYSTEM_PROMPT};
use crate::replay::ReplayBuffer;
use crate::tools::{DesktopAction, ToolDispatcher, ToolKind, ToolResult, DONE_TOOL, SCREENSHOT_TOOL};

/// 单个任务默认最大回合数
pub const DEFAULT_MAX_STEPS: usize = 30;
/// 第一帧回放的动作标签
pub const START_LABEL: &str = "start";

const OBSERVATION_TEXT: &str = "Here is the current screenshot:";
/// 思考文本在日志中的最大字符数
const REASONING_PREVIEW_CHARS: usize = 300;

/// 单个任务的结束方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// 模型调用了 done
    Done(String),
    /// 模型没有调用工具，直接给出答复
    Answer(String),
    MaxSteps,
    Terminated,
}

impl TaskOutcome {
    /// 事件边界上的文本
    pub fn to_wire_text(&self) -> String {
        match self {
            TaskOutcome::Done(summary) => summary.clone(),
            TaskOutcome::Answer(text) if text.trim().is_empty() => "(no response)".to_string(),
            TaskOutcome::Answer(text) => text.clone(),
            TaskOutcome::MaxSteps => "(max steps reached)".to_string(),
            TaskOutcome::Terminated => "(terminated)".to_string(),
        }
    }
}

/// AgentLoop 会话配置
pub struct AgentSession<'a> {
    /// 工具分发器（必需）
    pub dispatcher: &'a ToolDispatcher,
    /// 推理客户端（必需，通常已带重试）
    pub reasoning: &'a dyn ReasoningClient,
    /// 终止信号（必需）
    pub termination: &'a TerminationSignal,
    pub max_steps: usize,
    /// 基础系统提示词
    pub system_prompt: &'a str,
    /// 可选：回放缓冲
    pub replay: Option<&'a ReplayBuffer>,
    /// 可选：每回合动作执行后的回调
    pub observer: Option<&'a dyn StepObserver>,
}

impl<'a> AgentSession<'a> {
    pub fn new(
        dispatcher: &'a ToolDispatcher,
        reasoning: &'a dyn ReasoningClient,
        termination: &'a TerminationSignal,
    ) -> Self {
        Self {
            dispatcher,
            reasoning,
            termination,
            max_steps: DEFAULT_MAX_STEPS,
            system_prompt: DEFAULT_SYSTEM_PROMPT,
            replay: None,
            observer: None,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_system_prompt(mut self, prompt: &'a str) -> Self {
        self.system_prompt = prompt;
        self
    }

    pub fn with_replay(mut self, replay: &'a ReplayBuffer) -> Self {
        self.replay = Some(replay);
        self
    }

    pub fn with_observer(mut self, observer: &'a dyn StepObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// 运行一个任务直到结束；只有推理失败会返回 Err
    pub async fn run(
        &self,
        description: &str,
        whiteboard: Option<&str>,
    ) -> Result<TaskOutcome, AgentError> {
        let mut history = vec![
            ChatMessage::system(build_system_prompt(self.system_prompt, whiteboard)),
            ChatMessage::user(task_message(description)),
        ];
        let mut last_label = START_LABEL.to_string();
        let tools = self.dispatcher.catalog().specs();

        let mut turn = 0;
        loop {
            turn += 1;
            if self.termination.is_terminated() {
                tracing::info!(turn, "Termination observed, stopping task");
                return Ok(TaskOutcome::Terminated);
            }
            if turn > self.max_steps {
                tracing::warn!(max_steps = self.max_steps, "Max steps reached");
                return Ok(TaskOutcome::MaxSteps);
            }

            // OBSERVE
            let observation = self.observe(&last_label).await;
            for msg in &mut history {
                msg.strip_images();
            }
            history.push(observation);

            // THINK
            let turn_result = self.reasoning.converse(&history, tools).await?;
            let reasoning = turn_result.text.clone();
            if let Some(text) = &reasoning {
                tracing::info!(turn, reasoning = %preview(text), "Reasoning");
            }
            let Some(call) = turn_result.tool_call else {
                tracing::info!(turn, "No tool call, task answered");
                return Ok(TaskOutcome::Answer(reasoning.unwrap_or_default()));
            };

            // ACT
            tracing::info!(turn, tool = %call.name, args = %call.arguments, "Executing tool");
            let result = self.dispatcher.execute(&call.name, &call.arguments).await;
            let label = action_label(&call.name, &call.arguments);

            history.push(ChatMessage::assistant(reasoning.clone(), Some(call.clone())));
            history.push(ChatMessage::tool_result(call.id.clone(), result_blocks(&result)));

            if let Some(observer) = self.observer {
                observer.on_step(&StepRecord {
                    turn,
                    tool_name: call.name.clone(),
                    args: call.arguments.clone(),
                    reasoning,
                    label: label.clone(),
                });
            }

            if call.name == DONE_TOOL {
                let summary = result.as_text().unwrap_or_default().to_string();
                tracing::info!(turn, "Task done: {}", preview(&summary));
                return Ok(TaskOutcome::Done(summary));
            }
            last_label = label;
        }
    }

    /// 截图并组装观察消息；截图失败时以文本告知推理引擎
    async fn observe(&self, label: &str) -> ChatMessage {
        match self.dispatcher.execute(SCREENSHOT_TOOL, &Value::Null).await {
            ToolResult::Image { media_type, data } => {
                if let Some(replay) = self.replay {
                    replay.capture(data.clone(), label).await;
                }
                ChatMessage::user_blocks(vec![
                    ContentBlock::text(OBSERVATION_TEXT),
                    ContentBlock::image(media_type, &data),
                ])
            }
            ToolResult::Text(text) => {
                tracing::warn!("Observation screenshot failed: {}", text);
                ChatMessage::user(format!("Screenshot unavailable: {text}"))
            }
        }
    }
}

fn result_blocks(result: &ToolResult) -> Vec<ContentBlock> {
    match result {
        ToolResult::Text(text) => vec![ContentBlock::text(text.clone())],
        ToolResult::Image { media_type, data } => vec![ContentBlock::image(media_type.clone(), data)],
    }
}

/// 回放帧标签：能解码就用动作标签，否则用工具名
fn action_label(name: &str, args: &Value) -> String {
    ToolKind::from_name(name)
        .and_then(|kind| DesktopAction::parse(kind, args).ok())
        .map(|action| action.label())
        .unwrap_or_else(|| name.to_string())
}

fn preview(text: &str) -> String {
    if text.chars().count() > REASONING_PREVIEW_CHARS {
        format!("{}...", text.chars().take(REASONING_PREVIEW_CHARS).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use crate::desktop::MockDesktop;
    use crate::llm::{AssistantTurn, LlmError, Role, ScriptedReasoningClient, IMAGE_PLACEHOLDER};
    use crate::tools::ToolCatalog;

    fn dispatcher(desktop: &Arc<MockDesktop>) -> ToolDispatcher {
        ToolDispatcher::new(desktop.clone(), ToolCatalog::desktop()).unwrap()
    }

    #[test]
    fn test_outcome_wire_text() {
        assert_eq!(TaskOutcome::Done("ok".into()).to_wire_text(), "ok");
        assert_eq!(TaskOutcome::Answer("".into()).to_wire_text(), "(no response)");
        assert_eq!(TaskOutcome::MaxSteps.to_wire_text(), "(max steps reached)");
        assert_eq!(TaskOutcome::Terminated.to_wire_text(), "(terminated)");
    }

    #[tokio::test]
    async fn test_done_ends_loop_with_summary() {
        let desktop = Arc::new(MockDesktop::new());
        let d = dispatcher(&desktop);
        let llm = ScriptedReasoningClient::turns(vec![
            AssistantTurn::tool("left_click", json!({"x": 5, "y": 6})).with_text("click the icon"),
            AssistantTurn::tool("done", json!({"summary": "opened it"})),
        ]);
        let term = TerminationSignal::new();

        let outcome = AgentSession::new(&d, &llm, &term).run("open it", None).await.unwrap();
        assert_eq!(outcome, TaskOutcome::Done("opened it".to_string()));
        assert_eq!(desktop.calls(), vec!["click:5,6"]);
        assert_eq!(desktop.screenshot_count(), 2);
    }

    #[tokio::test]
    async fn test_no_tool_call_is_an_answer() {
        let desktop = Arc::new(MockDesktop::new());
        let d = dispatcher(&desktop);
        let llm = ScriptedReasoningClient::turns(vec![AssistantTurn::default()]);
        let term = TerminationSignal::new();

        let outcome = AgentSession::new(&d, &llm, &term).run("noop", None).await.unwrap();
        assert_eq!(outcome.to_wire_text(), "(no response)");
    }

    #[tokio::test]
    async fn test_only_latest_observation_carries_pixels() {
        let desktop = Arc::new(MockDesktop::new());
        let d = dispatcher(&desktop);
        let llm = ScriptedReasoningClient::turns(vec![
            AssistantTurn::tool("press_key", json!({"key": "ctrl+l"})),
            AssistantTurn::tool("press_key", json!({"key": "Enter"})),
            AssistantTurn::tool("done", json!({"summary": "ok"})),
        ]);
        let term = TerminationSignal::new();
        AgentSession::new(&d, &llm, &term).run("x", None).await.unwrap();

        let third = llm.history(2).unwrap();
        let with_pixels: Vec<&ChatMessage> = third.iter().filter(|m| m.has_image()).collect();
        assert_eq!(with_pixels.len(), 1);
        assert!(std::ptr::eq(with_pixels[0], third.last().unwrap()));
        let placeholders = third
            .iter()
            .filter(|m| m.role == Role::User && m.text().contains(IMAGE_PLACEHOLDER))
            .count();
        assert_eq!(placeholders, 2);
    }

    #[tokio::test]
    async fn test_replay_frames_use_previous_action_label() {
        let desktop = Arc::new(MockDesktop::new());
        let d = dispatcher(&desktop);
        let llm = ScriptedReasoningClient::turns(vec![
            AssistantTurn::tool("left_click", json!({"x": 1, "y": 2})),
            AssistantTurn::tool("done", json!({"summary": "ok"})),
        ]);
        let term = TerminationSignal::new();
        let replay = ReplayBuffer::new();
        AgentSession::new(&d, &llm, &term)
            .with_replay(&replay)
            .run("x", None)
            .await
            .unwrap();

        let labels: Vec<String> = replay.frames().into_iter().map(|f| f.action).collect();
        assert_eq!(labels, vec!["start", "left_click(1, 2)"]);
    }

    #[tokio::test]
    async fn test_observer_sees_gapless_turns() {
        let desktop = Arc::new(MockDesktop::new());
        let d = dispatcher(&desktop);
        let llm = ScriptedReasoningClient::turns(vec![
            AssistantTurn::tool("move_mouse", json!({"x": 1, "y": 1})).with_text("hover"),
            AssistantTurn::tool("bogus_tool", json!({})),
            AssistantTurn::tool("done", json!({"summary": "ok"})),
        ]);
        let term = TerminationSignal::new();
        let seen = Mutex::new(Vec::new());
        let observer = |step: &StepRecord| {
            if let Ok(mut s) = seen.lock() {
                s.push((step.turn, step.tool_name.clone(), step.reasoning.clone()));
            }
        };
        AgentSession::new(&d, &llm, &term)
            .with_observer(&observer)
            .run("x", None)
            .await
            .unwrap();

        let seen = seen.into_inner().unwrap();
        assert_eq!(
            seen,
            vec![
                (1, "move_mouse".to_string(), Some("hover".to_string())),
                (2, "bogus_tool".to_string(), None),
                (3, "done".to_string(), None),
            ]
        );
        let second = llm.history(2).unwrap();
        assert!(second.iter().any(|m| m.text().contains("Unknown tool: bogus_tool")));
    }

    #[tokio::test]
    async fn test_whiteboard_goes_into_system_prompt() {
        let desktop = Arc::new(MockDesktop::new());
        let d = dispatcher(&desktop);
        let llm = ScriptedReasoningClient::turns(vec![AssistantTurn::answer("fine")]);
        let term = TerminationSignal::new();
        AgentSession::new(&d, &llm, &term)
            .with_system_prompt("base prompt")
            .run("x", Some("agent-2 found the login page"))
            .await
            .unwrap();

        let first = llm.history(0).unwrap();
        assert_eq!(first[0].role, Role::System);
        assert!(first[0].text().starts_with("base prompt"));
        assert!(first[0].text().contains("agent-2 found the login page"));
        assert_eq!(first[1].text(), "Complete this task: x");
    }

    #[tokio::test]
    async fn test_reasoning_failure_propagates() {
        let desktop = Arc::new(MockDesktop::new());
        let d = dispatcher(&desktop);
        let llm = ScriptedReasoningClient::new(vec![Err(LlmError::Decode("bad".into()))]);
        let term = TerminationSignal::new();
        let err = AgentSession::new(&d, &llm, &term).run("x", None).await.unwrap_err();
        assert!(matches!(err, AgentError::Llm(LlmError::Decode(_))));
    }

    #[tokio::test]
    async fn test_screenshot_failure_is_presented_as_text() {
        struct BlindDesktop;
        #[async_trait::async_trait]
        impl crate::desktop::DesktopSurface for BlindDesktop {
            async fn screenshot(&self) -> Result<Vec<u8>, crate::desktop::DesktopError> {
                Err(crate::desktop::DesktopError::Request("display gone".into()))
            }
            async fn left_click(&self, _: i32, _: i32) -> Result<(), crate::desktop::DesktopError> { Ok(()) }
            async fn double_click(&self, _: i32, _: i32) -> Result<(), crate::desktop::DesktopError> { Ok(()) }
            async fn write(&self, _: &str) -> Result<(), crate::desktop::DesktopError> { Ok(()) }
            async fn press(&self, _: &str) -> Result<(), crate::desktop::DesktopError> { Ok(()) }
            async fn move_mouse(&self, _: i32, _: i32) -> Result<(), crate::desktop::DesktopError> { Ok(()) }
            async fn scroll(
                &self,
                _: crate::desktop::ScrollDirection,
                _: u32,
            ) -> Result<(), crate::desktop::DesktopError> {
                Ok(())
            }
        }
        let d = ToolDispatcher::new(Arc::new(BlindDesktop), ToolCatalog::desktop()).unwrap();
        let llm = ScriptedReasoningClient::turns(vec![AssistantTurn::answer("cannot see")]);
        let term = TerminationSignal::new();
        let replay = ReplayBuffer::new();
        AgentSession::new(&d, &llm, &term)
            .with_replay(&replay)
            .run("x", None)
            .await
            .unwrap();

        let first = llm.history(0).unwrap();
        let last = first.last().unwrap();
        assert!(!last.has_image());
        assert!(last.text().contains("display gone"));
        assert_eq!(replay.frame_count(), 0);
    }
}
