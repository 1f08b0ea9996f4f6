//! 任务调度：单 Worker 串行执行编排端分配的任务
//!
//! 循环：终止则退出；否则带超时轮询队列，取到任务就把 AgentLoop 跑到结束并推送 complete 事件，
//! 超时则回到开头重新检查终止条件；队列关闭等同终止。
//! 每个任务结束后（无论成败）把结果追加到共享白板；退出前导出回放并推送 terminated。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::channel::{EventSink, TaskAssignment, WorkerEvent};
use crate::core::{TerminationReason, TerminationSignal};
use crate::llm::ReasoningClient;
use crate::react::{AgentSession, StepObserver, StepRecord, DEFAULT_MAX_STEPS, DEFAULT_SYSTEM_PROMPT};
use crate::replay::{ReplayBuffer, ReplayExporter};
use crate::tools::ToolDispatcher;
use crate::whiteboard::{append_entry, WhiteboardError, WhiteboardStore};

/// 调度参数
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub session_id: String,
    pub agent_id: String,
    pub max_steps: usize,
    /// 队列轮询超时
    pub poll_interval: Duration,
    pub system_prompt: String,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            session_id: "local".to_string(),
            agent_id: "agent-0".to_string(),
            max_steps: DEFAULT_MAX_STEPS,
            poll_interval: Duration::from_secs(2),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// 把每回合的执行情况转成 log / reasoning 事件
struct EventObserver<'a> {
    sink: &'a dyn EventSink,
    task_id: &'a str,
}

impl StepObserver for EventObserver<'_> {
    fn on_step(&self, step: &StepRecord) {
        let action_id = format!("{}-{}", self.task_id, step.turn);
        if let Some(reasoning) = &step.reasoning {
            self.sink.emit(&WorkerEvent::Reasoning {
                reasoning: reasoning.clone(),
                action_id: action_id.clone(),
            });
        }
        self.sink.emit(&WorkerEvent::Log {
            action: step.label.clone(),
            tool_name: Some(step.tool_name.clone()),
            tool_args: Some(step.args.clone()),
            action_id: Some(action_id),
        });
    }
}

/// 任务调度器
pub struct TaskScheduler {
    dispatcher: Arc<ToolDispatcher>,
    reasoning: Arc<dyn ReasoningClient>,
    sink: Arc<dyn EventSink>,
    termination: TerminationSignal,
    settings: SchedulerSettings,
    replay: ReplayBuffer,
    exporter: Option<ReplayExporter>,
    whiteboard: Option<Arc<dyn WhiteboardStore>>,
    /// 本进程生命周期内见过的任务 id
    seen: HashSet<String>,
}

impl TaskScheduler {
    pub fn new(
        dispatcher: Arc<ToolDispatcher>,
        reasoning: Arc<dyn ReasoningClient>,
        sink: Arc<dyn EventSink>,
        termination: TerminationSignal,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            dispatcher,
            reasoning,
            sink,
            termination,
            settings,
            replay: ReplayBuffer::new(),
            exporter: None,
            whiteboard: None,
            seen: HashSet::new(),
        }
    }

    /// 启用回放采集与会话结束时的导出
    pub fn with_replay_exporter(mut self, exporter: ReplayExporter) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn with_whiteboard(mut self, store: Arc<dyn WhiteboardStore>) -> Self {
        self.whiteboard = Some(store);
        self
    }

    /// 运行到终止；返回后 Worker 可以关闭沙箱并退出
    pub async fn run(mut self, mut tasks: mpsc::Receiver<TaskAssignment>) {
        tracing::info!(
            session_id = %self.settings.session_id,
            agent_id = %self.settings.agent_id,
            "Task scheduler started"
        );
        loop {
            if self.termination.is_terminated() {
                break;
            }
            match tokio::time::timeout(self.settings.poll_interval, tasks.recv()).await {
                Ok(Some(task)) => self.handle_task(task).await,
                Ok(None) => {
                    self.termination.terminate(TerminationReason::InputClosed);
                    break;
                }
                Err(_) => continue,
            }
        }
        tracing::info!(reason = ?self.termination.reason(), "Task scheduler stopping");
        self.finish().await;
    }

    async fn handle_task(&mut self, task: TaskAssignment) {
        if !self.seen.insert(task.task_id.clone()) {
            tracing::warn!(task_id = %task.task_id, "Duplicate task id rejected");
            self.sink.emit(&WorkerEvent::Error {
                error: format!("Duplicate task id: {}", task.task_id),
            });
            return;
        }

        tracing::info!(task_id = %task.task_id, "Starting task");
        self.sink
            .emit(&WorkerEvent::log(format!("Starting task: {}", task.description)));

        let observer = EventObserver {
            sink: self.sink.as_ref(),
            task_id: &task.task_id,
        };
        let mut session = AgentSession::new(
            &self.dispatcher,
            self.reasoning.as_ref(),
            &self.termination,
        )
        .with_max_steps(self.settings.max_steps)
        .with_system_prompt(&self.settings.system_prompt)
        .with_observer(&observer);
        if self.exporter.is_some() {
            session = session.with_replay(&self.replay);
        }

        let result = match session.run(&task.description, task.whiteboard.as_deref()).await {
            Ok(outcome) => {
                tracing::info!(task_id = %task.task_id, ?outcome, "Task finished");
                outcome.to_wire_text()
            }
            Err(e) => {
                tracing::error!(task_id = %task.task_id, "Task failed: {}", e);
                e.to_wire_text()
            }
        };

        self.sink.emit(&WorkerEvent::TaskCompleted {
            task_id: task.task_id.clone(),
            result: result.clone(),
        });
        self.append_to_whiteboard(&task.task_id, &result).await;
    }

    async fn append_to_whiteboard(&self, task_id: &str, result: &str) {
        let Some(store) = &self.whiteboard else {
            return;
        };
        let current = match store.read().await {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!(task_id, "Failed to read whiteboard: {}", e);
                return;
            }
        };
        let content = append_entry(&current, &self.settings.agent_id, task_id, result);
        match store.write(&content).await {
            Ok(()) => self.sink.emit(&WorkerEvent::WhiteboardUpdated { content }),
            Err(WhiteboardError::ReadOnly) => {
                tracing::debug!(task_id, "Whiteboard is read-only, leaving the write to the orchestrator");
                self.sink.emit(&WorkerEvent::WhiteboardUpdated { content });
            }
            Err(e) => tracing::warn!(task_id, "Failed to update whiteboard: {}", e),
        }
    }

    async fn finish(&self) {
        if let Some(exporter) = &self.exporter {
            let export = exporter
                .export(&self.replay, &self.settings.session_id, &self.settings.agent_id)
                .await;
            if let Some(export) = export {
                self.sink.emit(&WorkerEvent::ReplayComplete {
                    manifest_url: export.manifest_url,
                    frame_count: export.frame_count,
                });
            }
        }
        self.sink.emit(&WorkerEvent::Terminated);
    }
}
