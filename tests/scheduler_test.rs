//! 调度器集成测试：终止信号在回合边界生效、后续任务不再出队

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use deskhand::channel::{EventSink, TaskAssignment, WorkerEvent};
    use deskhand::core::{SchedulerSettings, TaskScheduler, TerminationReason, TerminationSignal};
    use deskhand::desktop::MockDesktop;
    use deskhand::llm::{AssistantTurn, ScriptedReasoningClient};
    use deskhand::replay::{LocalExporter, ReplayExporter};
    use deskhand::tools::{ToolCatalog, ToolDispatcher};
    use serde_json::json;
    use tokio::sync::mpsc;

    /// 记录事件；第一次看到带工具名的 log 事件时置位终止（模拟「A 的第一次 Act 之后」收到终止）
    struct TerminateOnFirstAct {
        events: Mutex<Vec<WorkerEvent>>,
        termination: TerminationSignal,
    }

    impl EventSink for TerminateOnFirstAct {
        fn emit(&self, event: &WorkerEvent) {
            if let WorkerEvent::Log {
                tool_name: Some(_), ..
            } = event
            {
                self.termination.terminate(TerminationReason::SessionComplete);
            }
            self.events.lock().unwrap().push(event.clone());
        }
    }

    fn task(id: &str) -> TaskAssignment {
        TaskAssignment {
            task_id: id.to_string(),
            description: format!("task {id}"),
            whiteboard: None,
        }
    }

    #[tokio::test]
    async fn test_termination_after_first_act() {
        let termination = TerminationSignal::new();
        let sink = Arc::new(TerminateOnFirstAct {
            events: Mutex::new(Vec::new()),
            termination: termination.clone(),
        });
        let desktop = Arc::new(MockDesktop::new());
        let dispatcher = ToolDispatcher::new(desktop.clone(), ToolCatalog::desktop()).unwrap();
        let llm = Arc::new(
            ScriptedReasoningClient::default()
                .then_repeat(AssistantTurn::tool("left_click", json!({"x": 1, "y": 1}))),
        );
        let settings = SchedulerSettings {
            poll_interval: Duration::from_millis(50),
            ..SchedulerSettings::default()
        };

        let (tx, rx) = mpsc::channel(4);
        tx.send(task("A")).await.unwrap();
        tx.send(task("B")).await.unwrap();

        TaskScheduler::new(
            Arc::new(dispatcher),
            llm.clone(),
            sink.clone(),
            termination.clone(),
            settings,
        )
        .run(rx)
        .await;

        let events = sink.events.lock().unwrap().clone();
        let completions: Vec<&WorkerEvent> = events
            .iter()
            .filter(|e| matches!(e, WorkerEvent::TaskCompleted { .. }))
            .collect();
        assert_eq!(
            completions,
            vec![&WorkerEvent::TaskCompleted {
                task_id: "A".into(),
                result: "(terminated)".into()
            }]
        );
        assert!(!events
            .iter()
            .any(|e| *e == WorkerEvent::log("Starting task: task B")));
        assert_eq!(events.last(), Some(&WorkerEvent::Terminated));
        assert_eq!(llm.call_count(), 1);
        assert_eq!(desktop.calls(), vec!["click:1,1"]);
        assert_eq!(termination.reason(), Some(TerminationReason::SessionComplete));
    }

    #[tokio::test]
    async fn test_replay_exported_at_exit() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, mut events) = deskhand::channel::ChannelSink::new();
        let dispatcher =
            ToolDispatcher::new(Arc::new(MockDesktop::new()), ToolCatalog::desktop()).unwrap();
        let llm = ScriptedReasoningClient::turns(vec![
            AssistantTurn::tool("double_click", json!({"x": 4, "y": 2})),
            AssistantTurn::tool("done", json!({"summary": "ok"})),
        ]);
        let settings = SchedulerSettings {
            session_id: "sess".into(),
            agent_id: "agent-1".into(),
            ..SchedulerSettings::default()
        };

        let (tx, rx) = mpsc::channel(4);
        tx.send(task("t")).await.unwrap();
        drop(tx);

        TaskScheduler::new(
            Arc::new(dispatcher),
            Arc::new(llm),
            Arc::new(sink),
            TerminationSignal::new(),
            settings,
        )
        .with_replay_exporter(ReplayExporter::Local(LocalExporter::new(dir.path(), "/replays")))
        .run(rx)
        .await;

        let mut all = Vec::new();
        while let Ok(ev) = events.try_recv() {
            all.push(ev);
        }
        let n = all.len();
        assert_eq!(
            all[n - 2],
            WorkerEvent::ReplayComplete {
                manifest_url: "/replays/sess/agent-1/manifest.json".into(),
                frame_count: 2,
            }
        );
        assert_eq!(all[n - 1], WorkerEvent::Terminated);
        assert!(dir.path().join("sess/agent-1/frame-0001.jpg").exists());
    }
}
