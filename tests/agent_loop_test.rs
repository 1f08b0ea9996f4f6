//! AgentLoop 集成测试：工具分发、回合计数、步数上限与白板快照

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use deskhand::core::TerminationSignal;
    use deskhand::desktop::MockDesktop;
    use deskhand::llm::{AssistantTurn, Role, ScriptedReasoningClient};
    use deskhand::react::{AgentSession, TaskOutcome};
    use deskhand::tools::{ToolCatalog, ToolDispatcher};
    use serde_json::json;

    fn dispatcher(desktop: &Arc<MockDesktop>) -> ToolDispatcher {
        ToolDispatcher::new(desktop.clone(), ToolCatalog::desktop()).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_tools_never_fail() {
        let desktop = Arc::new(MockDesktop::new());
        let d = dispatcher(&desktop);
        for name in ["open_app", "screenshot", "left-click", "rm -rf /"] {
            let result = d.execute(name, &json!({"x": 1})).await;
            assert!(result.as_text().unwrap().contains(name));
        }
        assert!(desktop.calls().is_empty());
    }

    #[tokio::test]
    async fn test_n_turns_ending_in_done() {
        for n in 1..=4usize {
            let desktop = Arc::new(MockDesktop::new());
            let d = dispatcher(&desktop);
            let mut turns: Vec<AssistantTurn> = (0..n - 1)
                .map(|i| AssistantTurn::tool("left_click", json!({"x": i, "y": i})))
                .collect();
            turns.push(AssistantTurn::tool("done", json!({"summary": "S"})));
            let llm = ScriptedReasoningClient::turns(turns);
            let term = TerminationSignal::new();

            let outcome = AgentSession::new(&d, &llm, &term).run("task", None).await.unwrap();
            assert_eq!(outcome, TaskOutcome::Done("S".to_string()));
            assert_eq!(outcome.to_wire_text(), "S");
            assert_eq!(llm.call_count(), n);
            // done 不触碰桌面，其余每回合一次原语
            assert_eq!(desktop.calls().len(), n - 1);
        }
    }

    #[tokio::test]
    async fn test_step_bound_returns_sentinel() {
        let desktop = Arc::new(MockDesktop::new());
        let d = dispatcher(&desktop);
        let llm = ScriptedReasoningClient::default()
            .then_repeat(AssistantTurn::tool("press_key", json!({"key": "Tab"})));
        let term = TerminationSignal::new();

        let outcome = AgentSession::new(&d, &llm, &term)
            .with_max_steps(5)
            .run("never finishes", None)
            .await
            .unwrap();
        assert_eq!(outcome, TaskOutcome::MaxSteps);
        assert_eq!(outcome.to_wire_text(), "(max steps reached)");
        assert_eq!(llm.call_count(), 5);
        assert_eq!(desktop.calls().len(), 5);
    }

    #[tokio::test]
    async fn test_sentinel_is_distinct_from_task_text() {
        let desktop = Arc::new(MockDesktop::new());
        let d = dispatcher(&desktop);
        let llm = ScriptedReasoningClient::turns(vec![AssistantTurn::tool(
            "done",
            json!({"summary": "(max steps reached)"}),
        )]);
        let term = TerminationSignal::new();
        let outcome = AgentSession::new(&d, &llm, &term).run("x", None).await.unwrap();
        assert_ne!(outcome, TaskOutcome::MaxSteps);
    }

    #[tokio::test]
    async fn test_whiteboard_is_a_snapshot() {
        let desktop = Arc::new(MockDesktop::new());
        let d = dispatcher(&desktop);
        let llm = ScriptedReasoningClient::turns(vec![
            AssistantTurn::tool("done", json!({"summary": "A finished"})),
            AssistantTurn::tool("done", json!({"summary": "B finished"})),
        ]);
        let term = TerminationSignal::new();
        let session = AgentSession::new(&d, &llm, &term);

        session.run("task A", Some("note-1")).await.unwrap();
        session.run("task B", None).await.unwrap();

        let first = llm.history(0).unwrap();
        assert_eq!(first[0].role, Role::System);
        assert!(first[0].text().contains("note-1"));

        let second = llm.history(1).unwrap();
        assert!(!second[0].text().contains("note-1"));
        assert!(second.iter().all(|m| !m.text().contains("A finished")));
    }
}
