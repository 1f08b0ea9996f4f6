//! 单步过程记录：每回合动作执行后交给可选的观察者（调度器据此推送 log / reasoning 事件）

use serde::Serialize;
use serde_json::Value;

/// 一个已执行回合的摘要
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    /// 从 1 开始，单任务内连续递增
    pub turn: usize,
    pub tool_name: String,
    pub args: Value,
    /// 推理引擎在本回合给出的思考文本
    pub reasoning: Option<String>,
    /// 动作标签，如 `left_click(10, 20)`
    pub label: String,
}

pub trait StepObserver: Send + Sync {
    fn on_step(&self, step: &StepRecord);
}

impl<F> StepObserver for F
where
    F: Fn(&StepRecord) + Send + Sync,
{
    fn on_step(&self, step: &StepRecord) {
        self(step)
    }
}
