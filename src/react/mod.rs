//! 认知层：Observe-Think-Act 主循环、提示词、单步过程记录

pub mod events;
pub mod loop_;
pub mod prompt;

pub use events::{StepObserver, StepRecord};
pub use loop_::{AgentSession, TaskOutcome, DEFAULT_MAX_STEPS, START_LABEL};
pub use prompt::DEFAULT_SYSTEM_PROMPT;
