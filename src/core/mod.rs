//! 核心编排层：错误类型、终止信号、任务调度、Worker 组装

pub mod builder;
pub mod error;
pub mod task_scheduler;
pub mod termination;

pub use builder::WorkerBuilder;
pub use error::AgentError;
pub use task_scheduler::{SchedulerSettings, TaskScheduler};
pub use termination::{TerminationReason, TerminationSignal};
