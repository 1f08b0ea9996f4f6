//! 推理层：类型化消息、客户端抽象与重试包装、OpenAI 兼容实现、Mock

pub mod mock;
pub mod openai;
pub mod traits;
pub mod types;

pub use mock::ScriptedReasoningClient;
pub use openai::OpenAiCompatClient;
pub use traits::{LlmError, ReasoningClient, RetryConfig, RetryingReasoningClient};
pub use types::{AssistantTurn, ChatMessage, ContentBlock, Role, ToolCall, IMAGE_PLACEHOLDER};
