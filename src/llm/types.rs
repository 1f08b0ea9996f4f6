//! 推理层的类型化消息
//!
//! 会话历史、工具调用与助手回合都在这里定型；供应商的原生响应只在客户端边界解码一次，
//! 下游不需要关心供应商的数据形状。

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 历史中被替换掉的旧截图占位文本
pub const IMAGE_PLACEHOLDER: &str = "[earlier screenshot omitted]";

/// 消息角色（与 chat completions 一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// 消息内容块：文本或图片（base64）
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentBlock {
    Text(String),
    Image { media_type: String, data_base64: String },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text(text.into())
    }

    pub fn image(media_type: impl Into<String>, bytes: &[u8]) -> Self {
        ContentBlock::Image {
            media_type: media_type.into(),
            data_base64: STANDARD.encode(bytes),
        }
    }

    /// `data:` URL 形式
    pub fn data_url(&self) -> Option<String> {
        match self {
            ContentBlock::Image {
                media_type,
                data_base64,
            } => Some(format!("data:{media_type};base64,{data_base64}")),
            ContentBlock::Text(_) => None,
        }
    }
}

/// 模型选择的工具调用
#[derive(Clone, Debug, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: format!("call_{}", uuid::Uuid::new_v4().simple()),
            name: name.into(),
            arguments,
        }
    }
}

/// 单条消息
#[derive(Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Vec<ContentBlock>,
    /// 仅 assistant：本轮选择的工具调用（最多一个）
    pub tool_call: Option<ToolCall>,
    /// 仅 tool：对应的调用 id
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn new(role: Role, content: Vec<ContentBlock>) -> Self {
        Self {
            role,
            content,
            tool_call: None,
            tool_call_id: None,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, vec![ContentBlock::text(text)])
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![ContentBlock::text(text)])
    }

    pub fn user_blocks(content: Vec<ContentBlock>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(text: Option<String>, tool_call: Option<ToolCall>) -> Self {
        let content = text.map(ContentBlock::Text).into_iter().collect();
        Self {
            tool_call,
            ..Self::new(Role::Assistant, content)
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: Vec<ContentBlock>) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            ..Self::new(Role::Tool, content)
        }
    }

    /// 所有文本块拼接
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text(t) => Some(t.as_str()),
                ContentBlock::Image { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn has_image(&self) -> bool {
        self.content
            .iter()
            .any(|b| matches!(b, ContentBlock::Image { .. }))
    }

    /// 图片块替换为占位文本
    pub fn strip_images(&mut self) {
        for block in &mut self.content {
            if matches!(block, ContentBlock::Image { .. }) {
                *block = ContentBlock::text(IMAGE_PLACEHOLDER);
            }
        }
    }
}

/// 一次推理调用的结果：可选的思考文本 + 至多一个工具调用。
/// 没有工具调用时本回合为终止回合，text 即最终答复。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssistantTurn {
    pub text: Option<String>,
    pub tool_call: Option<ToolCall>,
}

impl AssistantTurn {
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tool_call: None,
        }
    }

    pub fn tool(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            text: None,
            tool_call: Some(ToolCall::new(name, arguments)),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_image_block_data_url() {
        let block = ContentBlock::image("image/png", &[1, 2, 3]);
        assert_eq!(block.data_url().unwrap(), "data:image/png;base64,AQID");
    }

    #[test]
    fn test_strip_images_keeps_text() {
        let mut msg = ChatMessage::user_blocks(vec![
            ContentBlock::text("Here is the current screenshot:"),
            ContentBlock::image("image/png", &[0u8; 4]),
        ]);
        assert!(msg.has_image());
        msg.strip_images();
        assert!(!msg.has_image());
        assert!(msg.text().contains(IMAGE_PLACEHOLDER));
        assert!(msg.text().starts_with("Here is the current screenshot:"));
    }

    #[test]
    fn test_assistant_message_carries_tool_call() {
        let turn = AssistantTurn::tool("left_click", json!({"x": 1, "y": 2})).with_text("clicking");
        let msg = ChatMessage::assistant(turn.text.clone(), turn.tool_call.clone());
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.text(), "clicking");
        assert_eq!(msg.tool_call.unwrap().name, "left_click");
    }

    #[test]
    fn test_tool_call_ids_are_unique() {
        let a = ToolCall::new("done", json!({}));
        let b = ToolCall::new("done", json!({}));
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("call_"));
    }
}
