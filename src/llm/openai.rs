//! OpenAI 兼容 chat completions 客户端
//!
//! 请求与响应都用 async_openai 的类型定型：工具目录编码为 function 工具，截图以 data URL 图片块发送，
//! 响应在 `decode_response` 一处解码为 AssistantTurn；多个工具调用时只保留第一个。
//!
//! 传输走 reqwest 而不是 async_openai::Client：后者在 ApiError 中丢弃 HTTP 状态码并自带 429 退避，
//! 重试策略需要按状态码区分瞬时错误并由 RetryingReasoningClient 统一计数。

use std::time::Duration;

use async_openai::error::OpenAIError;
use async_openai::types::chat::{
    ChatCompletionMessageToolCall, ChatCompletionMessageToolCalls,
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestMessageContentPartImageArgs,
    ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionRequestUserMessageContentPart, ChatCompletionTool,
    ChatCompletionToolChoiceOption, ChatCompletionTools, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs, CreateChatCompletionResponse, FunctionCall,
    FunctionObjectArgs, ImageDetail, ImageUrlArgs, ToolChoiceOptions,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;

use crate::llm::types::{AssistantTurn, ChatMessage, ContentBlock, Role, ToolCall};
use crate::llm::{LlmError, ReasoningClient};
use crate::tools::ToolSpec;

/// tool 消息只能携带文本；工具结果里的截图随后以 user 消息补发
const TOOL_IMAGE_TEXT: &str = "Screenshot returned by the tool:";

impl From<OpenAIError> for LlmError {
    fn from(e: OpenAIError) -> Self {
        LlmError::InvalidRequest(e.to_string())
    }
}

pub struct OpenAiCompatClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    /// 为 true 时 tool_choice = "required"，强制每回合恰好一个工具调用
    force_tool_call: bool,
}

impl OpenAiCompatClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_default();
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model: model.to_string(),
            max_tokens: 1024,
            force_tool_call: false,
        })
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_forced_tool_call(mut self, force: bool) -> Self {
        self.force_tool_call = force;
        self
    }

    fn build_request(
        &self,
        history: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<CreateChatCompletionRequest, OpenAIError> {
        let tools = tools
            .iter()
            .map(|t| {
                let function = FunctionObjectArgs::default()
                    .name(&t.name)
                    .description(&t.description)
                    .parameters(t.parameters.clone())
                    .build()?;
                Ok(ChatCompletionTools::Function(ChatCompletionTool { function }))
            })
            .collect::<Result<Vec<_>, OpenAIError>>()?;
        let tool_choice = if self.force_tool_call {
            ToolChoiceOptions::Required
        } else {
            ToolChoiceOptions::Auto
        };
        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .max_completion_tokens(self.max_tokens)
            .messages(to_openai_messages(history)?)
            .tools(tools)
            .tool_choice(ChatCompletionToolChoiceOption::Mode(tool_choice))
            .build()
    }
}

fn user_parts(
    content: &[ContentBlock],
) -> Result<Vec<ChatCompletionRequestUserMessageContentPart>, OpenAIError> {
    content
        .iter()
        .map(|block| match block {
            ContentBlock::Text(text) => Ok(ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartTextArgs::default()
                    .text(text.clone())
                    .build()?,
            )),
            ContentBlock::Image { .. } => {
                let image_url = ImageUrlArgs::default()
                    .url(block.data_url().unwrap_or_default())
                    .detail(ImageDetail::High)
                    .build()?;
                Ok(ChatCompletionRequestUserMessageContentPart::ImageUrl(
                    ChatCompletionRequestMessageContentPartImageArgs::default()
                        .image_url(image_url)
                        .build()?,
                ))
            }
        })
        .collect()
}

fn to_openai_messages(
    history: &[ChatMessage],
) -> Result<Vec<ChatCompletionRequestMessage>, OpenAIError> {
    let mut out = Vec::with_capacity(history.len());
    for msg in history {
        match msg.role {
            Role::System => out.push(ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(msg.text())
                    .build()?,
            )),
            Role::User => {
                let mut args = ChatCompletionRequestUserMessageArgs::default();
                if msg.has_image() {
                    args.content(user_parts(&msg.content)?);
                } else {
                    args.content(msg.text());
                }
                out.push(ChatCompletionRequestMessage::User(args.build()?));
            }
            Role::Assistant => {
                let mut args = ChatCompletionRequestAssistantMessageArgs::default();
                if !msg.content.is_empty() {
                    args.content(msg.text());
                }
                if let Some(tc) = &msg.tool_call {
                    args.tool_calls(vec![ChatCompletionMessageToolCalls::Function(
                        ChatCompletionMessageToolCall {
                            id: tc.id.clone(),
                            function: FunctionCall {
                                name: tc.name.clone(),
                                arguments: tc.arguments.to_string(),
                            },
                        },
                    )]);
                }
                out.push(ChatCompletionRequestMessage::Assistant(args.build()?));
            }
            Role::Tool => {
                out.push(ChatCompletionRequestMessage::Tool(
                    ChatCompletionRequestToolMessageArgs::default()
                        .tool_call_id(msg.tool_call_id.clone().unwrap_or_default())
                        .content(msg.text())
                        .build()?,
                ));
                if msg.has_image() {
                    let mut parts = vec![ContentBlock::text(TOOL_IMAGE_TEXT)];
                    parts.extend(
                        msg.content
                            .iter()
                            .filter(|b| matches!(b, ContentBlock::Image { .. }))
                            .cloned(),
                    );
                    out.push(ChatCompletionRequestMessage::User(
                        ChatCompletionRequestUserMessageArgs::default()
                            .content(user_parts(&parts)?)
                            .build()?,
                    ));
                }
            }
        }
    }
    Ok(out)
}

/// 供应商响应 → AssistantTurn（唯一的解码点）
pub fn decode_response(body: &str) -> Result<AssistantTurn, LlmError> {
    let response: CreateChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| LlmError::Decode(e.to_string()))?;
    if let Some(usage) = &response.usage {
        tracing::debug!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "Reasoning call usage"
        );
    }
    let message = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::Decode("response has no choices".to_string()))?
        .message;

    let mut calls = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .filter_map(|call| match call {
            ChatCompletionMessageToolCalls::Function(call) => Some(call),
            _ => {
                tracing::warn!("Ignoring non-function tool call");
                None
            }
        });
    let tool_call = calls.next().map(|tc| {
        let arguments = if tc.function.arguments.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(&tc.function.arguments).unwrap_or_else(|e| {
                tracing::warn!(tool = %tc.function.name, "Tool arguments are not JSON: {}", e);
                json!({})
            })
        };
        ToolCall {
            id: tc.id,
            name: tc.function.name,
            arguments,
        }
    });
    let dropped = calls.count();
    if dropped > 0 {
        tracing::warn!(dropped, "Response proposed several tool calls, keeping the first");
    }

    let text = message.content.filter(|c| !c.trim().is_empty());
    Ok(AssistantTurn { text, tool_call })
}

#[async_trait]
impl ReasoningClient for OpenAiCompatClient {
    async fn converse(
        &self,
        history: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<AssistantTurn, LlmError> {
        let request = self.build_request(history, tools)?;
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited(body));
        }
        if status.is_server_error() {
            return Err(LlmError::Server {
                status: status.as_u16(),
                body,
            });
        }
        if !status.is_success() {
            return Err(LlmError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        decode_response(&body)
    }
}
