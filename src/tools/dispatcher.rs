//! 工具分发器
//!
//! 持有注入的 DesktopSurface 与已校验的 ToolCatalog；execute(name, args) 永不返回错误：
//! 未知工具、参数错误、桌面调用失败都转成文本结果交给推理引擎自行纠正。
//! 不做分发层重试；每次调用输出结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::desktop::{DesktopError, DesktopSurface};
use crate::tools::action::DesktopAction;
use crate::tools::catalog::{CatalogError, ToolCatalog, ToolKind};

/// 工具结果：文本或图片，会话组装时据此决定如何呈现
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResult {
    Text(String),
    Image { media_type: String, data: Vec<u8> },
}

impl ToolResult {
    pub fn png(data: Vec<u8>) -> Self {
        ToolResult::Image {
            media_type: "image/png".to_string(),
            data,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ToolResult::Text(t) => Some(t),
            ToolResult::Image { .. } => None,
        }
    }

    fn outcome(&self) -> &'static str {
        match self {
            ToolResult::Text(_) => "text",
            ToolResult::Image { .. } => "image",
        }
    }
}

pub struct ToolDispatcher {
    surface: Arc<dyn DesktopSurface>,
    catalog: ToolCatalog,
}

impl ToolDispatcher {
    /// 构造时校验目录与 ToolKind 一致
    pub fn new(surface: Arc<dyn DesktopSurface>, catalog: ToolCatalog) -> Result<Self, CatalogError> {
        catalog.validate()?;
        Ok(Self { surface, catalog })
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// 按名称执行工具
    pub async fn execute(&self, name: &str, args: &Value) -> ToolResult {
        let Some(kind) = ToolKind::from_name(name) else {
            tracing::warn!(tool = name, "Unknown tool requested");
            return ToolResult::Text(format!("Unknown tool: {name}"));
        };
        match DesktopAction::parse(kind, args) {
            Ok(action) => self.execute_action(&action).await,
            Err(e) => {
                tracing::warn!(tool = name, "Invalid tool arguments: {}", e);
                ToolResult::Text(format!("Invalid arguments for {name}: {e}"))
            }
        }
    }

    /// 执行已解码的动作；桌面调用失败转为 "Error: ..." 文本
    pub async fn execute_action(&self, action: &DesktopAction) -> ToolResult {
        let start = Instant::now();
        let name = action.kind().name();
        let result = self.perform(action).await;

        let (ok, outcome) = match &result {
            Ok(r) => (true, r.outcome()),
            Err(_) => (false, "error"),
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": name,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "action": action.label(),
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        result.unwrap_or_else(|e| ToolResult::Text(format!("Error: {name} failed: {e}")))
    }

    async fn perform(&self, action: &DesktopAction) -> Result<ToolResult, DesktopError> {
        let surface = &self.surface;
        let text = match action {
            DesktopAction::TakeScreenshot => return Ok(ToolResult::png(surface.screenshot().await?)),
            DesktopAction::LeftClick { x, y } => {
                surface.left_click(*x, *y).await?;
                format!("Clicked at ({x}, {y})")
            }
            DesktopAction::DoubleClick { x, y } => {
                surface.double_click(*x, *y).await?;
                format!("Double-clicked at ({x}, {y})")
            }
            DesktopAction::TypeText { text } => {
                type_lines(surface.as_ref(), text).await?;
                format!("Typed: {text}")
            }
            DesktopAction::PressKey { key } => {
                surface.press(key).await?;
                format!("Pressed: {key}")
            }
            DesktopAction::MoveMouse { x, y } => {
                surface.move_mouse(*x, *y).await?;
                format!("Moved mouse to ({x}, {y})")
            }
            DesktopAction::Scroll { x, y, direction, amount } => {
                surface.move_mouse(*x, *y).await?;
                surface.scroll(*direction, *amount).await?;
                format!("Scrolled {} by {amount} at ({x}, {y})", direction.as_str())
            }
            DesktopAction::Done { summary } => summary.clone(),
        };
        Ok(ToolResult::Text(text))
    }
}

/// 多行文本：每段单独写入，段与段之间按一次 Enter；空段不写
async fn type_lines(surface: &dyn DesktopSurface, text: &str) -> Result<(), DesktopError> {
    let parts: Vec<&str> = text.split('\n').collect();
    let last = parts.len() - 1;
    for (i, part) in parts.iter().enumerate() {
        if !part.is_empty() {
            surface.write(part).await?;
        }
        if i < last {
            surface.press("Enter").await?;
        }
    }
    Ok(())
}
