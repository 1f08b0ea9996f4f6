//! 桌面动作：工具调用解码后的封闭类型

use serde_json::Value;

use crate::desktop::ScrollDirection;
use crate::tools::catalog::ToolKind;
use crate::tools::schema::{DoneArgs, PointArgs, PressKeyArgs, ScrollArgs, TypeTextArgs};

/// replay 标签里文本参数的最大字符数
const LABEL_TEXT_CHARS: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesktopAction {
    TakeScreenshot,
    LeftClick { x: i32, y: i32 },
    DoubleClick { x: i32, y: i32 },
    TypeText { text: String },
    PressKey { key: String },
    MoveMouse { x: i32, y: i32 },
    Scroll { x: i32, y: i32, direction: ScrollDirection, amount: u32 },
    Done { summary: String },
}

impl DesktopAction {
    /// 按工具种类解码参数；`null` 视为空对象。`done` 缺少 summary 时退化为 "Task complete"
    pub fn parse(kind: ToolKind, args: &Value) -> Result<Self, serde_json::Error> {
        let args = match args {
            Value::Null => Value::Object(Default::default()),
            other => other.clone(),
        };
        let action = match kind {
            ToolKind::TakeScreenshot => DesktopAction::TakeScreenshot,
            ToolKind::LeftClick => {
                let PointArgs { x, y } = serde_json::from_value(args)?;
                DesktopAction::LeftClick { x, y }
            }
            ToolKind::DoubleClick => {
                let PointArgs { x, y } = serde_json::from_value(args)?;
                DesktopAction::DoubleClick { x, y }
            }
            ToolKind::TypeText => {
                let TypeTextArgs { text } = serde_json::from_value(args)?;
                DesktopAction::TypeText { text }
            }
            ToolKind::PressKey => {
                let PressKeyArgs { key } = serde_json::from_value(args)?;
                DesktopAction::PressKey { key }
            }
            ToolKind::MoveMouse => {
                let PointArgs { x, y } = serde_json::from_value(args)?;
                DesktopAction::MoveMouse { x, y }
            }
            ToolKind::Scroll => {
                let ScrollArgs { x, y, direction, amount } = serde_json::from_value(args)?;
                DesktopAction::Scroll { x, y, direction, amount }
            }
            ToolKind::Done => {
                let summary = serde_json::from_value::<DoneArgs>(args)
                    .map(|a| a.summary)
                    .unwrap_or_else(|_| "Task complete".to_string());
                DesktopAction::Done { summary }
            }
        };
        Ok(action)
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            DesktopAction::TakeScreenshot => ToolKind::TakeScreenshot,
            DesktopAction::LeftClick { .. } => ToolKind::LeftClick,
            DesktopAction::DoubleClick { .. } => ToolKind::DoubleClick,
            DesktopAction::TypeText { .. } => ToolKind::TypeText,
            DesktopAction::PressKey { .. } => ToolKind::PressKey,
            DesktopAction::MoveMouse { .. } => ToolKind::MoveMouse,
            DesktopAction::Scroll { .. } => ToolKind::Scroll,
            DesktopAction::Done { .. } => ToolKind::Done,
        }
    }

    /// 简短标签，用于 replay 帧与日志
    pub fn label(&self) -> String {
        let name = self.kind().name();
        match self {
            DesktopAction::TakeScreenshot => name.to_string(),
            DesktopAction::LeftClick { x, y }
            | DesktopAction::DoubleClick { x, y }
            | DesktopAction::MoveMouse { x, y } => format!("{name}({x}, {y})"),
            DesktopAction::TypeText { text } => format!("{name}({:?})", truncate(text)),
            DesktopAction::PressKey { key } => format!("{name}({key})"),
            DesktopAction::Scroll { x, y, direction, amount } => {
                format!("{name}({x}, {y}, {}, {amount})", direction.as_str())
            }
            DesktopAction::Done { .. } => name.to_string(),
        }
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() > LABEL_TEXT_CHARS {
        format!("{}...", text.chars().take(LABEL_TEXT_CHARS).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_click() {
        let action = DesktopAction::parse(ToolKind::LeftClick, &json!({"x": 10, "y": 20})).unwrap();
        assert_eq!(action, DesktopAction::LeftClick { x: 10, y: 20 });
        assert_eq!(action.label(), "left_click(10, 20)");
    }

    #[test]
    fn test_parse_rejects_missing_coordinate() {
        assert!(DesktopAction::parse(ToolKind::DoubleClick, &json!({"x": 10})).is_err());
    }

    #[test]
    fn test_parse_screenshot_accepts_null_args() {
        let action = DesktopAction::parse(ToolKind::TakeScreenshot, &Value::Null).unwrap();
        assert_eq!(action, DesktopAction::TakeScreenshot);
    }

    #[test]
    fn test_done_without_summary_falls_back() {
        let action = DesktopAction::parse(ToolKind::Done, &json!({})).unwrap();
        assert_eq!(
            action,
            DesktopAction::Done {
                summary: "Task complete".to_string()
            }
        );
    }

    #[test]
    fn test_scroll_label() {
        let action = DesktopAction::parse(
            ToolKind::Scroll,
            &json!({"x": 5, "y": 6, "direction": "down", "amount": 2}),
        )
        .unwrap();
        assert_eq!(action.label(), "scroll(5, 6, down, 2)");
    }

    #[test]
    fn test_type_text_label_is_truncated() {
        let long = "a".repeat(100);
        let action = DesktopAction::TypeText { text: long };
        assert!(action.label().ends_with("...\")"));
    }
}
