//! 工具目录
//!
//! ToolKind 是封闭的工具集合；ToolCatalog 是暴露给推理服务的 (name, description, parameters) 列表。
//! 构造 ToolDispatcher 时会用 `validate` 比对两者，防止目录与分发表不一致。

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::tools::schema::{
    parameters_schema, DoneArgs, NoArgs, PointArgs, PressKeyArgs, ScrollArgs, TypeTextArgs,
};

/// 终止型伪工具名
pub const DONE_TOOL: &str = "done";
/// 截图工具名（Observe 阶段也用它）
pub const SCREENSHOT_TOOL: &str = "take_screenshot";

/// 支持的工具种类（封闭集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    TakeScreenshot,
    LeftClick,
    DoubleClick,
    TypeText,
    PressKey,
    MoveMouse,
    Scroll,
    Done,
}

impl ToolKind {
    pub const ALL: [ToolKind; 8] = [
        ToolKind::TakeScreenshot,
        ToolKind::LeftClick,
        ToolKind::DoubleClick,
        ToolKind::TypeText,
        ToolKind::PressKey,
        ToolKind::MoveMouse,
        ToolKind::Scroll,
        ToolKind::Done,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::TakeScreenshot => SCREENSHOT_TOOL,
            ToolKind::LeftClick => "left_click",
            ToolKind::DoubleClick => "double_click",
            ToolKind::TypeText => "type_text",
            ToolKind::PressKey => "press_key",
            ToolKind::MoveMouse => "move_mouse",
            ToolKind::Scroll => "scroll",
            ToolKind::Done => DONE_TOOL,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    fn description(&self) -> &'static str {
        match self {
            ToolKind::TakeScreenshot => "Take a screenshot of the current screen.",
            ToolKind::LeftClick => "Left-click at screen coordinates (x, y).",
            ToolKind::DoubleClick => "Double-click at screen coordinates (x, y).",
            ToolKind::TypeText => "Type the given text string on the keyboard.",
            ToolKind::PressKey => "Press a key or key combo (e.g. 'enter', 'ctrl+c', 'alt+F2').",
            ToolKind::MoveMouse => {
                "Move the mouse cursor to screen coordinates (x, y) without clicking."
            }
            ToolKind::Scroll => {
                "Scroll at screen coordinates (x, y) in a direction. Use for scrolling web pages, documents, etc."
            }
            ToolKind::Done => {
                "Call this when the task is complete. Provide a summary of what you accomplished."
            }
        }
    }

    fn parameters(&self) -> Value {
        match self {
            ToolKind::TakeScreenshot => parameters_schema::<NoArgs>(),
            ToolKind::LeftClick | ToolKind::DoubleClick | ToolKind::MoveMouse => {
                parameters_schema::<PointArgs>()
            }
            ToolKind::TypeText => parameters_schema::<TypeTextArgs>(),
            ToolKind::PressKey => parameters_schema::<PressKeyArgs>(),
            ToolKind::Scroll => parameters_schema::<ScrollArgs>(),
            ToolKind::Done => parameters_schema::<DoneArgs>(),
        }
    }

    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// 暴露给推理服务的单个工具声明
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog declares unsupported tool '{0}'")]
    Unsupported(String),

    #[error("catalog declares tool '{0}' more than once")]
    Duplicate(String),

    #[error("catalog is missing tool '{0}'")]
    Missing(&'static str),
}

/// 工具目录
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    specs: Vec<ToolSpec>,
}

impl ToolCatalog {
    pub fn new(specs: Vec<ToolSpec>) -> Self {
        Self { specs }
    }

    /// 由 ToolKind::ALL 生成的完整桌面工具目录
    pub fn desktop() -> Self {
        Self::new(ToolKind::ALL.iter().map(ToolKind::spec).collect())
    }

    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.iter().any(|s| s.name == name)
    }

    /// 目录中的每个名字都必须能分发，且每个 ToolKind 恰好出现一次
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for spec in &self.specs {
            let kind = ToolKind::from_name(&spec.name)
                .ok_or_else(|| CatalogError::Unsupported(spec.name.clone()))?;
            if !seen.insert(kind) {
                return Err(CatalogError::Duplicate(spec.name.clone()));
            }
        }
        match ToolKind::ALL.iter().find(|k| !seen.contains(*k)) {
            Some(missing) => Err(CatalogError::Missing(missing.name())),
            None => Ok(()),
        }
    }
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::desktop()
    }
}
