//! 工具层：桌面工具目录、参数 Schema、封闭动作类型与分发器

pub mod action;
pub mod catalog;
pub mod dispatcher;
pub mod schema;

pub use action::DesktopAction;
pub use catalog::{CatalogError, ToolCatalog, ToolKind, ToolSpec, DONE_TOOL, SCREENSHOT_TOOL};
pub use dispatcher::{ToolDispatcher, ToolResult};
