//! 远程桌面控制面
//!
//! Worker 只把桌面当作一组原语（截图 / 点击 / 输入 / 按键 / 滚动）来消费；
//! 具体实现通过 DesktopSurface 注入 ToolDispatcher，不做全局状态。

pub mod http;
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::HttpDesktop;
pub use mock::MockDesktop;

/// 桌面原语调用失败
#[derive(Error, Debug)]
pub enum DesktopError {
    #[error("desktop request failed: {0}")]
    Request(String),

    #[error("desktop returned status {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<reqwest::Error> for DesktopError {
    fn from(e: reqwest::Error) -> Self {
        DesktopError::Request(e.to_string())
    }
}

/// 滚动方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrollDirection::Up => "up",
            ScrollDirection::Down => "down",
        }
    }
}

/// 会话启动后得到的沙箱信息（sandbox_ready 事件的内容）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxInfo {
    pub sandbox_id: String,
    #[serde(default)]
    pub stream_url: String,
}

/// 远程桌面原语；所有方法都会改变远端状态（截图除外）
#[async_trait]
pub trait DesktopSurface: Send + Sync {
    /// 全分辨率 PNG
    async fn screenshot(&self) -> Result<Vec<u8>, DesktopError>;

    async fn left_click(&self, x: i32, y: i32) -> Result<(), DesktopError>;

    async fn double_click(&self, x: i32, y: i32) -> Result<(), DesktopError>;

    /// 原样输入一段不含换行的文本
    async fn write(&self, text: &str) -> Result<(), DesktopError>;

    /// 按键或组合键，如 "Enter"、"ctrl+c"
    async fn press(&self, key: &str) -> Result<(), DesktopError>;

    async fn move_mouse(&self, x: i32, y: i32) -> Result<(), DesktopError>;

    /// 在当前指针位置滚动
    async fn scroll(&self, direction: ScrollDirection, amount: u32) -> Result<(), DesktopError>;
}
