//! 共享白板：同一会话内多个 Worker 之间传递上下文的自由文本
//!
//! 存储由外部拥有，这里只做「先读再追加」，并发一致性由存储方负责。
//! 会话 API 不一定开放写入：写入被拒为 405 时视为只读存储，追加后的内容只通过
//! whiteboard_updated 事件交给编排端持久化。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug)]
pub enum WhiteboardError {
    #[error("whiteboard request failed: {0}")]
    Request(String),

    #[error("whiteboard returned status {0}")]
    Status(u16),

    /// 存储不接受写入，由编排端负责落盘
    #[error("whiteboard is read-only")]
    ReadOnly,
}

impl From<reqwest::Error> for WhiteboardError {
    fn from(e: reqwest::Error) -> Self {
        WhiteboardError::Request(e.to_string())
    }
}

#[async_trait]
pub trait WhiteboardStore: Send + Sync {
    async fn read(&self) -> Result<String, WhiteboardError>;

    async fn write(&self, content: &str) -> Result<(), WhiteboardError>;
}

/// 在现有内容后追加一条任务结果
pub fn append_entry(existing: &str, agent_id: &str, task_id: &str, result: &str) -> String {
    let entry = format!("[{agent_id}] {task_id}: {result}");
    let existing = existing.trim_end();
    if existing.is_empty() {
        entry
    } else {
        format!("{existing}\n{entry}")
    }
}

/// 进程内白板（单 Worker 或测试）
#[derive(Debug, Default)]
pub struct InMemoryWhiteboard {
    content: RwLock<String>,
}

impl InMemoryWhiteboard {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            content: RwLock::new(initial.into()),
        }
    }
}

#[async_trait]
impl WhiteboardStore for InMemoryWhiteboard {
    async fn read(&self) -> Result<String, WhiteboardError> {
        Ok(self.content.read().await.clone())
    }

    async fn write(&self, content: &str) -> Result<(), WhiteboardError> {
        *self.content.write().await = content.to_string();
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WhiteboardBody {
    #[serde(default)]
    content: String,
}

/// 会话 API 上的白板：GET `{api_base}/api/sessions/{session_id}/whiteboard` 读取 `{content}`；
/// 写入假定同一路径支持 PUT，不支持时返回 `WhiteboardError::ReadOnly`
pub struct HttpWhiteboard {
    client: Client,
    url: String,
}

impl HttpWhiteboard {
    pub fn new(api_base_url: &str, session_id: &str, timeout_secs: u64) -> Result<Self, WhiteboardError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: format!(
                "{}/api/sessions/{}/whiteboard",
                api_base_url.trim_end_matches('/'),
                session_id
            ),
        })
    }
}

#[async_trait]
impl WhiteboardStore for HttpWhiteboard {
    async fn read(&self) -> Result<String, WhiteboardError> {
        let resp = self.client.get(&self.url).send().await?;
        if !resp.status().is_success() {
            return Err(WhiteboardError::Status(resp.status().as_u16()));
        }
        Ok(resp.json::<WhiteboardBody>().await?.content)
    }

    async fn write(&self, content: &str) -> Result<(), WhiteboardError> {
        let body = WhiteboardBody {
            content: content.to_string(),
        };
        let resp = self.client.put(&self.url).json(&body).send().await?;
        if resp.status() == StatusCode::METHOD_NOT_ALLOWED {
            return Err(WhiteboardError::ReadOnly);
        }
        if !resp.status().is_success() {
            return Err(WhiteboardError::Status(resp.status().as_u16()));
        }
        Ok(())
    }
}
