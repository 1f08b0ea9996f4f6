//! HTTP 桌面适配器
//!
//! 对接远程桌面控制服务：
//! - `POST {base}/sandboxes` 创建沙箱，返回 `{sandboxId, streamUrl}`
//! - `GET {base}/sandboxes/{id}/screenshot` 返回 PNG
//! - `POST {base}/sandboxes/{id}/actions` 执行一个原语（JSON，`action` 字段区分）
//! - `DELETE {base}/sandboxes/{id}` 销毁沙箱

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::{json, Value};

use crate::desktop::{DesktopError, DesktopSurface, SandboxInfo, ScrollDirection};

pub struct HttpDesktop {
    client: Client,
    sandbox_url: String,
    info: SandboxInfo,
}

impl HttpDesktop {
    /// 创建远程沙箱并返回绑定到它的适配器
    pub async fn connect(base_url: &str, timeout_secs: u64) -> Result<Self, DesktopError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        let base = base_url.trim_end_matches('/');
        let resp = client.post(format!("{base}/sandboxes")).send().await?;
        let info: SandboxInfo = check(resp).await?.json().await?;
        tracing::info!(sandbox_id = %info.sandbox_id, "Sandbox created");
        Ok(Self {
            client,
            sandbox_url: format!("{base}/sandboxes/{}", info.sandbox_id),
            info,
        })
    }

    pub fn info(&self) -> &SandboxInfo {
        &self.info
    }

    /// 销毁沙箱；失败只记录日志
    pub async fn close(&self) {
        match self.client.delete(&self.sandbox_url).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(sandbox_id = %self.info.sandbox_id, "Sandbox closed");
            }
            Ok(resp) => {
                tracing::warn!(status = resp.status().as_u16(), "Sandbox close rejected");
            }
            Err(e) => tracing::warn!("Sandbox close failed: {}", e),
        }
    }

    async fn action(&self, body: Value) -> Result<(), DesktopError> {
        let resp = self
            .client
            .post(format!("{}/actions", self.sandbox_url))
            .json(&body)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}

async fn check(resp: Response) -> Result<Response, DesktopError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(DesktopError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl DesktopSurface for HttpDesktop {
    async fn screenshot(&self) -> Result<Vec<u8>, DesktopError> {
        let resp = self
            .client
            .get(format!("{}/screenshot", self.sandbox_url))
            .send()
            .await?;
        let bytes = check(resp).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn left_click(&self, x: i32, y: i32) -> Result<(), DesktopError> {
        self.action(json!({ "action": "left_click", "x": x, "y": y })).await
    }

    async fn double_click(&self, x: i32, y: i32) -> Result<(), DesktopError> {
        self.action(json!({ "action": "double_click", "x": x, "y": y })).await
    }

    async fn write(&self, text: &str) -> Result<(), DesktopError> {
        self.action(json!({ "action": "write", "text": text })).await
    }

    async fn press(&self, key: &str) -> Result<(), DesktopError> {
        self.action(json!({ "action": "press", "key": key })).await
    }

    async fn move_mouse(&self, x: i32, y: i32) -> Result<(), DesktopError> {
        self.action(json!({ "action": "move_mouse", "x": x, "y": y })).await
    }

    async fn scroll(&self, direction: ScrollDirection, amount: u32) -> Result<(), DesktopError> {
        self.action(json!({
            "action": "scroll",
            "direction": direction.as_str(),
            "amount": amount,
        }))
        .await
    }
}
