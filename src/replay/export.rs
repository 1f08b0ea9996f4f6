//! 回放导出：本地目录或远端对象存储（预签名 URL）
//!
//! 导出在会话结束时执行一次。零帧时不做任何 I/O；任何失败只记日志并返回 None，从不向调用方抛错。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::replay::buffer::{ReplayBuffer, ReplayFrame};
use crate::replay::manifest::{frame_file_name, replay_prefix, Manifest, MANIFEST_FILE};

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("manifest serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid replay id: {0:?}")]
    InvalidId(String),

    #[error("upload url request failed: {0}")]
    UploadUrls(String),

    #[error("expected {expected} frame urls, got {got}")]
    UrlCountMismatch { expected: usize, got: usize },

    #[error("upload failed: {0}")]
    Upload(String),
}

impl From<reqwest::Error> for ReplayError {
    fn from(e: reqwest::Error) -> Self {
        ReplayError::Upload(e.to_string())
    }
}

/// 导出成功的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayExport {
    pub manifest_url: String,
    pub frame_count: usize,
}

/// 会话/agent id 会成为路径片段，只允许不含分隔符的普通名字
fn check_id(id: &str) -> Result<(), ReplayError> {
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
        return Err(ReplayError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// 写到本地目录 `<root>/<session>/<agent>/`，URL 为 `<url_prefix>/<session>/<agent>/<file>`
#[derive(Debug, Clone)]
pub struct LocalExporter {
    root: PathBuf,
    url_prefix: String,
}

impl LocalExporter {
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    async fn export(
        &self,
        frames: &[ReplayFrame],
        session_id: &str,
        agent_id: &str,
    ) -> Result<ReplayExport, ReplayError> {
        check_id(session_id)?;
        check_id(agent_id)?;
        let dir = self.root.join(session_id).join(agent_id);
        tokio::fs::create_dir_all(&dir).await?;

        for frame in frames {
            tokio::fs::write(dir.join(frame_file_name(frame.index)), &frame.jpeg).await?;
        }

        let base = format!("{}/{}/{}", self.url_prefix, session_id, agent_id);
        let manifest = Manifest::build(session_id, agent_id, frames, |file| format!("{base}/{file}"));
        tokio::fs::write(dir.join(MANIFEST_FILE), serde_json::to_vec_pretty(&manifest)?).await?;

        tracing::info!(dir = %dir.display(), frames = frames.len(), "Replay exported locally");
        Ok(ReplayExport {
            manifest_url: format!("{base}/{MANIFEST_FILE}"),
            frame_count: frames.len(),
        })
    }
}

/// 预签名上传 URL：每帧一个，外加 manifest
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrls {
    pub frame_urls: Vec<String>,
    pub manifest_url: String,
}

/// 远端导出的 I/O 边界
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn request_upload_urls(
        &self,
        session_id: &str,
        agent_id: &str,
        frame_count: usize,
    ) -> Result<UploadUrls, ReplayError>;

    async fn put(&self, url: &str, body: Vec<u8>, content_type: &str) -> Result<(), ReplayError>;
}

/// 通过会话 API 取预签名 URL，再逐个 PUT
pub struct HttpUploadTransport {
    client: Client,
    api_base_url: String,
}

impl HttpUploadTransport {
    pub fn new(api_base_url: &str, timeout_secs: u64) -> Result<Self, ReplayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl UploadTransport for HttpUploadTransport {
    async fn request_upload_urls(
        &self,
        session_id: &str,
        agent_id: &str,
        frame_count: usize,
    ) -> Result<UploadUrls, ReplayError> {
        let resp = self
            .client
            .post(format!("{}/api/replay/upload-urls", self.api_base_url))
            .json(&json!({
                "sessionId": session_id,
                "agentId": agent_id,
                "frameCount": frame_count,
            }))
            .send()
            .await
            .map_err(|e| ReplayError::UploadUrls(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ReplayError::UploadUrls(format!("{status}: {body}")));
        }
        resp.json::<UploadUrls>()
            .await
            .map_err(|e| ReplayError::UploadUrls(e.to_string()))
    }

    async fn put(&self, url: &str, body: Vec<u8>, content_type: &str) -> Result<(), ReplayError> {
        let resp = self
            .client
            .put(url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ReplayError::Upload(format!("{url} returned {status}")));
        }
        Ok(())
    }
}

/// 上传到对象存储；manifest 里写公开 URL `<public_url_prefix>/replays/<session>/<agent>/<file>`
pub struct RemoteExporter {
    transport: Arc<dyn UploadTransport>,
    public_url_prefix: String,
}

impl RemoteExporter {
    pub fn new(transport: Arc<dyn UploadTransport>, public_url_prefix: &str) -> Self {
        Self {
            transport,
            public_url_prefix: public_url_prefix.trim_end_matches('/').to_string(),
        }
    }

    async fn export(
        &self,
        frames: &[ReplayFrame],
        session_id: &str,
        agent_id: &str,
    ) -> Result<ReplayExport, ReplayError> {
        check_id(session_id)?;
        check_id(agent_id)?;
        let urls = self
            .transport
            .request_upload_urls(session_id, agent_id, frames.len())
            .await?;
        if urls.frame_urls.len() != frames.len() {
            return Err(ReplayError::UrlCountMismatch {
                expected: frames.len(),
                got: urls.frame_urls.len(),
            });
        }

        let uploads = frames
            .iter()
            .zip(&urls.frame_urls)
            .map(|(frame, url)| self.transport.put(url, frame.jpeg.clone(), "image/jpeg"));
        let failed: Vec<ReplayError> = join_all(uploads)
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect();
        if let Some(first) = failed.first() {
            tracing::warn!(
                failed = failed.len(),
                total = frames.len(),
                "Some replay frames failed to upload: {}",
                first
            );
        }

        let base = format!(
            "{}/{}",
            self.public_url_prefix,
            replay_prefix(session_id, agent_id)
        );
        let manifest = Manifest::build(session_id, agent_id, frames, |file| format!("{base}/{file}"));
        self.transport
            .put(&urls.manifest_url, serde_json::to_vec(&manifest)?, "application/json")
            .await?;

        tracing::info!(frames = frames.len(), "Replay uploaded");
        Ok(ReplayExport {
            manifest_url: format!("{base}/{MANIFEST_FILE}"),
            frame_count: frames.len(),
        })
    }
}

/// 按配置选定的导出目标
pub enum ReplayExporter {
    Local(LocalExporter),
    Remote(RemoteExporter),
}

impl ReplayExporter {
    /// 导出缓冲中的全部帧；零帧或失败时返回 None
    pub async fn export(
        &self,
        buffer: &ReplayBuffer,
        session_id: &str,
        agent_id: &str,
    ) -> Option<ReplayExport> {
        let frames = buffer.frames();
        if frames.is_empty() {
            tracing::info!(session_id, agent_id, "No replay frames captured, skipping export");
            return None;
        }
        let result = match self {
            ReplayExporter::Local(local) => local.export(&frames, session_id, agent_id).await,
            ReplayExporter::Remote(remote) => remote.export(&frames, session_id, agent_id).await,
        };
        match result {
            Ok(export) => Some(export),
            Err(e) => {
                tracing::error!(session_id, agent_id, "Replay export failed: {}", e);
                None
            }
        }
    }
}
