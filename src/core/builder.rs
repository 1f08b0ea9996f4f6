//! Worker 构建器：按配置组装推理客户端、回放导出器、白板与调度器

use std::sync::Arc;

use crate::channel::EventSink;
use crate::config::{AppConfig, ReplayMode};
use crate::core::{AgentError, TaskScheduler, TerminationSignal};
use crate::desktop::DesktopSurface;
use crate::llm::{OpenAiCompatClient, ReasoningClient, RetryingReasoningClient};
use crate::replay::{HttpUploadTransport, LocalExporter, RemoteExporter, ReplayExporter};
use crate::tools::{ToolCatalog, ToolDispatcher};
use crate::whiteboard::{HttpWhiteboard, WhiteboardStore};

pub struct WorkerBuilder {
    config: AppConfig,
}

impl WorkerBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// OpenAI 兼容客户端外面包一层重试
    pub fn build_reasoning(&self) -> Result<Arc<dyn ReasoningClient>, AgentError> {
        let llm = &self.config.llm;
        let client = OpenAiCompatClient::new(
            &llm.base_url,
            &llm.model,
            llm.api_key.as_deref(),
            llm.request_timeout_secs,
        )
        .map_err(|e| AgentError::Config(format!("LLM client: {e}")))?
        .with_max_tokens(llm.max_tokens)
        .with_forced_tool_call(llm.force_tool_call);
        tracing::info!(model = %llm.model, base_url = %llm.base_url, "Reasoning client ready");
        Ok(Arc::new(RetryingReasoningClient::new(
            Arc::new(client),
            llm.retry.to_retry_config(),
        )))
    }

    pub fn build_dispatcher(
        &self,
        surface: Arc<dyn DesktopSurface>,
    ) -> Result<Arc<ToolDispatcher>, AgentError> {
        let dispatcher = ToolDispatcher::new(surface, ToolCatalog::desktop())
            .map_err(|e| AgentError::Catalog(e.to_string()))?;
        Ok(Arc::new(dispatcher))
    }

    /// 回放关闭时返回 None
    pub fn build_exporter(&self) -> Result<Option<ReplayExporter>, AgentError> {
        let replay = &self.config.replay;
        if !replay.enabled {
            return Ok(None);
        }
        let exporter = match replay.mode {
            ReplayMode::Local => ReplayExporter::Local(LocalExporter::new(
                replay.local_dir.clone(),
                &replay.local_url_prefix,
            )),
            ReplayMode::Remote => {
                if replay.public_url_prefix.trim().is_empty() {
                    return Err(AgentError::Config(
                        "replay.public_url_prefix is required for remote replay".to_string(),
                    ));
                }
                let transport =
                    HttpUploadTransport::new(&replay.api_base_url, replay.upload_timeout_secs)
                        .map_err(|e| AgentError::Config(format!("replay upload: {e}")))?;
                ReplayExporter::Remote(RemoteExporter::new(
                    Arc::new(transport),
                    &replay.public_url_prefix,
                ))
            }
        };
        Ok(Some(exporter))
    }

    pub fn build_whiteboard(&self) -> Result<Option<Arc<dyn WhiteboardStore>>, AgentError> {
        let wb = &self.config.whiteboard;
        if !wb.enabled {
            return Ok(None);
        }
        let store = HttpWhiteboard::new(
            &wb.api_base_url,
            &self.config.worker.session_id,
            wb.request_timeout_secs,
        )
        .map_err(|e| AgentError::Config(format!("whiteboard: {e}")))?;
        Ok(Some(Arc::new(store)))
    }

    /// 组装调度器
    pub fn build_scheduler(
        &self,
        surface: Arc<dyn DesktopSurface>,
        sink: Arc<dyn EventSink>,
        termination: TerminationSignal,
    ) -> Result<TaskScheduler, AgentError> {
        let mut scheduler = TaskScheduler::new(
            self.build_dispatcher(surface)?,
            self.build_reasoning()?,
            sink,
            termination,
            self.config.scheduler_settings(),
        );
        if let Some(exporter) = self.build_exporter()? {
            scheduler = scheduler.with_replay_exporter(exporter);
        }
        if let Some(store) = self.build_whiteboard()? {
            scheduler = scheduler.with_whiteboard(store);
        }
        Ok(scheduler)
    }
}
