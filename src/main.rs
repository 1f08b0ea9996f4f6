//! Deskhand Worker 入口
//!
//! 初始化日志与配置，创建远程沙箱并推送 sandbox_ready，随后从 stdin 接收任务、
//! 运行调度循环直到终止，最后关闭沙箱。事件以 NDJSON 写到 stdout。
//!
//! 编排端在终止后通常不会关闭 stdin；tokio 的 stdin 读取阻塞在独立线程上无法取消，
//! 因此收尾完成后显式 `process::exit`，不等待运行时回收该线程。

use std::sync::Arc;

use anyhow::Context;
use deskhand::channel::{pump_messages, EventSink, StdioSink, TaskAssignment, WorkerEvent};
use deskhand::config::load_config;
use deskhand::core::{AgentError, TerminationSignal, WorkerBuilder};
use deskhand::desktop::HttpDesktop;
use deskhand::observability;
use tokio::io::BufReader;
use tokio::sync::mpsc;

/// 入站任务队列容量
const TASK_QUEUE_CAPACITY: usize = 64;

#[tokio::main]
async fn main() {
    observability::init();
    let sink: Arc<dyn EventSink> = Arc::new(StdioSink);

    let code = match run(sink.clone()).await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("{:#}", e);
            1
        }
    };
    std::process::exit(code);
}

async fn run(sink: Arc<dyn EventSink>) -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(Into::into);
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            let err = AgentError::Config(e.to_string());
            sink.emit(&WorkerEvent::Error {
                error: err.to_string(),
            });
            return Err(err).context("Failed to load config");
        }
    };

    let desktop = match HttpDesktop::connect(
        &config.desktop.base_url,
        config.desktop.request_timeout_secs,
    )
    .await
    {
        Ok(desktop) => Arc::new(desktop),
        Err(e) => {
            let err = AgentError::Bootstrap(e.to_string());
            sink.emit(&WorkerEvent::Error {
                error: err.to_string(),
            });
            return Err(err).context("Failed to create sandbox");
        }
    };
    let info = desktop.info().clone();
    sink.emit(&WorkerEvent::SandboxReady {
        sandbox_id: info.sandbox_id,
        stream_url: info.stream_url,
    });

    let termination = TerminationSignal::new();
    termination.install_signal_handlers();

    let scheduler = match WorkerBuilder::new(config.clone()).build_scheduler(
        desktop.clone(),
        sink.clone(),
        termination.clone(),
    ) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            sink.emit(&WorkerEvent::Error {
                error: e.to_string(),
            });
            desktop.close().await;
            return Err(e).context("Failed to build worker");
        }
    };

    let (tx, rx) = mpsc::channel(TASK_QUEUE_CAPACITY);
    if let Some(description) = config.worker.task_description.clone() {
        let task = TaskAssignment {
            task_id: config
                .worker
                .task_id
                .clone()
                .unwrap_or_else(|| "initial".to_string()),
            description,
            whiteboard: None,
        };
        tx.send(task).await.context("Task queue closed")?;
    }
    tokio::spawn(pump_messages(
        BufReader::new(tokio::io::stdin()),
        tx,
        termination.clone(),
    ));

    scheduler.run(rx).await;
    desktop.close().await;
    tracing::info!(reason = ?termination.reason(), "Worker exited");
    Ok(())
}
