//! 事件出口
//!
//! StdioSink：每个事件一行 JSON 写到 stdout（日志在 stderr，互不干扰）；
//! ChannelSink：写入 mpsc，供测试或进程内消费者读取。

use std::io::Write;

use tokio::sync::mpsc;

use crate::channel::message::WorkerEvent;

/// 事件出口；发送失败只记日志，不影响调用方
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &WorkerEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StdioSink;

impl EventSink for StdioSink {
    fn emit(&self, event: &WorkerEvent) {
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("Failed to serialize event: {}", e);
                return;
            }
        };
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{line}").and_then(|_| out.flush()) {
            tracing::warn!("Failed to write event to stdout: {}", e);
        }
    }
}

/// 转发到无界通道
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<WorkerEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<WorkerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &WorkerEvent) {
        if self.tx.send(event.clone()).is_err() {
            tracing::debug!("Event receiver dropped");
        }
    }
}
