//! 入站消息泵：逐行读取 NDJSON，任务送入队列，控制消息置位终止信号
//!
//! 无法解析的行记日志后跳过；输入结束（EOF）时丢弃发送端，调度器据此感知队列关闭。

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

use crate::channel::message::{InboundMessage, TaskAssignment};
use crate::core::TerminationSignal;

pub async fn pump_messages<R>(
    reader: R,
    tx: mpsc::Sender<TaskAssignment>,
    termination: TerminationSignal,
) where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        let next = tokio::select! {
            biased;
            _ = termination.wait() => break,
            next = lines.next_line() => next,
        };
        let line = match next {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::info!("Inbound stream closed");
                break;
            }
            Err(e) => {
                tracing::error!("Failed to read inbound stream: {}", e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<InboundMessage>(line) {
            Ok(InboundMessage::Task(task)) => {
                tracing::info!(task_id = %task.task_id, "Task assigned");
                if tx.send(task).await.is_err() {
                    tracing::debug!("Task queue closed, stopping inbound pump");
                    break;
                }
            }
            Ok(InboundMessage::Control(control)) => termination.terminate(control.reason()),
            Err(e) => tracing::warn!(line, "Skipping malformed inbound message: {}", e),
        }
    }
}
