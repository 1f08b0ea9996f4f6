//! 终止信号
//!
//! 整个 Worker 共享一个只能置位、不能清除的终止条件：
//! - 编排端发来「没有更多任务」或「会话完成」
//! - 任务输入流关闭（stdin EOF）
//! - 进程收到 Ctrl+C / SIGTERM
//!
//! 调度循环在每次轮询前检查，AgentLoop 在每轮开始时检查；正在进行的远程调用不会被打断。

use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

/// 终止原因（只记录第一次置位的原因）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// 编排端：没有剩余任务
    NoMoreTasks,
    /// 编排端：整个会话结束
    SessionComplete,
    /// 任务输入流已关闭
    InputClosed,
    /// 操作系统信号
    Signal,
}

/// 共享终止条件：clone 后指向同一个标志
#[derive(Clone, Debug, Default)]
pub struct TerminationSignal {
    token: CancellationToken,
    reason: Arc<OnceLock<TerminationReason>>,
}

impl TerminationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// 置位；重复调用无副作用，原因保持第一次的值
    pub fn terminate(&self, reason: TerminationReason) {
        if self.reason.set(reason).is_ok() {
            tracing::info!(?reason, "Termination requested");
        }
        self.token.cancel();
    }

    pub fn is_terminated(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn reason(&self) -> Option<TerminationReason> {
        self.reason.get().copied()
    }

    /// 等待置位
    pub async fn wait(&self) {
        self.token.cancelled().await;
    }

    /// 安装系统信号处理器 (Ctrl+C, SIGTERM)
    pub fn install_signal_handlers(&self) {
        let signal = self.clone();
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                tracing::info!("Received Ctrl+C, finishing current turn before exit...");
                signal.terminate(TerminationReason::Signal);
            }
        });

        #[cfg(unix)]
        {
            let signal = self.clone();
            tokio::spawn(async move {
                use tokio::signal::unix::{signal as unix_signal, SignalKind};
                if let Ok(mut sigterm) = unix_signal(SignalKind::terminate()) {
                    sigterm.recv().await;
                    tracing::info!("Received SIGTERM, finishing current turn before exit...");
                    signal.terminate(TerminationReason::Signal);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_starts_clear() {
        let signal = TerminationSignal::new();
        assert!(!signal.is_terminated());
        assert_eq!(signal.reason(), None);
    }

    #[test]
    fn test_clones_share_state() {
        let signal = TerminationSignal::new();
        let reader = signal.clone();
        signal.terminate(TerminationReason::NoMoreTasks);
        assert!(reader.is_terminated());
        assert_eq!(reader.reason(), Some(TerminationReason::NoMoreTasks));
    }

    #[test]
    fn test_first_reason_wins() {
        let signal = TerminationSignal::new();
        signal.terminate(TerminationReason::SessionComplete);
        signal.terminate(TerminationReason::InputClosed);
        assert_eq!(signal.reason(), Some(TerminationReason::SessionComplete));
        assert!(signal.is_terminated());
    }

    #[tokio::test]
    async fn test_wait_returns_after_terminate() {
        let signal = TerminationSignal::new();
        let waiter = signal.clone();
        let handle = tokio::spawn(async move { waiter.wait().await });
        signal.terminate(TerminationReason::Signal);
        handle.await.unwrap();
    }
}
