//! 回放缓冲：把每轮截图缩到 320x180、JPEG 质量 30 后按顺序保存
//!
//! 回放只是审计材料，刻意有损；采集失败只记日志并丢弃该帧，不影响主循环。
//! 解码、缩放与编码是 CPU 密集操作，放到 blocking 线程池执行。

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::ImageError;

pub const FRAME_WIDTH: u32 = 320;
pub const FRAME_HEIGHT: u32 = 180;
pub const JPEG_QUALITY: u8 = 30;

/// 一帧回放
#[derive(Debug, Clone)]
pub struct ReplayFrame {
    /// 从 0 开始，采集时分配，连续
    pub index: usize,
    pub jpeg: Vec<u8>,
    pub timestamp: DateTime<Utc>,
    /// 该帧所展示的是哪个动作的结果
    pub action: String,
}

/// 会话级回放缓冲（AgentLoop 采集，调度器在会话结束时导出）
#[derive(Debug, Default)]
pub struct ReplayBuffer {
    frames: Mutex<Vec<ReplayFrame>>,
}

impl ReplayBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 缩放并重编码一张截图后追加；失败时丢弃该帧
    pub async fn capture(&self, raw: Vec<u8>, action: &str) {
        let jpeg = match tokio::task::spawn_blocking(move || downsample(&raw)).await {
            Ok(Ok(jpeg)) => jpeg,
            Ok(Err(e)) => {
                tracing::warn!(action, "Failed to capture replay frame: {}", e);
                return;
            }
            Err(e) => {
                tracing::warn!(action, "Replay encoder task failed: {}", e);
                return;
            }
        };
        let Ok(mut frames) = self.frames.lock() else {
            tracing::warn!(action, "Replay buffer lock poisoned, frame dropped");
            return;
        };
        let index = frames.len();
        frames.push(ReplayFrame {
            index,
            jpeg,
            timestamp: Utc::now(),
            action: action.to_string(),
        });
        tracing::debug!(index, action, "Replay frame captured");
    }

    pub fn frame_count(&self) -> usize {
        self.frames.lock().map(|f| f.len()).unwrap_or_default()
    }

    /// 当前所有帧的快照（按 index 排序）
    pub fn frames(&self) -> Vec<ReplayFrame> {
        self.frames.lock().map(|f| f.clone()).unwrap_or_default()
    }
}

fn downsample(raw: &[u8]) -> Result<Vec<u8>, ImageError> {
    let img = image::load_from_memory(raw)?;
    let small = img
        .resize_exact(FRAME_WIDTH, FRAME_HEIGHT, FilterType::Lanczos3)
        .to_rgb8();
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    encoder.encode_image(&small)?;
    Ok(out)
}
