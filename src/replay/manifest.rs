//! 回放清单（manifest.json）与确定性文件名

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use crate::replay::buffer::ReplayFrame;

pub const MANIFEST_FILE: &str = "manifest.json";

/// `frame-0000.jpg`、`frame-0001.jpg`……
pub fn frame_file_name(index: usize) -> String {
    format!("frame-{index:04}.jpg")
}

/// 远端存储中的对象前缀
pub fn replay_prefix(session_id: &str, agent_id: &str) -> String {
    format!("replays/{session_id}/{agent_id}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub session_id: String,
    pub agent_id: String,
    pub frame_count: usize,
    pub frames: Vec<ManifestFrame>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFrame {
    pub index: usize,
    /// ISO-8601 UTC
    pub timestamp: String,
    pub url: String,
    pub action: String,
}

impl Manifest {
    /// 由完整帧序列构建；url_for 把文件名映射为可访问的 URL
    pub fn build(
        session_id: &str,
        agent_id: &str,
        frames: &[ReplayFrame],
        url_for: impl Fn(&str) -> String,
    ) -> Self {
        let frames: Vec<ManifestFrame> = frames
            .iter()
            .map(|f| ManifestFrame {
                index: f.index,
                timestamp: f.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
                url: url_for(&frame_file_name(f.index)),
                action: f.action.clone(),
            })
            .collect();
        Self {
            session_id: session_id.to_string(),
            agent_id: agent_id.to_string(),
            frame_count: frames.len(),
            frames,
        }
    }
}
