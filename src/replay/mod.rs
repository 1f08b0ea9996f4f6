//! 回放：每轮截图的低分辨率序列，会话结束时连同 manifest 一起导出

pub mod buffer;
pub mod export;
pub mod manifest;

pub use buffer::{ReplayBuffer, ReplayFrame};
pub use export::{
    HttpUploadTransport, LocalExporter, RemoteExporter, ReplayError, ReplayExport, ReplayExporter,
    UploadTransport, UploadUrls,
};
pub use manifest::{frame_file_name, Manifest, ManifestFrame, MANIFEST_FILE};
