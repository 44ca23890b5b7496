// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 检测数据 (Detection data)
///
/// 后端返回的检测结果及其日志投影
/// - Detection:    标签 + 置信度 + 归一化框
/// - LogRow:       检测日志行
pub mod types;

pub use types::{project_log, Detection, DetectionBox, InferenceResponse, LogRow, PixelRect};
