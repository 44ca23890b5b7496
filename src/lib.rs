// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod config; // 命令行参数
pub mod detection; // 检测数据结构
pub mod error; // 错误分类
pub mod input; // 视频输入系统
pub mod pipeline; // 检测流水线
pub mod renderer; // 叠加层/截图/窗口
pub mod ui_config; // JSON配置文件

pub use crate::config::Args;
pub use crate::error::{CaptureError, CycleError, InferenceError, MediaError, SampleError};
pub use crate::pipeline::{DetectionControls, DetectionSession, HttpInferenceClient, SessionStats};
pub use crate::ui_config::ClientConfig;

/// 截图文件前缀
pub const CAPTURE_PREFIX: &str = "VisionX-Capture-";

/// 截图文件名: VisionX-Capture-<unix毫秒>.png
pub fn capture_file_name() -> String {
    format!(
        "{}{}.png",
        CAPTURE_PREFIX,
        chrono::Utc::now().timestamp_millis()
    )
}

/// 阈值滑块百分比 → 请求阈值 (70 → 0.7)
pub fn threshold_from_percent(percent: u32) -> f32 {
    percent.min(100) as f32 / 100.0
}

/// 初始化日志, 未设置 RUST_LOG 时默认 info
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
