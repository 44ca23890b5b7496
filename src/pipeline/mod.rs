// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 检测流水线 (Detection Pipeline)
///
/// 主线程按显示帧驱动, 推理与健康检查各自在独立线程, 通过通道通信:
/// - sampler: 视频帧 → 320px JPEG
/// - client:  POST /predict, GET /health (ureq)
/// - health:  后端可用性监控 (独立线程)
/// - driver:  单飞循环状态机 (纯逻辑)
/// - worker:  推理线程 (独立线程)
/// - session: 以上组件的组合
pub mod client;
pub mod driver;
pub mod health;
pub mod sampler;
pub mod session;
pub mod worker;

pub use client::{HealthOutcome, HealthProbe, HttpInferenceClient, InferenceTransport};
pub use driver::{CycleTicket, LoopDriver, LoopState, TickOutcome};
pub use health::{
    spawn_availability_monitor, AvailabilityMonitor, Connectivity, ConnectivityState,
    MonitorHandle,
};
pub use sampler::{FrameSampler, ImageBlob};
pub use session::{DetectionControls, DetectionSession, SessionStats};
pub use worker::{InferenceJob, InferenceReply, InferenceWorker};
