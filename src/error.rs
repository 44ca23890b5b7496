// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 错误分类
//!
//! - MediaError:     视频源打开失败, 阻止进入运行状态
//! - SampleError:    采样失败, 跳过本轮
//! - InferenceError: 网络/后端失败, 保留上一帧叠加层
//! - CaptureError:   截图导出失败

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Camera access denied: {0}")]
    PermissionDenied(String),
    #[error("Video source unavailable: {0}")]
    Unavailable(String),
    #[error("Failed to read video source: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode video frame: {0}")]
    Decode(#[from] image::ImageError),
}

#[derive(Error, Debug)]
pub enum SampleError {
    #[error("Video source has no dimensions yet")]
    NotReady,
    #[error("Failed to encode sampled frame: {0}")]
    Encode(#[from] image::ImageError),
}

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Backend unreachable: {0}")]
    Transport(String),
    #[error("Backend returned HTTP {0}")]
    Status(u16),
    #[error("Malformed response body: {0}")]
    Body(String),
}

/// 单轮推理失败 (采样或推理)
#[derive(Error, Debug)]
pub enum CycleError {
    #[error(transparent)]
    Sample(#[from] SampleError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("No video frame to capture")]
    NoFrame,
    #[error("Failed to encode capture: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Failed to write capture: {0}")]
    Io(#[from] std::io::Error),
}
