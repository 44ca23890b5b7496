// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 摄像头输入模块 - 本地摄像头视频源
//!
//! 处理本地摄像头输入,支持 DirectShow(Windows) / AVFoundation(macOS) / V4L2(Linux)

use super::decode_filter::DecodeFilter;
use super::{FrameSlot, FrameSource, VideoFrame};
use crate::error::MediaError;
use ez_ffmpeg::core::context::null_output::create_null_output;
use ez_ffmpeg::filter::frame_pipeline_builder::FramePipelineBuilder;
use ez_ffmpeg::{AVMediaType, FfmpegContext, Input};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// 摄像头打开超时
const OPEN_TIMEOUT: Duration = Duration::from_secs(10);

/// 摄像头请求参数
#[derive(Clone, Debug)]
pub struct CameraConfig {
    pub device_index: usize,
    pub device_name: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

/// 摄像头视频源
pub struct CameraSource {
    config: CameraConfig,
    slot: FrameSlot,
    running: Arc<AtomicBool>,
}

impl CameraSource {
    /// 打开摄像头, 直到FFmpeg上下文启动成功才返回
    pub fn open(config: CameraConfig) -> Result<Self, MediaError> {
        let camera_url = format_camera_url(config.device_index, &config.device_name);
        log::info!("📷 打开摄像头: {} ({})", config.device_name, camera_url);

        let slot = FrameSlot::new();
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), String>>(1);

        let filter = DecodeFilter::new(slot.clone(), running.clone());
        let video_size = format!("{}x{}", config.width, config.height);
        let frame_rate = config.frame_rate.to_string();

        std::thread::spawn(move || {
            // 构建帧处理管线
            let pipe: FramePipelineBuilder = AVMediaType::AVMEDIA_TYPE_VIDEO.into();
            let pipe = pipe.filter("decode", Box::new(filter));
            let out = create_null_output().add_frame_pipeline(pipe);

            let input = Input::new(camera_url.as_str())
                .set_format(capture_format())
                .set_input_opts(
                    [
                        ("framerate", frame_rate.as_str()),
                        ("video_size", video_size.as_str()),
                    ]
                    .into(),
                );

            let ctx = match FfmpegContext::builder()
                .input(input)
                .filter_desc("format=rgba")
                .output(out)
                .build()
            {
                Ok(c) => c,
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
            };

            let sch = match ctx.start() {
                Ok(s) => s,
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));

            // 等待解码结束 (停止后过滤器返回错误)
            let _ = sch.wait();
            log::info!("📹 摄像头解码循环结束");
        });

        match ready_rx.recv_timeout(OPEN_TIMEOUT) {
            Ok(Ok(())) => {
                log::info!("✅ 摄像头连接成功,开始采集!");
                Ok(Self {
                    config,
                    slot,
                    running,
                })
            }
            Ok(Err(message)) => {
                running.store(false, Ordering::Relaxed);
                let lower = message.to_lowercase();
                if lower.contains("permission") || lower.contains("denied") {
                    Err(MediaError::PermissionDenied(message))
                } else {
                    Err(MediaError::Unavailable(message))
                }
            }
            Err(_) => {
                running.store(false, Ordering::Relaxed);
                Err(MediaError::Unavailable(format!(
                    "camera did not start within {}s",
                    OPEN_TIMEOUT.as_secs()
                )))
            }
        }
    }
}

impl FrameSource for CameraSource {
    fn dimensions(&self) -> (u32, u32) {
        self.slot
            .latest()
            .map(|f| (f.width(), f.height()))
            .unwrap_or((0, 0))
    }

    fn current_frame(&mut self) -> Option<VideoFrame> {
        self.slot.latest()
    }

    fn stop(&mut self) {
        if self.running.swap(false, Ordering::Relaxed) {
            log::info!("⏹️ 摄像头已停止: {}", self.config.device_name);
        }
        self.slot.clear();
    }

    fn describe(&self) -> String {
        format!("camera:{}", self.config.device_name)
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

/// 格式化摄像头URL - 根据平台选择
fn format_camera_url(index: usize, name: &str) -> String {
    #[cfg(target_os = "windows")]
    {
        let _ = index;
        format!("video={}", name)
    }
    #[cfg(target_os = "linux")]
    {
        let _ = name;
        format!("/dev/video{}", index)
    }
    #[cfg(not(any(target_os = "windows", target_os = "linux")))]
    {
        let _ = name;
        format!("{}", index)
    }
}

fn capture_format() -> &'static str {
    #[cfg(target_os = "windows")]
    {
        "dshow" // DirectShow
    }
    #[cfg(target_os = "macos")]
    {
        "avfoundation" // AVFoundation
    }
    #[cfg(target_os = "linux")]
    {
        "v4l2" // Video4Linux2
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        "video4linux2" // 默认
    }
}

/// 获取可用的摄像头设备列表
pub fn get_camera_devices() -> Vec<(usize, String)> {
    match ez_ffmpeg::device::get_input_video_devices() {
        Ok(devices) => devices.into_iter().enumerate().collect(),
        Err(e) => {
            log::warn!("⚠️ 获取摄像头列表失败: {}", e);
            vec![]
        }
    }
}
