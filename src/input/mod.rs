// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 视频输入系统 (Video Input System)
///
/// 提供实时视频帧给检测会话
/// - StillSource:  图片/目录循环播放 (模拟实时视频)
/// - CameraSource: 本地摄像头 (DirectShow/AVFoundation/V4L2, 需要 `camera` 特性)
/// - FrameSlot:    解码线程 → 渲染线程 的最新帧共享槽
#[cfg(feature = "camera")]
pub mod camera;
#[cfg(feature = "camera")]
pub mod decode_filter;
pub mod still;

#[cfg(feature = "camera")]
pub use camera::{get_camera_devices, CameraConfig, CameraSource};
pub use still::StillSource;

use crate::error::MediaError;
use crate::ui_config::ClientConfig;
use image::RgbaImage;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// 一帧实时视频 (原生分辨率 RGBA, Arc共享避免复制)
#[derive(Clone, Debug)]
pub struct VideoFrame {
    image: Arc<RgbaImage>,
}

impl VideoFrame {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

/// 视频源接口
///
/// 打开失败 (权限/设备不存在) 由各实现的构造函数返回 `MediaError`
pub trait FrameSource: Send {
    /// 当前视频分辨率, 尚未收到第一帧时为 (0, 0)
    fn dimensions(&self) -> (u32, u32);

    /// 当前显示的视频帧 (不阻塞)
    fn current_frame(&mut self) -> Option<VideoFrame>;

    /// 停止采集并释放设备
    fn stop(&mut self);

    /// 视频源描述 (日志用)
    fn describe(&self) -> String;
}

/// 最新帧共享槽: 写入方覆盖, 读取方克隆 Arc
#[derive(Clone, Default)]
pub struct FrameSlot {
    inner: Arc<Mutex<Option<VideoFrame>>>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, frame: VideoFrame) {
        if let Ok(mut slot) = self.inner.lock() {
            *slot = Some(frame);
        }
    }

    pub fn latest(&self) -> Option<VideoFrame> {
        self.inner.lock().ok().and_then(|slot| slot.clone())
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.inner.lock() {
            *slot = None;
        }
    }
}

/// 视频源选择 (命令行 / 控制面板)
#[derive(Clone, Debug, PartialEq)]
pub enum SourceSpec {
    /// 图片文件或目录
    Still(PathBuf),
    /// 摄像头设备序号
    Camera(usize),
}

impl SourceSpec {
    /// 命令行未指定时: 有摄像头支持则用0号摄像头
    pub fn resolve(source: Option<PathBuf>, camera: Option<usize>) -> Option<Self> {
        match (camera, source) {
            (Some(index), _) => Some(SourceSpec::Camera(index)),
            (None, Some(path)) => Some(SourceSpec::Still(path)),
            (None, None) if cfg!(feature = "camera") => Some(SourceSpec::Camera(0)),
            (None, None) => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            SourceSpec::Still(path) => format!("still:{}", path.display()),
            SourceSpec::Camera(index) => format!("camera:{}", index),
        }
    }

    /// 打开视频源, 失败时返回 MediaError (不会进入运行状态)
    pub fn open(&self, config: &ClientConfig) -> Result<Box<dyn FrameSource>, MediaError> {
        match self {
            SourceSpec::Still(path) => Ok(Box::new(StillSource::open(path, config.still_fps)?)),
            #[cfg(feature = "camera")]
            SourceSpec::Camera(index) => {
                let device_name = get_camera_devices()
                    .into_iter()
                    .find(|(i, _)| i == index)
                    .map(|(_, name)| name)
                    .unwrap_or_default();
                let camera = CameraSource::open(CameraConfig {
                    device_index: *index,
                    device_name,
                    width: config.camera_width,
                    height: config.camera_height,
                    frame_rate: config.camera_frame_rate,
                })?;
                Ok(Box::new(camera))
            }
            #[cfg(not(feature = "camera"))]
            SourceSpec::Camera(index) => Err(MediaError::Unavailable(format!(
                "camera {} requested but this build has no camera support",
                index
            ))),
        }
    }
}
