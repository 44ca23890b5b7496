// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 静态图片输入 - 单张图片或图片目录按固定帧率循环播放
//!
//! 没有摄像头时作为"实时视频"使用 (演示/无头运行/测试)

use super::{FrameSource, VideoFrame};
use crate::error::MediaError;
use image::{imageops, RgbaImage};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

/// 纹理边长上限 (u16)
pub const MAX_DIMENSION: u32 = u16::MAX as u32;

pub struct StillSource {
    frames: Vec<VideoFrame>,
    fps: f32,
    started: Instant,
    stopped: bool,
    label: String,
}

impl StillSource {
    /// 打开图片文件或目录 (目录内按文件名排序)
    pub fn open(path: &Path, fps: f32) -> Result<Self, MediaError> {
        let files = collect_image_files(path).map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => {
                MediaError::PermissionDenied(format!("{}: {}", path.display(), e))
            }
            ErrorKind::NotFound => MediaError::Unavailable(format!("{} not found", path.display())),
            _ => MediaError::Io(e),
        })?;

        let mut images = Vec::with_capacity(files.len());
        for file in &files {
            images.push(image::open(file)?.to_rgba8());
        }
        log::info!("🖼️ 静态视频源: {} ({} 帧 @ {:.0}fps)", path.display(), images.len(), fps);

        let mut source = Self::from_images(images, fps)?;
        source.label = path.display().to_string();
        Ok(source)
    }

    /// 由内存图片构建
    pub fn from_images(images: Vec<RgbaImage>, fps: f32) -> Result<Self, MediaError> {
        if images.is_empty() {
            return Err(MediaError::Unavailable("no frames to play".to_string()));
        }
        Ok(Self {
            frames: images
                .into_iter()
                .map(|image| VideoFrame::new(fit_dimension_limit(image)))
                .collect(),
            fps: fps.max(0.1),
            started: Instant::now(),
            stopped: false,
            label: "memory".to_string(),
        })
    }

    fn frame_index(&self) -> usize {
        let elapsed = self.started.elapsed().as_secs_f32();
        (elapsed * self.fps) as usize % self.frames.len()
    }
}

impl FrameSource for StillSource {
    fn dimensions(&self) -> (u32, u32) {
        if self.stopped {
            return (0, 0);
        }
        let frame = &self.frames[self.frame_index()];
        (frame.width(), frame.height())
    }

    fn current_frame(&mut self) -> Option<VideoFrame> {
        if self.stopped {
            return None;
        }
        Some(self.frames[self.frame_index()].clone())
    }

    fn stop(&mut self) {
        if !self.stopped {
            log::info!("⏹️ 静态视频源已停止: {}", self.label);
        }
        self.stopped = true;
    }

    fn describe(&self) -> String {
        format!("still:{}", self.label)
    }
}

/// 超过纹理上限的图片按比例缩小
fn fit_dimension_limit(image: RgbaImage) -> RgbaImage {
    let (width, height) = image.dimensions();
    if width <= MAX_DIMENSION && height <= MAX_DIMENSION {
        return image;
    }
    let scale = MAX_DIMENSION as f64 / width.max(height) as f64;
    let new_width = ((width as f64 * scale).round() as u32).clamp(1, MAX_DIMENSION);
    let new_height = ((height as f64 * scale).round() as u32).clamp(1, MAX_DIMENSION);
    log::warn!(
        "⚠️ 图片尺寸 {}x{} 超出上限, 缩放为 {}x{}",
        width,
        height,
        new_width,
        new_height
    );
    imageops::resize(&image, new_width, new_height, imageops::FilterType::Triangle)
}

fn collect_image_files(path: &Path) -> std::io::Result<Vec<PathBuf>> {
    let meta = std::fs::metadata(path)?;
    if meta.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(std::io::Error::new(
            ErrorKind::NotFound,
            "directory contains no images",
        ));
    }
    Ok(files)
}
