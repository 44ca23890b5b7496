// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 截图导出 (Capture Exporter)
//!
//! 原生分辨率视频帧 + 叠加层 合成为 PNG 写入截图目录

use crate::error::CaptureError;
use image::{imageops, RgbaImage};
use std::path::PathBuf;

pub trait Exporter {
    fn export(&self, frame: &RgbaImage, overlay: &RgbaImage) -> Result<PathBuf, CaptureError>;
}

pub struct CaptureExporter {
    output_dir: PathBuf,
}

impl CaptureExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// 叠加层按 alpha 混合到视频帧左上角
    pub fn composite(frame: &RgbaImage, overlay: &RgbaImage) -> RgbaImage {
        let mut merged = frame.clone();
        imageops::overlay(&mut merged, overlay, 0, 0);
        merged
    }
}

impl Exporter for CaptureExporter {
    fn export(&self, frame: &RgbaImage, overlay: &RgbaImage) -> Result<PathBuf, CaptureError> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(CaptureError::NoFrame);
        }

        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(crate::capture_file_name());

        let merged = Self::composite(frame, overlay);
        merged.save_with_format(&path, image::ImageFormat::Png)?;

        log::info!("📸 截图已保存: {}", path.display());
        Ok(path)
    }
}
