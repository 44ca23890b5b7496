// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 帧采样器 (Frame Sampler)
/// 职责: 实时帧 → 等比缩放到固定宽度 → JPEG压缩 (限制上传带宽)
use crate::error::SampleError;
use crate::input::VideoFrame;
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, DynamicImage};

/// 上传推理的固定宽度
pub const SAMPLE_WIDTH: u32 = 320;
/// JPEG质量 (≈0.8)
pub const JPEG_QUALITY: u8 = 80;

/// 压缩后的上传图像
#[derive(Clone, Debug)]
pub struct ImageBlob {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl ImageBlob {
    pub const MIME: &'static str = "image/jpeg";
    pub const FILE_NAME: &'static str = "frame.jpg";
}

#[derive(Clone, Copy, Debug)]
pub struct FrameSampler {
    target_width: u32,
    quality: u8,
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new(SAMPLE_WIDTH, JPEG_QUALITY)
    }
}

impl FrameSampler {
    pub fn new(target_width: u32, quality: u8) -> Self {
        Self {
            target_width: target_width.max(1),
            quality: quality.clamp(1, 100),
        }
    }

    /// 按源宽高比计算目标尺寸 (高度向下取整, 至少1像素)
    pub fn target_size(&self, source_width: u32, source_height: u32) -> (u32, u32) {
        let height = (source_height as f64 / source_width as f64 * self.target_width as f64)
            .floor() as u32;
        (self.target_width, height.max(1))
    }

    pub fn sample(&self, frame: &VideoFrame) -> Result<ImageBlob, SampleError> {
        // 视频尚未加载完成
        if frame.width() == 0 || frame.height() == 0 {
            return Err(SampleError::NotReady);
        }

        let (width, height) = self.target_size(frame.width(), frame.height());

        // 1. Resize: 原生分辨率 → 320xH
        let resized = imageops::resize(
            frame.image(),
            width,
            height,
            imageops::FilterType::Triangle,
        );

        // 2. RGBA → RGB (JPEG不支持透明通道)
        let rgb = DynamicImage::ImageRgba8(resized).to_rgb8();

        // 3. JPEG压缩
        let mut bytes = Vec::with_capacity((width * height) as usize / 4);
        JpegEncoder::new_with_quality(&mut bytes, self.quality).encode_image(&rgb)?;

        Ok(ImageBlob {
            bytes,
            width,
            height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_target_size_keeps_aspect() {
        let sampler = FrameSampler::default();
        assert_eq!(sampler.target_size(1280, 720), (320, 180));
        assert_eq!(sampler.target_size(640, 480), (320, 240));
        assert_eq!(sampler.target_size(1000, 333), (320, 106));
        assert_eq!(sampler.target_size(4000, 1), (320, 1));
    }

    #[test]
    fn test_sample_encodes_jpeg() {
        let sampler = FrameSampler::default();
        let frame = VideoFrame::new(RgbaImage::from_pixel(1280, 720, Rgba([40, 90, 200, 255])));
        let blob = sampler.sample(&frame).unwrap();

        assert_eq!((blob.width, blob.height), (320, 180));
        // JPEG SOI
        assert_eq!(&blob.bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&blob.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (320, 180));
    }

    #[test]
    fn test_sample_zero_dimension_is_not_ready() {
        let sampler = FrameSampler::default();
        let frame = VideoFrame::new(RgbaImage::new(0, 0));
        assert!(matches!(sampler.sample(&frame), Err(SampleError::NotReady)));
    }
}
