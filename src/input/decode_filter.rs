// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// FFmpeg解码过滤器模块
/// FFmpeg decode filter module: RGBA camera frames → FrameSlot
use super::{FrameSlot, VideoFrame};
use ez_ffmpeg::filter::frame_filter::FrameFilter;
use ez_ffmpeg::filter::frame_filter_context::FrameFilterContext;
use ez_ffmpeg::{AVMediaType, Frame};
use image::RgbaImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// 解码过滤器: 摄像头 → RGBA帧 (滤镜图已转换为 rgba 像素格式)
#[derive(Clone)]
pub struct DecodeFilter {
    slot: FrameSlot,
    running: Arc<AtomicBool>,
    count: usize,
    last: Instant,
    current_fps: f64,
    dropped_frames: usize,
    total_frames: usize,
}

impl DecodeFilter {
    pub fn new(slot: FrameSlot, running: Arc<AtomicBool>) -> Self {
        Self {
            slot,
            running,
            count: 0,
            last: Instant::now(),
            current_fps: 0.0,
            dropped_frames: 0,
            total_frames: 0,
        }
    }
}

impl FrameFilter for DecodeFilter {
    fn media_type(&self) -> AVMediaType {
        AVMediaType::AVMEDIA_TYPE_VIDEO
    }

    fn init(&mut self, _ctx: &FrameFilterContext) -> Result<(), String> {
        log::info!("✅ 摄像头解码线程启动");
        Ok(())
    }

    fn filter_frame(
        &mut self,
        frame: Frame,
        _ctx: &FrameFilterContext,
    ) -> Result<Option<Frame>, String> {
        // 会话已停止 → 结束解码
        if !self.running.load(Ordering::Relaxed) {
            return Err("camera stopped".to_string());
        }

        unsafe {
            self.total_frames += 1;

            // 基本检查：空帧或损坏帧
            if frame.as_ptr().is_null() || frame.is_empty() || frame.is_corrupt() {
                self.dropped_frames += 1;
                return Ok(None);
            }

            let w = (*frame.as_ptr()).width as u32;
            let h = (*frame.as_ptr()).height as u32;

            // 检查分辨率合法性
            if w == 0 || h == 0 || w > 4096 || h > 4096 {
                self.dropped_frames += 1;
                if self.total_frames <= 10 {
                    log::warn!("⚠️ 丢弃帧 #{}: 非法分辨率 {}x{}", self.total_frames, w, h);
                }
                return Ok(None);
            }

            let plane = (*frame.as_ptr()).data[0];
            let stride = (*frame.as_ptr()).linesize[0] as usize;
            let row_bytes = w as usize * 4;
            if plane.is_null() || stride < row_bytes {
                self.dropped_frames += 1;
                if self.total_frames <= 10 {
                    log::warn!("⚠️ 丢弃帧 #{}: 步长异常 stride={}", self.total_frames, stride);
                }
                return Ok(None);
            }

            // 按行拷贝 (去除行尾填充)
            let mut pixels = Vec::with_capacity(row_bytes * h as usize);
            for row in 0..h as usize {
                let src = std::slice::from_raw_parts(plane.add(row * stride), row_bytes);
                pixels.extend_from_slice(src);
            }

            let Some(image) = RgbaImage::from_raw(w, h, pixels) else {
                self.dropped_frames += 1;
                return Ok(None);
            };

            self.count += 1;
            if self.last.elapsed().as_secs_f64() >= 1.0 {
                self.current_fps = self.count as f64 / self.last.elapsed().as_secs_f64();
                log::debug!(
                    "📺 摄像头统计: {:.1}fps | 总帧{} | 丢弃{}",
                    self.current_fps,
                    self.total_frames,
                    self.dropped_frames
                );
                self.last = Instant::now();
                self.count = 0;
            }

            self.slot.publish(VideoFrame::new(image));

            Ok(Some(frame))
        }
    }

    fn uninit(&mut self, _ctx: &FrameFilterContext) {
        log::info!("✅ 摄像头解码线程退出");
    }
}
