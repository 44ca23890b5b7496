// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 检测会话 (Detection Session)
//!
//! 组合 视频源 + 循环驱动 + 推理线程 + 叠加层 + 截图导出
//! 由界面 (或无窗口运行器) 每个显示帧调用一次 `tick`

use crate::detection::{project_log, InferenceResponse, LogRow};
use crate::error::{CaptureError, MediaError};
use crate::input::{FrameSource, VideoFrame};
use crate::pipeline::client::InferenceTransport;
use crate::pipeline::driver::{LoopDriver, TickOutcome, DEFAULT_THRESHOLD};
use crate::pipeline::sampler::FrameSampler;
use crate::pipeline::worker::{InferenceJob, InferenceReply, InferenceWorker};
use crate::renderer::export::{CaptureExporter, Exporter};
use crate::renderer::overlay::{OverlayRenderer, PALETTE};
use crate::renderer::Renderer;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 加载提示最长显示时间
pub const DEFAULT_WARMUP: Duration = Duration::from_secs(3);

/// 每帧从界面读取的控制项
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionControls {
    pub detection_enabled: bool,
    /// 0.0 ~ 1.0
    pub threshold: f32,
}

impl Default for DetectionControls {
    fn default() -> Self {
        Self {
            detection_enabled: true,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// 界面显示的统计信息
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionStats {
    pub running: bool,
    pub fps: u32,
    pub object_count: usize,
    pub log: Vec<LogRow>,
    /// 启动后等待首个推理结果
    pub warming_up: bool,
}

pub struct DetectionSession<R: Renderer = OverlayRenderer, E: Exporter = CaptureExporter> {
    driver: LoopDriver,
    worker: InferenceWorker,
    renderer: R,
    exporter: E,
    source: Option<Box<dyn FrameSource>>,
    last_frame: Option<VideoFrame>,
    object_count: usize,
    log: Vec<LogRow>,
    warmup: Duration,
    warmup_deadline: Option<Instant>,
}

impl<R: Renderer, E: Exporter> DetectionSession<R, E> {
    pub fn new<T>(transport: Arc<T>, sampler: FrameSampler, renderer: R, exporter: E) -> Self
    where
        T: InferenceTransport + ?Sized + 'static,
    {
        Self {
            driver: LoopDriver::default(),
            worker: InferenceWorker::spawn(transport, sampler),
            renderer,
            exporter,
            source: None,
            last_frame: None,
            object_count: 0,
            log: Vec::new(),
            warmup: DEFAULT_WARMUP,
            warmup_deadline: None,
        }
    }

    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn is_running(&self) -> bool {
        self.driver.is_running()
    }

    /// 进入运行状态; 视频源由其构造函数打开, 打开失败的错误在此之前已返回给调用方
    pub fn start(&mut self, source: Box<dyn FrameSource>) -> Result<(), MediaError> {
        if self.driver.is_running() {
            log::debug!("会话已在运行, 忽略启动请求: {}", source.describe());
            return Ok(());
        }

        log::info!("▶️ 开始检测: {}", source.describe());
        self.source = Some(source);
        self.last_frame = None;
        self.driver.start();
        self.worker.set_generation(self.driver.generation());
        self.warmup_deadline = Some(Instant::now() + self.warmup);
        Ok(())
    }

    /// 停止: 释放视频源, 清空叠加层, FPS/目标数归零 (检测日志保留)
    pub fn stop(&mut self) {
        if let Some(mut source) = self.source.take() {
            log::info!("⏹️ 停止检测: {}", source.describe());
            source.stop();
        }
        self.driver.stop();
        self.worker.set_generation(self.driver.generation());
        self.renderer.clear();
        self.last_frame = None;
        self.object_count = 0;
        self.warmup_deadline = None;
    }

    pub fn tick(&mut self, now: Instant, controls: &DetectionControls) -> TickOutcome {
        self.drain_replies();
        if !self.driver.is_running() {
            return TickOutcome::default();
        }

        if let Some(frame) = self.source.as_mut().and_then(|s| s.current_frame()) {
            self.last_frame = Some(frame);
        }
        if self.warmup_deadline.is_some_and(|deadline| now >= deadline) {
            self.warmup_deadline = None;
        }

        self.driver.set_threshold(controls.threshold);
        let outcome = self.driver.tick(now, controls.detection_enabled);

        if let Some(ticket) = outcome.cycle {
            match self.last_frame.clone() {
                Some(frame) if frame.width() > 0 && frame.height() > 0 => {
                    let job = InferenceJob {
                        generation: ticket.generation,
                        frame,
                        threshold: ticket.threshold,
                    };
                    if let Err(job) = self.worker.dispatch(job) {
                        log::debug!("推理线程繁忙, 跳过本轮 gen={}", job.generation);
                        self.driver.complete(ticket.generation);
                    }
                }
                // 视频尚无画面, 跳过本轮
                _ => {
                    self.driver.complete(ticket.generation);
                }
            }
        }
        outcome
    }

    fn drain_replies(&mut self) {
        let replies: Vec<InferenceReply> = self.worker.replies().collect();
        for reply in replies {
            if !self.driver.complete(reply.generation) {
                log::debug!("丢弃过期推理结果 gen={}", reply.generation);
                continue;
            }
            self.warmup_deadline = None;

            match reply.outcome {
                Ok(response) => self.apply(response),
                // 保留上一帧叠加层
                Err(e) => log::warn!("⚠️ 推理失败: {}", e),
            }
        }
    }

    fn apply(&mut self, response: InferenceResponse) {
        let Some(detections) = response.detections else {
            log::debug!("响应中没有检测结果");
            return;
        };

        let canvas_size = self.canvas_size();
        self.object_count = self.renderer.render(canvas_size, &detections);
        if !detections.is_empty() {
            self.log = project_log(&detections, PALETTE.len());
        }
        log::debug!("🎯 检测到 {} 个目标", self.object_count);
    }

    /// 画布尺寸 = 当前视频分辨率
    fn canvas_size(&self) -> (u32, u32) {
        match &self.source {
            Some(source) if source.dimensions() != (0, 0) => source.dimensions(),
            _ => self
                .last_frame
                .as_ref()
                .map(|f| (f.width(), f.height()))
                .unwrap_or((0, 0)),
        }
    }

    /// 截图: 视频帧 + 叠加层 (任何状态下都可调用)
    pub fn capture(&mut self) -> Result<PathBuf, CaptureError> {
        if let Some(frame) = self.source.as_mut().and_then(|s| s.current_frame()) {
            self.last_frame = Some(frame);
        }
        let frame = self.last_frame.as_ref().ok_or(CaptureError::NoFrame)?;
        self.exporter.export(frame.image(), self.renderer.surface())
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            running: self.driver.is_running(),
            fps: self.driver.state().current_fps,
            object_count: self.object_count,
            log: self.log.clone(),
            warming_up: self.warmup_deadline.is_some(),
        }
    }

    /// 当前显示的视频帧
    pub fn current_frame(&self) -> Option<&VideoFrame> {
        self.last_frame.as_ref()
    }

    pub fn overlay(&self) -> &image::RgbaImage {
        self.renderer.surface()
    }
}
