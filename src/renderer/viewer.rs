// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 检测窗口 (macroquad + egui)
//!
//! 每个显示帧: 更新连接状态 → 驱动检测会话 → 上传视频/叠加层纹理 → 绘制

use super::control_panel::{ControlPanel, ControlPanelActions};
use crate::input::SourceSpec;
use crate::pipeline::{
    spawn_availability_monitor, AvailabilityMonitor, Connectivity, DetectionControls,
    DetectionSession, FrameSampler, HttpInferenceClient, MonitorHandle,
};
use crate::renderer::{CaptureExporter, OverlayRenderer};
use crate::ui_config::ClientConfig;
use egui_macroquad::egui;
use image::RgbaImage;
use macroquad::prelude::*;
use std::sync::Arc;
use std::time::Instant;

pub struct Viewer {
    config: ClientConfig,
    source: Option<SourceSpec>,
    session: DetectionSession,
    monitor: MonitorHandle,

    video_texture: Option<Texture2D>,
    overlay_texture: Option<Texture2D>,

    // 渲染帧率统计
    render_count: u64,
    render_last: Instant,

    // 窗口状态
    show_control_panel: bool,
    is_mouse_over_ui: bool,

    // 控制面板(独立模块)
    control_panel: ControlPanel,
}

impl Viewer {
    pub fn new(config: ClientConfig, source: Option<SourceSpec>) -> Self {
        log::info!("🎨 渲染器启动");

        let client = Arc::new(HttpInferenceClient::new(
            &config.api_url,
            config.request_timeout(),
        ));
        let monitor = spawn_availability_monitor(
            client.clone(),
            AvailabilityMonitor::new(config.ready_retry(), config.offline_retry()),
        );
        let session = DetectionSession::new(
            client,
            FrameSampler::new(config.sample_width, config.jpeg_quality),
            OverlayRenderer::new(config.font_path.as_deref()),
            CaptureExporter::new(config.capture_dir.clone()),
        )
        .with_warmup(config.warmup());

        let source_label = source
            .as_ref()
            .map(|s| s.describe())
            .unwrap_or_else(|| "none".to_string());
        let control_panel = ControlPanel::new(config.default_threshold_percent, source_label);

        Self {
            config,
            source,
            session,
            monitor,
            video_texture: None,
            overlay_texture: None,
            render_count: 0,
            render_last: Instant::now(),
            show_control_panel: true,
            is_mouse_over_ui: false,
            control_panel,
        }
    }

    /// 打开视频源并开始检测; 失败时弹出提示, 保持空闲状态
    pub fn start(&mut self) {
        if self.session.is_running() {
            return;
        }
        let Some(selected) = self.source.clone() else {
            self.control_panel.notice =
                Some("No video source configured. Use --source or --camera.".to_string());
            return;
        };

        let result = selected
            .open(&self.config)
            .and_then(|source| self.session.start(source));
        if let Err(e) = result {
            log::error!("❌ 视频源打开失败: {}", e);
            self.control_panel.notice = Some(format!("Could not access camera: {}", e));
        }
    }

    pub fn stop(&mut self) {
        self.session.stop();
        self.video_texture = None;
        self.overlay_texture = None;
    }

    pub fn update(&mut self) {
        // 连接状态
        for update in self.monitor.updates() {
            self.control_panel.connectivity = update;
        }

        let controls = DetectionControls {
            detection_enabled: self.control_panel.detection_enabled,
            threshold: self.control_panel.threshold(),
        };
        self.session.tick(Instant::now(), &controls);
        self.control_panel.stats = self.session.stats();

        // 更新视频纹理
        if let Some(frame) = self.session.current_frame() {
            upload(&mut self.video_texture, frame.image());
        }
        // 更新叠加层纹理
        let overlay = self.session.overlay();
        if overlay.width() > 0 && overlay.height() > 0 {
            upload(&mut self.overlay_texture, overlay);
        }
    }

    pub fn draw(&mut self) {
        clear_background(Color::from_rgba(10, 12, 20, 255));

        if let Some(texture) = &self.video_texture {
            let (x, y, w, h) = fit(texture.width(), texture.height());
            let params = || DrawTextureParams {
                dest_size: Some(vec2(w, h)),
                ..Default::default()
            };
            draw_texture_ex(texture, x, y, WHITE, params());

            // 叠加层与视频同尺寸, 使用相同的目标区域
            if self.control_panel.stats.running {
                if let Some(overlay) = &self.overlay_texture {
                    draw_texture_ex(overlay, x, y, WHITE, params());
                }
            }
        } else {
            let text = "Start the camera to begin detection";
            let dims = measure_text(text, None, 32, 1.0);
            draw_text(
                text,
                (screen_width() - dims.width) / 2.0,
                (screen_height() - dims.height) / 2.0,
                32.0,
                GRAY,
            );
        }

        // 加载提示
        if self.control_panel.stats.warming_up {
            draw_rectangle(
                0.0,
                0.0,
                screen_width(),
                screen_height(),
                Color::new(0.0, 0.0, 0.0, 0.5),
            );
            let text = "Initializing AI model...";
            let dims = measure_text(text, None, 28, 1.0);
            draw_text(
                text,
                (screen_width() - dims.width) / 2.0,
                screen_height() / 2.0,
                28.0,
                WHITE,
            );
        }

        // 状态栏
        let status = self.control_panel.connectivity;
        let color = if status == Connectivity::Online {
            Color::from_rgba(0x00, 0xe6, 0x76, 255)
        } else {
            Color::from_rgba(0xff, 0x4d, 0x4d, 255)
        };
        draw_text(status.text(), 10.0, screen_height() - 10.0, 20.0, color);

        // 渲染帧率统计
        self.render_count += 1;
        let now = Instant::now();
        if now.duration_since(self.render_last).as_secs() >= 1 {
            self.control_panel.render_fps =
                self.render_count as f64 / now.duration_since(self.render_last).as_secs_f64();
            self.render_count = 0;
            self.render_last = now;
        }
    }

    pub fn draw_egui(&mut self) {
        let mut actions = ControlPanelActions::default();
        egui_macroquad::ui(|egui_ctx: &egui::Context| {
            self.is_mouse_over_ui = egui_ctx.wants_pointer_input();
            actions = self
                .control_panel
                .show(egui_ctx, &mut self.show_control_panel);
        });
        egui_macroquad::draw();

        // 处理控制面板的操作
        if actions.start {
            self.start();
        }
        if actions.stop {
            self.stop();
        }
        if actions.capture {
            self.capture();
        }
        if actions.recheck {
            self.monitor.recheck();
        }
    }

    pub fn handle_input(&mut self) {
        if self.control_panel.notice.is_some() {
            return;
        }
        if is_key_pressed(KeyCode::Tab) {
            self.show_control_panel = !self.show_control_panel;
        }
        if is_key_pressed(KeyCode::Space) && !self.is_mouse_over_ui {
            if self.session.is_running() {
                self.stop();
            } else {
                self.start();
            }
        }
        if is_key_pressed(KeyCode::C) && !self.is_mouse_over_ui {
            self.capture();
        }
    }

    fn capture(&mut self) {
        match self.session.capture() {
            Ok(path) => self.control_panel.last_capture = Some(path.display().to_string()),
            Err(e) => log::warn!("⚠️ 截图失败: {}", e),
        }
    }
}

/// 视频等比缩放居中显示区域
fn fit(width: f32, height: f32) -> (f32, f32, f32, f32) {
    let scale = (screen_width() / width).min(screen_height() / height);
    let w = width * scale;
    let h = height * scale;
    ((screen_width() - w) / 2.0, (screen_height() - h) / 2.0, w, h)
}

/// 分辨率不变时只更新像素数据, 否则重建纹理
fn upload(slot: &mut Option<Texture2D>, image: &RgbaImage) {
    let (Ok(width), Ok(height)) = (u16::try_from(image.width()), u16::try_from(image.height()))
    else {
        log::warn!("⚠️ 画面尺寸超出纹理上限: {}x{}", image.width(), image.height());
        return;
    };
    match slot {
        Some(texture) if texture.width() as u16 == width && texture.height() as u16 == height => {
            texture.update(&Image {
                bytes: image.as_raw().clone(),
                width,
                height,
            });
        }
        _ => {
            let texture = Texture2D::from_rgba8(width, height, image.as_raw());
            texture.set_filter(FilterMode::Linear);
            *slot = Some(texture);
        }
    }
}
