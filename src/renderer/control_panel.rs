// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use super::overlay::PALETTE;
use crate::pipeline::{Connectivity, SessionStats};
use egui_macroquad::egui;

/// 控制面板状态
pub struct ControlPanel {
    // 状态显示
    pub connectivity: Connectivity,
    pub stats: SessionStats,
    pub render_fps: f64,
    pub source_label: String,
    pub last_capture: Option<String>,

    // 用户控制
    pub threshold_percent: u32,
    pub detection_enabled: bool,

    // 阻塞提示 (摄像头打开失败等), 确认前禁用其他操作
    pub notice: Option<String>,
}

impl ControlPanel {
    pub fn new(threshold_percent: u32, source_label: String) -> Self {
        Self {
            connectivity: Connectivity::Offline,
            stats: SessionStats::default(),
            render_fps: 0.0,
            source_label,
            last_capture: None,
            threshold_percent: threshold_percent.min(100),
            detection_enabled: true,
            notice: None,
        }
    }

    /// 当前阈值 (0.0 ~ 1.0)
    pub fn threshold(&self) -> f32 {
        crate::threshold_from_percent(self.threshold_percent)
    }

    fn set_style(&self, ctx: &egui::Context) {
        // 半透明深色面板
        let mut visuals = egui::Visuals::dark();
        visuals.window_fill = egui::Color32::from_rgba_premultiplied(12, 14, 22, 220);
        visuals.window_stroke = egui::Stroke::new(
            1.0,
            egui::Color32::from_rgba_premultiplied(255, 255, 255, 30),
        );
        visuals.selection.bg_fill = egui::Color32::from_rgb(0x00, 0x9a, 0xa8);
        visuals.override_text_color = Some(egui::Color32::from_rgb(230, 240, 250));
        ctx.set_visuals(visuals);
    }

    pub fn show(&mut self, ctx: &egui::Context, open: &mut bool) -> ControlPanelActions {
        self.set_style(ctx);
        let mut actions = ControlPanelActions::default();

        if let Some(message) = self.notice.clone() {
            egui::Window::new("⚠️ Camera Error")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label(&message);
                    ui.add_space(8.0);
                    if ui.button("OK").clicked() {
                        self.notice = None;
                    }
                });
        }

        if !*open {
            return actions;
        }

        let enabled = self.notice.is_none();
        egui::Window::new("🎯 VisionX")
            .default_pos(egui::pos2(10.0, 10.0))
            .default_size(egui::vec2(320.0, 520.0))
            .resizable(true)
            .title_bar(true)
            .show(ctx, |ui| {
                ui.add_enabled_ui(enabled, |ui| {
                    egui::ScrollArea::vertical()
                        .auto_shrink([false; 2])
                        .show(ui, |ui| actions = self.ui(ui));
                });
            });

        actions
    }

    /// 绘制控制面板UI
    fn ui(&mut self, ui: &mut egui::Ui) -> ControlPanelActions {
        let mut actions = ControlPanelActions::default();

        ui.style_mut().visuals.collapsing_header_frame = false;

        // --- 连接状态 ---
        ui.horizontal(|ui| {
            let color = if self.connectivity.state().is_online {
                egui::Color32::from_rgb(0x00, 0xe6, 0x76)
            } else {
                egui::Color32::from_rgb(0xff, 0x4d, 0x4d)
            };
            ui.colored_label(color, "●");
            ui.label(self.connectivity.text());
            if ui.small_button("🔄").on_hover_text("Recheck backend").clicked() {
                actions.recheck = true;
            }
        });

        ui.separator();

        // --- 统计 ---
        egui::CollapsingHeader::new("📊 Stats")
            .default_open(true)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label("FPS:");
                    ui.colored_label(egui::Color32::GREEN, self.stats.fps.to_string());
                    ui.label("| Objects:");
                    ui.colored_label(egui::Color32::YELLOW, self.stats.object_count.to_string());
                });
                ui.label(format!("Render FPS: {:.1}", self.render_fps));
                ui.label(format!("Source: {}", self.source_label));
            });

        ui.separator();

        // --- 控制 ---
        egui::CollapsingHeader::new("🎥 Camera")
            .default_open(true)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    if self.stats.running {
                        if ui.button("⏹ Stop").clicked() {
                            actions.stop = true;
                        }
                    } else if ui.button("▶ Start Camera").clicked() {
                        actions.start = true;
                    }
                    if ui.button("📸 Capture").clicked() {
                        actions.capture = true;
                    }
                });

                ui.checkbox(&mut self.detection_enabled, "Enable detection");
                ui.add(
                    egui::Slider::new(&mut self.threshold_percent, 0..=100)
                        .text("Confidence")
                        .suffix("%"),
                );

                if let Some(path) = &self.last_capture {
                    ui.small(format!("Saved: {}", path));
                }
            });

        ui.separator();

        // --- 检测日志 ---
        egui::CollapsingHeader::new("📝 Detection Log")
            .default_open(true)
            .show(ui, |ui| {
                if self.stats.log.is_empty() {
                    ui.weak("No detections yet");
                }
                for row in &self.stats.log {
                    let c = PALETTE[row.color_index % PALETTE.len()];
                    ui.horizontal(|ui| {
                        ui.colored_label(egui::Color32::from_rgb(c[0], c[1], c[2]), "▌");
                        ui.label(row.label.to_uppercase());
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            ui.label(format!("{}%", row.confidence_percent));
                        });
                    });
                }
            });

        actions
    }
}

/// 控制面板操作返回值
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlPanelActions {
    pub start: bool,
    pub stop: bool,
    pub capture: bool,
    pub recheck: bool,
}
