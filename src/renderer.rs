// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 渲染系统 (Rendering)
//!
//! - overlay:       检测结果 → 透明叠加层 (imageproc)
//! - export:        视频帧 + 叠加层 → PNG 截图
//! - viewer:        macroquad 窗口 (视频/叠加层纹理 + 状态) (需要 `viewer` 特性)
//! - control_panel: egui 控制面板 (需要 `viewer` 特性)
#[cfg(feature = "viewer")]
mod control_panel;
pub mod export;
pub mod overlay;
#[cfg(feature = "viewer")]
pub mod viewer;

pub use export::{CaptureExporter, Exporter};
pub use overlay::{layout_detection, BoxLayout, LabelLayout, OverlayRenderer, PALETTE};
#[cfg(feature = "viewer")]
pub use viewer::Viewer;

use crate::detection::Detection;
use image::RgbaImage;

/// 叠加层渲染接口
///
/// 检测结果已由后端按阈值过滤, 渲染时不再过滤
pub trait Renderer {
    /// 清空画布并绘制全部检测, 画布尺寸跟随视频; 返回绘制的目标数
    fn render(&mut self, canvas_size: (u32, u32), detections: &[Detection]) -> usize;

    fn clear(&mut self);

    fn surface(&self) -> &RgbaImage;
}
