// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 叠加层渲染器 (Overlay Renderer)
//!
//! 在与视频同尺寸的透明 RGBA 画布上绘制检测框:
//! 发光描边 + 3px 边框 + 角标 + 圆角标签 + 半透明填充

use super::Renderer;
use crate::detection::{Detection, PixelRect};
use ab_glyph::{FontVec, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size,
    Blend,
};
use imageproc::rect::Rect;
use std::path::Path;

/// 检测框调色板, 按检测序号轮转
pub const PALETTE: [Rgba<u8>; 6] = [
    Rgba([0x00, 0xf2, 0xff, 0xff]),
    Rgba([0x70, 0x00, 0xff, 0xff]),
    Rgba([0x00, 0xe6, 0x76, 0xff]),
    Rgba([0xff, 0x4d, 0x4d, 0xff]),
    Rgba([0xff, 0xab, 0x00, 0xff]),
    Rgba([0xf5, 0x00, 0x57, 0xff]),
];

pub const STROKE_WIDTH: u32 = 3;
pub const CORNER_WIDTH: u32 = 6;
pub const CORNER_MAX: f32 = 20.0;
pub const LABEL_HEIGHT: f32 = 28.0;
pub const LABEL_PADDING: f32 = 20.0;
pub const LABEL_GAP: f32 = 2.0;
pub const LABEL_RADIUS: f32 = 6.0;
pub const FONT_SIZE: f32 = 14.0;
/// 填充透明度 0.2
pub const TINT_ALPHA: u8 = 51;

const GLOW_LAYERS: u32 = 5;
const GLOW_SPREAD: u32 = 3;
const TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// 常见系统粗体字体
const SYSTEM_FONTS: &[&str] = &[
    "assets/font/Outfit-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// 标签布局
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabelLayout {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub text_x: f32,
    pub text_y: f32,
    /// 框上方空间不足, 标签画在框内顶部
    pub inside: bool,
}

/// 单个检测的绘制几何
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxLayout {
    pub rect: PixelRect,
    pub corner_len: f32,
    pub label: LabelLayout,
    pub color_index: usize,
}

/// 计算一个检测在画布上的几何 (纯函数)
pub fn layout_detection(
    detection: &Detection,
    index: usize,
    canvas_width: u32,
    canvas_height: u32,
    text_width: f32,
) -> BoxLayout {
    let rect = detection.bbox.to_pixels(canvas_width, canvas_height);
    let corner_len = rect.w.min(rect.h).min(CORNER_MAX);

    let above = rect.y - LABEL_HEIGHT - LABEL_GAP;
    let (label_y, inside) = if above < 0.0 {
        (rect.y, true)
    } else {
        (above, false)
    };

    BoxLayout {
        rect,
        corner_len,
        label: LabelLayout {
            x: rect.x,
            y: label_y,
            width: text_width + LABEL_PADDING,
            height: LABEL_HEIGHT,
            text_x: rect.x + LABEL_PADDING / 2.0,
            text_y: label_y + (LABEL_HEIGHT - FONT_SIZE) / 2.0,
            inside,
        },
        color_index: index % PALETTE.len(),
    }
}

pub struct OverlayRenderer {
    surface: RgbaImage,
    font: Option<FontVec>,
    scale: PxScale,
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new(None)
    }
}

impl OverlayRenderer {
    /// 优先加载配置的字体, 否则尝试系统字体; 都失败时不绘制文字
    pub fn new(font_path: Option<&Path>) -> Self {
        let font = font_path
            .and_then(load_font)
            .or_else(|| SYSTEM_FONTS.iter().find_map(|p| load_font(Path::new(p))));
        if font.is_none() {
            log::warn!("⚠️ 未找到可用字体, 标签将不显示文字");
        }
        Self::with_font(font)
    }

    pub fn with_font(font: Option<FontVec>) -> Self {
        Self {
            surface: RgbaImage::new(0, 0),
            font,
            scale: PxScale::from(FONT_SIZE),
        }
    }

    /// 标签文字宽度, 无字体时按平均字宽估算
    pub fn measure(&self, text: &str) -> f32 {
        match &self.font {
            Some(font) => text_size(self.scale, font, text).0 as f32,
            None => text.chars().count() as f32 * FONT_SIZE * 0.6,
        }
    }

    fn draw_detection(&mut self, detection: &Detection, index: usize) {
        let caption = detection.caption();
        let canvas = self.surface.dimensions();
        let layout = layout_detection(detection, index, canvas.0, canvas.1, self.measure(&caption));
        let color = PALETTE[layout.color_index];
        let rect = layout.rect;

        // 1. 发光 (由外向内逐层加深)
        let mut blend = Blend(std::mem::take(&mut self.surface));
        for layer in (1..=GLOW_LAYERS).rev() {
            let spread = (layer * GLOW_SPREAD) as f32;
            let alpha = (90 / layer) as u8;
            if let Some(r) = to_rect(
                canvas,
                rect.x - spread,
                rect.y - spread,
                rect.w + spread * 2.0,
                rect.h + spread * 2.0,
            ) {
                draw_hollow_rect_mut(&mut blend, r, with_alpha(color, alpha));
            }
        }

        // 2. 半透明填充
        if let Some(r) = to_rect(canvas, rect.x, rect.y, rect.w, rect.h) {
            draw_filled_rect_mut(&mut blend, r, with_alpha(color, TINT_ALPHA));
        }
        self.surface = blend.0;

        // 3. 边框 (以框线为中心加粗)
        let half = (STROKE_WIDTH / 2) as f32;
        for i in 0..STROKE_WIDTH {
            let offset = i as f32 - half;
            if let Some(r) = to_rect(
                canvas,
                rect.x - offset,
                rect.y - offset,
                rect.w + offset * 2.0,
                rect.h + offset * 2.0,
            ) {
                draw_hollow_rect_mut(&mut self.surface, r, color);
            }
        }

        // 4. 角标: 左上 + 右下
        let c = layout.corner_len;
        let t = CORNER_WIDTH as f32;
        let h = t / 2.0;
        let corners = [
            (rect.x - h, rect.y - h, c + h, t),
            (rect.x - h, rect.y - h, t, c + h),
            (rect.x + rect.w - c, rect.y + rect.h - h, c + h, t),
            (rect.x + rect.w - h, rect.y + rect.h - c, t, c + h),
        ];
        for (x, y, w, h) in corners {
            if let Some(r) = to_rect(canvas, x, y, w, h) {
                draw_filled_rect_mut(&mut self.surface, r, color);
            }
        }

        // 5. 标签背景 (仅顶部圆角)
        let label = layout.label;
        let radius = LABEL_RADIUS.min(label.width / 2.0);
        if let Some(r) = to_rect(
            canvas,
            label.x,
            label.y + radius,
            label.width,
            label.height - radius,
        ) {
            draw_filled_rect_mut(&mut self.surface, r, color);
        }
        if let Some(r) = to_rect(
            canvas,
            label.x + radius,
            label.y,
            label.width - radius * 2.0,
            radius,
        ) {
            draw_filled_rect_mut(&mut self.surface, r, color);
        }
        let ri = radius as i32;
        if ri > 0 {
            let (lx, ly) = to_point(canvas, label.x, label.y);
            let (rx, _) = to_point(canvas, label.x + label.width, label.y);
            draw_filled_circle_mut(&mut self.surface, (lx + ri, ly + ri), ri, color);
            draw_filled_circle_mut(&mut self.surface, (rx - ri - 1, ly + ri), ri, color);
        }

        // 6. 标签文字
        if let Some(font) = &self.font {
            let (tx, ty) = to_point(canvas, label.text_x, label.text_y);
            draw_text_mut(&mut self.surface, TEXT_COLOR, tx, ty, self.scale, font, &caption);
        }
    }
}

impl Renderer for OverlayRenderer {
    fn render(&mut self, canvas_size: (u32, u32), detections: &[Detection]) -> usize {
        let (width, height) = canvas_size;
        if self.surface.dimensions() == canvas_size {
            self.clear();
        } else {
            self.surface = RgbaImage::new(width, height);
        }
        if width == 0 || height == 0 {
            return detections.len();
        }

        for (index, detection) in detections.iter().enumerate() {
            self.draw_detection(detection, index);
        }
        detections.len()
    }

    fn clear(&mut self) {
        for pixel in self.surface.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    fn surface(&self) -> &RgbaImage {
        &self.surface
    }
}

fn load_font(path: &Path) -> Option<FontVec> {
    let bytes = std::fs::read(path).ok()?;
    match FontVec::try_from_vec(bytes) {
        Ok(font) => {
            log::info!("✅ 字体加载成功: {}", path.display());
            Some(font)
        }
        Err(e) => {
            log::warn!("⚠️ 字体加载失败 {}: {}", path.display(), e);
            None
        }
    }
}

fn with_alpha(color: Rgba<u8>, alpha: u8) -> Rgba<u8> {
    Rgba([color[0], color[1], color[2], alpha])
}

/// 坐标限制在画布四周各一个画布宽高以内, 画布外的部分本就不可见
fn clamp_coord(v: f32, extent: u32) -> f32 {
    let limit = extent as f32;
    v.clamp(-limit, limit * 2.0)
}

fn to_point(canvas: (u32, u32), x: f32, y: f32) -> (i32, i32) {
    (
        clamp_coord(x, canvas.0).round() as i32,
        clamp_coord(y, canvas.1).round() as i32,
    )
}

/// 浮点矩形 → imageproc 矩形, 裁剪后宽或高不足1像素时返回 None
fn to_rect(canvas: (u32, u32), x: f32, y: f32, w: f32, h: f32) -> Option<Rect> {
    let x0 = clamp_coord(x, canvas.0).round();
    let y0 = clamp_coord(y, canvas.1).round();
    let w = clamp_coord(x + w, canvas.0).round() - x0;
    let h = clamp_coord(y + h, canvas.1).round() - y0;
    if !(w >= 1.0 && h >= 1.0) {
        return None;
    }
    Some(Rect::at(x0 as i32, y0 as i32).of_size(w as u32, h as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::DetectionBox;

    fn det(x: f32, y: f32, w: f32, h: f32) -> Detection {
        Detection {
            label: "person".to_string(),
            confidence: 0.91,
            bbox: DetectionBox { x, y, w, h },
        }
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_layout_scales_to_canvas() {
        let layout = layout_detection(&det(0.1, 0.2, 0.3, 0.4), 0, 1000, 500, 80.0);
        assert!(close(layout.rect.x, 100.0));
        assert!(close(layout.rect.y, 100.0));
        assert!(close(layout.rect.w, 300.0));
        assert!(close(layout.rect.h, 200.0));
        assert!(close(layout.corner_len, 20.0));

        // 上方空间充足, 标签在框外
        assert!(!layout.label.inside);
        assert!(close(layout.label.y, 70.0));
        assert!(close(layout.label.width, 100.0));
        assert!(close(layout.label.height, 28.0));
        assert!(close(layout.label.text_x, 110.0));
    }

    #[test]
    fn test_label_clamped_inside_box_near_top() {
        let layout = layout_detection(&det(0.2, 0.01, 0.3, 0.3), 0, 1000, 1000, 60.0);
        assert!(layout.label.inside);
        assert!(close(layout.label.y, layout.rect.y));
        assert!(layout.label.y >= 0.0);

        // 放得下时仍在框外
        let layout = layout_detection(&det(0.0, 0.05, 0.5, 0.5), 0, 1000, 1000, 60.0);
        assert!(!layout.label.inside);
        assert!(close(layout.label.y, 20.0));
    }

    #[test]
    fn test_corner_length_tracks_small_boxes() {
        let layout = layout_detection(&det(0.5, 0.5, 0.008, 0.02), 0, 1000, 1000, 10.0);
        assert!(close(layout.corner_len, 8.0));
    }

    #[test]
    fn test_color_cycles_by_index() {
        let d = det(0.1, 0.1, 0.1, 0.1);
        assert_eq!(layout_detection(&d, 2, 100, 100, 0.0).color_index, 2);
        assert_eq!(layout_detection(&d, 7, 100, 100, 0.0).color_index, 1);
    }

    #[test]
    fn test_render_sizes_surface_and_counts() {
        let mut renderer = OverlayRenderer::with_font(None);
        let detections = vec![det(0.1, 0.2, 0.3, 0.4), det(0.5, 0.5, 0.2, 0.2)];
        let count = renderer.render((200, 100), &detections);
        assert_eq!(count, 2);
        assert_eq!(renderer.surface().dimensions(), (200, 100));

        // 框内有半透明填充, 画面角落保持透明
        let inside = renderer.surface().get_pixel(40, 60);
        assert!(inside[3] > 0);
        assert_eq!(renderer.surface().get_pixel(199, 0)[3], 0);

        renderer.clear();
        assert!(renderer.surface().pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_render_resizes_with_video() {
        let mut renderer = OverlayRenderer::with_font(None);
        renderer.render((64, 48), &[det(0.1, 0.1, 0.5, 0.5)]);
        assert_eq!(renderer.render((32, 24), &[]), 0);
        assert_eq!(renderer.surface().dimensions(), (32, 24));
        assert!(renderer.surface().pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_degenerate_boxes_do_not_panic() {
        let mut renderer = OverlayRenderer::with_font(None);
        let detections = vec![
            det(0.0, 0.0, 0.0, 0.0),
            det(0.99, 0.99, 0.5, 0.5),
            det(-0.2, -0.2, 0.1, 0.1),
        ];
        assert_eq!(renderer.render((50, 50), &detections), 3);
    }

    #[test]
    fn test_out_of_range_boxes_do_not_panic() {
        let mut renderer = OverlayRenderer::with_font(None);
        let detections = vec![
            det(1e7, 0.1, 1.0, 0.1),
            det(0.1, -1e9, 0.2, 1e9),
            det(f32::MAX, f32::MIN, f32::MAX, f32::MAX),
            det(f32::NAN, 0.1, f32::INFINITY, 0.2),
            det(0.1, 0.1, 0.2, 0.2),
        ];
        assert_eq!(renderer.render((1000, 500), &detections), 5);

        // 正常的框照常绘制
        assert!(renderer.surface().get_pixel(150, 75)[3] > 0);
    }

    #[test]
    fn test_to_rect_clips_far_edges() {
        let r = to_rect((100, 50), -1e6, 10.0, 2e6, 20.0).unwrap();
        assert_eq!((r.left(), r.top()), (-100, 10));
        assert_eq!((r.width(), r.height()), (300, 20));
        assert!(to_rect((100, 50), 1e9, 10.0, 5.0, 5.0).is_none());
        assert!(to_rect((100, 50), f32::NAN, 10.0, 5.0, 5.0).is_none());
    }
}
