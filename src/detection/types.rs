// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 检测数据结构定义
/// Data structures shared by the inference client, overlay renderer and detection log
use serde::{Deserialize, Serialize};

// ========== 数据结构 ==========

/// 归一化检测框 (Normalized bounding box)
///
/// 坐标为相对帧宽高的比例 `[0,1]`, 原点在左上角
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

/// 像素坐标矩形 (Pixel-space rectangle)
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl DetectionBox {
    /// 归一化坐标 → 当前画布像素坐标
    pub fn to_pixels(&self, canvas_width: u32, canvas_height: u32) -> PixelRect {
        let cw = canvas_width as f32;
        let ch = canvas_height as f32;
        PixelRect {
            x: self.x * cw,
            y: self.y * ch,
            w: self.w * cw,
            h: self.h * ch,
        }
    }
}

/// 单个检测结果 (后端 `/predict` 返回)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    #[serde(rename = "box")]
    pub bbox: DetectionBox,
}

impl Detection {
    /// 置信度百分比, 四舍五入 (0.875 → 88)
    pub fn confidence_percent(&self) -> i64 {
        (self.confidence * 100.0).round() as i64
    }

    /// 标签文字: "PERSON · 88%"
    pub fn caption(&self) -> String {
        format!(
            "{} · {}%",
            self.label.to_uppercase(),
            self.confidence_percent()
        )
    }
}

/// 推理响应
///
/// `detections == None` 表示响应中没有可用的 `detections` 字段 (缺失或格式错误),
/// 本轮视为"无检测", 不清除已有叠加层
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InferenceResponse {
    pub detections: Option<Vec<Detection>>,
}

/// 检测日志行 (检测列表 → 文本日志投影)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRow {
    pub label: String,
    pub confidence_percent: i64,
    pub color_index: usize, // 与叠加层框颜色一致
}

/// 检测列表投影为日志行, 颜色按列表序号轮转
pub fn project_log(detections: &[Detection], palette_len: usize) -> Vec<LogRow> {
    detections
        .iter()
        .enumerate()
        .map(|(index, det)| LogRow {
            label: det.label.clone(),
            confidence_percent: det.confidence_percent(),
            color_index: index % palette_len.max(1),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(label: &str, confidence: f32) -> Detection {
        Detection {
            label: label.to_string(),
            confidence,
            bbox: DetectionBox::default(),
        }
    }

    #[test]
    fn test_deserialize_backend_payload() {
        let json = r#"{"label":"person","confidence":0.91,"box":{"x":0.1,"y":0.2,"w":0.3,"h":0.4}}"#;
        let d: Detection = serde_json::from_str(json).unwrap();
        assert_eq!(d.label, "person");
        assert!((d.confidence - 0.91).abs() < 1e-6);
        assert_eq!(
            d.bbox,
            DetectionBox {
                x: 0.1,
                y: 0.2,
                w: 0.3,
                h: 0.4
            }
        );
    }

    #[test]
    fn test_to_pixels() {
        let b = DetectionBox {
            x: 0.1,
            y: 0.2,
            w: 0.3,
            h: 0.4,
        };
        let r = b.to_pixels(1000, 500);
        assert!((r.x - 100.0).abs() < 1e-3);
        assert!((r.y - 100.0).abs() < 1e-3);
        assert!((r.w - 300.0).abs() < 1e-3);
        assert!((r.h - 200.0).abs() < 1e-3);
    }

    #[test]
    fn test_caption_rounds_half_up() {
        assert_eq!(det("cup", 0.875).caption(), "CUP · 88%");
        assert_eq!(det("dog", 0.5).caption(), "DOG · 50%");
        assert_eq!(det("Cell Phone", 0.004).caption(), "CELL PHONE · 0%");
    }

    #[test]
    fn test_project_log_round_robin() {
        let dets: Vec<_> = (0..8).map(|i| det(&format!("obj{}", i), 0.5)).collect();
        let rows = project_log(&dets, 6);
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0].color_index, 0);
        assert_eq!(rows[5].color_index, 5);
        assert_eq!(rows[6].color_index, 0);
        assert_eq!(rows[7].label, "obj7");
        assert_eq!(rows[7].confidence_percent, 50);
    }
}
