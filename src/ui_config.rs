// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 客户端配置 - 通过JSON文件调整参数

use crate::pipeline::client::DEFAULT_REQUEST_TIMEOUT;
use crate::pipeline::health::{OFFLINE_RETRY, READY_RETRY};
use crate::pipeline::sampler::{JPEG_QUALITY, SAMPLE_WIDTH};
use crate::pipeline::session::DEFAULT_WARMUP;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 客户端参数配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    // === 后端 ===
    pub api_url: String,           // 推理服务地址
    pub request_timeout_ms: u64,   // 单次推理超时
    pub health_ready_retry_ms: u64,   // 可达未就绪时的重试间隔
    pub health_offline_retry_ms: u64, // 不可达时的重试间隔

    // === 采样 ===
    pub sample_width: u32, // 上传宽度
    pub jpeg_quality: u8,  // JPEG质量 1~100

    // === 检测 ===
    pub default_threshold_percent: u32, // 滑块初始值 0~100
    pub warmup_ms: u64,                 // 加载提示最长时间

    // === 输出 ===
    pub capture_dir: PathBuf,
    pub font_path: Option<PathBuf>,

    // === 视频源 ===
    pub still_fps: f32, // 图片源播放帧率
    pub camera_width: u32,
    pub camera_height: u32,
    pub camera_frame_rate: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            health_ready_retry_ms: READY_RETRY.as_millis() as u64,
            health_offline_retry_ms: OFFLINE_RETRY.as_millis() as u64,

            sample_width: SAMPLE_WIDTH,
            jpeg_quality: JPEG_QUALITY,

            default_threshold_percent: 50,
            warmup_ms: DEFAULT_WARMUP.as_millis() as u64,

            capture_dir: PathBuf::from("."),
            font_path: None,

            still_fps: 30.0,
            camera_width: 1280,
            camera_height: 720,
            camera_frame_rate: 30,
        }
    }
}

impl ClientConfig {
    /// 从JSON文件加载配置, 文件不存在时写入默认配置
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(config) => {
                    log::info!("✅ 配置已从 {} 加载", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("⚠️ 配置文件解析失败: {}, 使用默认值", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("📝 配置文件不存在,创建默认配置...");
                let config = Self::default();
                config.save(path);
                config
            }
        }
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: &Path) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(path, json) {
                    log::error!("❌ 保存配置失败: {}", e);
                } else {
                    log::info!("💾 配置已保存到 {}", path.display());
                }
            }
            Err(e) => log::error!("❌ 序列化配置失败: {}", e),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn ready_retry(&self) -> Duration {
        Duration::from_millis(self.health_ready_retry_ms)
    }

    pub fn offline_retry(&self) -> Duration {
        Duration::from_millis(self.health_offline_retry_ms)
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }

    /// 滑块百分比 → 阈值 (70 → 0.7)
    pub fn default_threshold(&self) -> f32 {
        crate::threshold_from_percent(self.default_threshold_percent)
    }

    /// 打印当前配置
    pub fn print_summary(&self) {
        log::info!("🎛️ 当前客户端配置:");
        log::info!("  后端地址: {}", self.api_url);
        log::info!("  上传尺寸: {}px 宽, JPEG质量 {}", self.sample_width, self.jpeg_quality);
        log::info!("  默认置信度: {}%", self.default_threshold_percent);
        log::info!("  截图目录: {}", self.capture_dir.display());
    }
}
