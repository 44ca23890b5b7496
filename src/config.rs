// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 命令行参数, 覆盖JSON配置文件中的同名项

use crate::ui_config::ClientConfig;
use clap::Parser;
use std::path::PathBuf;

/// VisionX 实时检测客户端参数
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "VisionX - 实时目标检测客户端", long_about = None)]
pub struct Args {
    /// 配置文件路径 (不存在时自动创建)
    #[arg(long, default_value = "visionx.json")]
    pub config: PathBuf,

    /// 推理服务地址, 例如 http://localhost:8000
    #[arg(long)]
    pub api_url: Option<String>,

    /// 图片文件或图片目录, 作为循环播放的视频源
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// 摄像头设备序号 (需要 camera 特性)
    #[arg(short, long)]
    pub camera: Option<usize>,

    /// 初始置信度阈值 (百分比 0~100)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(0..=100))]
    pub threshold: Option<u32>,

    /// 截图保存目录
    #[arg(long)]
    pub capture_dir: Option<PathBuf>,

    /// 运行时长(秒), 到时自动停止 (无窗口模式)
    #[arg(short, long)]
    pub duration: Option<u64>,
}

impl Args {
    /// 命令行覆盖配置文件
    pub fn apply(&self, config: &mut ClientConfig) {
        if let Some(url) = &self.api_url {
            config.api_url = url.clone();
        }
        if let Some(threshold) = self.threshold {
            config.default_threshold_percent = threshold;
        }
        if let Some(dir) = &self.capture_dir {
            config.capture_dir = dir.clone();
        }
    }

    /// 加载配置文件并应用命令行覆盖
    pub fn resolve_config(&self) -> ClientConfig {
        let mut config = ClientConfig::load(&self.config);
        self.apply(&mut config);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_file() {
        let args = Args::parse_from([
            "visionx",
            "--api-url",
            "http://gpu-box:8000",
            "--threshold",
            "70",
            "--capture-dir",
            "shots",
        ]);
        let mut config = ClientConfig::default();
        args.apply(&mut config);

        assert_eq!(config.api_url, "http://gpu-box:8000");
        assert_eq!(config.default_threshold_percent, 70);
        assert_eq!(config.capture_dir, PathBuf::from("shots"));
        assert_eq!(args.config, PathBuf::from("visionx.json"));
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        assert!(Args::try_parse_from(["visionx", "--threshold", "150"]).is_err());
    }

    #[test]
    fn test_defaults_leave_config_untouched() {
        let args = Args::parse_from(["visionx"]);
        let mut config = ClientConfig::default();
        args.apply(&mut config);
        assert_eq!(config, ClientConfig::default());
    }
}
