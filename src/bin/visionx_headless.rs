// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// VisionX 无窗口运行器
///
/// 与窗口版使用同一个检测会话, 以固定帧率驱动, 定期输出统计,
/// 结束时保存一张截图
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::{Duration, Instant};
use visionx_rs::input::SourceSpec;
use visionx_rs::pipeline::{
    spawn_availability_monitor, AvailabilityMonitor, DetectionControls, DetectionSession,
    FrameSampler, HttpInferenceClient,
};
use visionx_rs::renderer::{CaptureExporter, OverlayRenderer};
use visionx_rs::Args;

/// 驱动频率 (模拟显示刷新)
const TICK_INTERVAL: Duration = Duration::from_millis(16);
const REPORT_INTERVAL: Duration = Duration::from_secs(1);

fn main() -> Result<()> {
    visionx_rs::init_logging();
    let args = Args::parse();

    let config = args.resolve_config();
    config.print_summary();

    let selected = SourceSpec::resolve(args.source.clone(), args.camera)
        .ok_or_else(|| anyhow!("no video source, use --source <image|dir> or --camera <index>"))?;

    let client = Arc::new(HttpInferenceClient::new(
        &config.api_url,
        config.request_timeout(),
    ));
    let monitor = spawn_availability_monitor(
        client.clone(),
        AvailabilityMonitor::new(config.ready_retry(), config.offline_retry()),
    );

    let mut session = DetectionSession::new(
        client,
        FrameSampler::new(config.sample_width, config.jpeg_quality),
        OverlayRenderer::new(config.font_path.as_deref()),
        CaptureExporter::new(config.capture_dir.clone()),
    )
    .with_warmup(config.warmup());

    let source = selected
        .open(&config)
        .with_context(|| format!("failed to open {}", selected.describe()))?;
    session.start(source)?;

    let controls = DetectionControls {
        detection_enabled: true,
        threshold: config.default_threshold(),
    };
    let deadline = args.duration.map(|s| Instant::now() + Duration::from_secs(s));
    let mut last_report = Instant::now();

    log::info!("🚀 开始检测 (阈值 {}%)", config.default_threshold_percent);
    while deadline.map_or(true, |d| Instant::now() < d) {
        let now = Instant::now();
        session.tick(now, &controls);

        for update in monitor.updates() {
            log::info!("🔌 {}", update.text());
        }

        if now.duration_since(last_report) >= REPORT_INTERVAL {
            let stats = session.stats();
            let labels: Vec<String> = stats
                .log
                .iter()
                .map(|row| format!("{} {}%", row.label, row.confidence_percent))
                .collect();
            log::info!(
                "📊 FPS: {} | 目标: {} | {}",
                stats.fps,
                stats.object_count,
                labels.join(", ")
            );
            last_report = now;
        }

        std::thread::sleep(TICK_INTERVAL);
    }

    match session.capture() {
        Ok(path) => log::info!("📸 最后一帧: {}", path.display()),
        Err(e) => log::warn!("⚠️ 截图失败: {}", e),
    }
    session.stop();
    Ok(())
}
