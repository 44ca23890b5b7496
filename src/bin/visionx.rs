// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// VisionX 实时检测客户端
///
/// 系统架构:
/// 1. 采集线程: 摄像头解码 (camera 特性) 或图片循环播放
/// 2. 推理线程: 采样 → POST /predict → 解析 (单飞)
/// 3. 健康线程: GET /health 轮询连接状态
/// 4. 主线程:   渲染显示 (macroquad事件循环)
use clap::Parser;
use macroquad::prelude::*;
use visionx_rs::input::SourceSpec;
use visionx_rs::renderer::Viewer;
use visionx_rs::Args;

fn window_conf() -> Conf {
    Conf {
        window_title: "VisionX - Real-time Object Detection".to_string(),
        window_width: 1280,
        window_height: 800,
        high_dpi: true,
        window_resizable: true,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    visionx_rs::init_logging();
    let args = Args::parse();

    let config = args.resolve_config();
    config.print_summary();

    let source = SourceSpec::resolve(args.source.clone(), args.camera);
    match &source {
        Some(selected) => log::info!("📹 视频源: {}", selected.describe()),
        None => log::warn!("⚠️ 未指定视频源 (--source / --camera)"),
    }

    let mut viewer = Viewer::new(config, source);
    log::info!("✅ 系统就绪\n");

    loop {
        viewer.handle_input();
        viewer.update();
        viewer.draw();
        viewer.draw_egui();

        if is_key_pressed(KeyCode::Escape) {
            viewer.stop();
            break;
        }
        next_frame().await;
    }
}
