// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

// 构建脚本: 启用 camera 特性时链接FFmpeg依赖库
fn main() {
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_CAMERA");

    // 仅在Windows MSVC环境下, 且启用摄像头采集时添加FFmpeg相关库
    #[cfg(all(target_os = "windows", target_env = "msvc"))]
    {
        if std::env::var_os("CARGO_FEATURE_CAMERA").is_some() {
            // Intel QSV (Quick Sync Video) 硬件加速
            println!("cargo:rustc-link-lib=dylib=libmfx");

            // DirectShow 摄像头 / OLE 自动化和VFW
            println!("cargo:rustc-link-lib=dylib=oleaut32");
            println!("cargo:rustc-link-lib=dylib=vfw32");
            println!("cargo:rustc-link-lib=dylib=strmiids");
        }
    }
}
