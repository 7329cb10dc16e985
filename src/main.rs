#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod error;
mod ffmpeg;
mod project;
mod ui;
mod utils;

use app::ConverterApp;
use eframe::egui;
use ffmpeg::FFmpegWrapper;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const APP_NAME: &str = "Universal Media Converter";

fn main() -> eframe::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let ffmpeg = FFmpegWrapper::discover();
    tracing::info!(
        "Starting {} v{} (ffmpeg: {}, ffprobe: {})",
        APP_NAME,
        env!("CARGO_PKG_VERSION"),
        ffmpeg.ffmpeg_path().display(),
        ffmpeg.ffprobe_path().display()
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 760.0])
            .with_min_inner_size([900.0, 600.0])
            .with_title(format!("{} v{}", APP_NAME, env!("CARGO_PKG_VERSION"))),
        ..Default::default()
    };

    eframe::run_native(
        APP_NAME,
        options,
        Box::new(move |cc| Ok(Box::new(ConverterApp::new(cc, ffmpeg)?))),
    )
}
