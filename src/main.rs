//! Main application for the batch video downloader GUI

// egui window and event handling
mod app;

use std::sync::Arc;

use eframe::egui::Visuals;
use log::{info, warn};
// OnceCell for single-time runtime initialization
use once_cell::sync::OnceCell;
use reelgrab::{
    AppError, HttpThumbnailFetcher, RunnerSettings,
    config::AppConfig,
    downloader::{YtDlp, locate_ytdlp},
    logging,
};
use tokio::runtime::Runtime;

// Global Tokio runtime stored in a OnceCell for lazy init
static RUNTIME: OnceCell<Runtime> = OnceCell::new();

/// Program entry point: initializes runtime and launches GUI
fn main() -> Result<(), AppError> {
    let config = AppConfig::from_env();
    logging::initialize(config.log_destination, config.log_level);
    for warning in &config.warnings {
        warn!("{warning}");
    }

    let runtime = RUNTIME.get_or_try_init(Runtime::new)?;

    let engine = Arc::new(YtDlp::new(locate_ytdlp(config.ytdlp.as_deref())));
    let thumbnails = Arc::new(HttpThumbnailFetcher::new(config.thumbnail_timeout)?);
    let settings = RunnerSettings {
        transcoder: config.transcoder(),
    };
    info!(
        "Engine {}, transcoder {}",
        engine.program().display(),
        settings
            .transcoder
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "from PATH".to_owned())
    );

    let handle = runtime.handle().clone();
    let download_dir = config.download_dir;

    // Configure default native options for egui window
    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Reelgrab",
        options,
        Box::new(move |cc| {
            // Use dark theme visuals
            cc.egui_ctx.set_visuals(Visuals::dark());
            Box::new(app::ReelgrabApp::new(
                cc,
                handle,
                engine,
                thumbnails,
                settings,
                download_dir,
            ))
        }),
    )?;
    Ok(())
}
