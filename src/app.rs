//! egui window: collects input, starts jobs, renders relayed events.

use std::{path::PathBuf, sync::Arc};

use eframe::{App, Frame, egui};
use egui::{TextureHandle, TextureOptions};
use log::debug;
use reelgrab::{
    DownloadOptions, Engine, EventReceiver, FormatChoice, JobKind, PreviewInfo, ProgressEvent,
    ProgressStatus, RunnerSettings, TaskEvent, TaskRunner, ThumbnailFetcher,
    model::{format_duration, parse_url_list},
    thumbnail::decode_thumbnail,
};
use rfd::FileDialog;
use tokio::runtime::Handle;

/// Oldest status lines are dropped past this many
const MAX_LOG_LINES: usize = 500;

/// Preview dialog contents
struct PreviewWindow {
    info: PreviewInfo,
    texture: Option<TextureHandle>,
    open: bool,
}

/// Application state for the GUI
pub struct ReelgrabApp {
    runner: TaskRunner,
    events: EventReceiver,
    /// One URL per line
    url_input: String,
    /// Destination folder for downloads
    download_folder: String,
    format: FormatChoice,
    /// Progress of the current file (0.0 to 1.0)
    progress: f32,
    speed: String,
    status_log: Vec<String>,
    preview: Option<PreviewWindow>,
}

impl ReelgrabApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        runtime: Handle,
        engine: Arc<dyn Engine>,
        thumbnails: Arc<dyn ThumbnailFetcher>,
        settings: RunnerSettings,
        download_folder: PathBuf,
    ) -> Self {
        let ctx = cc.egui_ctx.clone();
        let (runner, events) = TaskRunner::new(
            runtime,
            engine,
            thumbnails,
            settings,
            Arc::new(move || ctx.request_repaint()),
        );
        Self {
            runner,
            events,
            url_input: String::new(),
            download_folder: download_folder.display().to_string(),
            format: FormatChoice::default(),
            progress: 0.0,
            speed: "N/A".to_owned(),
            status_log: Vec::new(),
            preview: None,
        }
    }

    fn log(&mut self, line: impl Into<String>) {
        self.status_log.push(line.into());
        if self.status_log.len() > MAX_LOG_LINES {
            let excess = self.status_log.len() - MAX_LOG_LINES;
            self.status_log.drain(..excess);
        }
    }

    fn handle_event(&mut self, ctx: &egui::Context, event: TaskEvent) {
        match event {
            TaskEvent::Started { kind: JobKind::Download, .. } => {
                self.progress = 0.0;
                self.speed = "N/A".to_owned();
                self.log("⏳ Starting batch download...");
            }
            TaskEvent::Started { kind: JobKind::PreviewFetch, .. } => {
                self.log("🔎 Fetching preview...");
            }
            TaskEvent::Progress { progress, .. } => self.apply_progress(progress),
            TaskEvent::AllFinished { .. } => {
                self.log("🎉 All downloads finished");
            }
            TaskEvent::PreviewReady { id, info } => {
                let texture = info
                    .thumbnail
                    .as_deref()
                    .and_then(decode_thumbnail)
                    .map(|img| {
                        ctx.load_texture(format!("preview-{id}"), img, TextureOptions::default())
                    });
                if info.thumbnail.is_some() && texture.is_none() {
                    debug!("Thumbnail for preview {id} could not be decoded");
                }
                self.log(format!("🖼 Preview ready: {}", info.title));
                self.preview = Some(PreviewWindow {
                    info,
                    texture,
                    open: true,
                });
            }
            TaskEvent::Failed { message, .. } => {
                self.log(format!("❌ Error: {message}"));
            }
            TaskEvent::Rejected { reason, .. } => {
                self.log(format!("⚠️ {reason}"));
            }
        }
    }

    fn apply_progress(&mut self, progress: ProgressEvent) {
        self.progress = progress.percent / 100.0;
        match progress.status {
            ProgressStatus::Downloading => {
                self.speed = progress.speed.unwrap_or_else(|| "N/A".to_owned());
                self.log(format!("💾 Downloading... {:.2}%", progress.percent));
            }
            ProgressStatus::Finished => {
                self.speed = "Download finished".to_owned();
                self.log("✅ Download completed!");
            }
        }
    }

    fn start_download(&mut self) {
        let urls = parse_url_list(&self.url_input);
        let options = DownloadOptions {
            format: self.format,
            destination: PathBuf::from(self.download_folder.trim()),
        };
        // Rejections arrive as events and are logged there.
        if let Err(err) = self.runner.start_download(urls, options) {
            debug!("Download not started: {err}");
        }
    }

    fn start_preview(&mut self) {
        let first = parse_url_list(&self.url_input).into_iter().next().unwrap_or_default();
        if let Err(err) = self.runner.start_preview_fetch(first) {
            debug!("Preview not started: {err}");
        }
    }

    fn preview_window(&mut self, ctx: &egui::Context) {
        let Some(preview) = self.preview.as_mut() else {
            return;
        };
        let mut open = preview.open;
        egui::Window::new("Preview")
            .open(&mut open)
            .resizable(false)
            .collapsible(false)
            .show(ctx, |ui| {
                ui.heading(&preview.info.title);
                let duration = preview
                    .info
                    .duration_seconds
                    .map(format_duration)
                    .unwrap_or_else(|| "unknown".to_owned());
                ui.label(format!("Duration: {duration}"));
                match &preview.texture {
                    Some(tex) => {
                        ui.add(egui::Image::new(tex).max_width(360.0));
                    }
                    None => {
                        ui.weak("No thumbnail available");
                    }
                }
                if ui.button("🌐 View in browser").clicked() {
                    open_external(preview.info.page_url.clone());
                }
            });
        preview.open = open;
        if !open {
            self.preview = None;
        }
    }
}

/// GUI update loop: called each frame to redraw and handle interactions
impl App for ReelgrabApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        // Everything workers report is applied here, on the UI thread.
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(ctx, event);
        }

        let downloading = self.runner.is_busy(JobKind::Download);
        let previewing = self.runner.is_busy(JobKind::PreviewFetch);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Reelgrab");

            ui.label("Enter video URLs (one per line):");
            ui.add(
                egui::TextEdit::multiline(&mut self.url_input)
                    .desired_rows(5)
                    .desired_width(f32::INFINITY)
                    .hint_text("https://..."),
            );

            // Folder selection
            ui.horizontal(|ui| {
                ui.label("Download folder:");
                ui.text_edit_singleline(&mut self.download_folder);
                if ui.button("📂 Browse…").clicked() {
                    if let Some(folder) = FileDialog::new()
                        .set_directory(&self.download_folder)
                        .pick_folder()
                    {
                        self.download_folder = folder.display().to_string();
                    }
                }
                if ui.button("Open Folder").clicked() {
                    open_external(self.download_folder.clone());
                }
            });

            ui.horizontal(|ui| {
                ui.label("Format:");
                egui::ComboBox::from_id_source("format")
                    .selected_text(self.format.label())
                    .show_ui(ui, |ui| {
                        for choice in FormatChoice::ALL {
                            ui.selectable_value(&mut self.format, choice, choice.label());
                        }
                    });
            });

            ui.horizontal(|ui| {
                if ui
                    .add_enabled(!downloading, egui::Button::new("🌟 Download Videos"))
                    .clicked()
                {
                    self.start_download();
                }
                if ui
                    .add_enabled(!previewing, egui::Button::new("🔎 Preview"))
                    .clicked()
                {
                    self.start_preview();
                }
            });

            ui.add(egui::ProgressBar::new(self.progress).show_percentage());
            ui.label(format!("⚡ Speed: {}", self.speed));

            ui.separator();
            egui::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    for line in &self.status_log {
                        ui.label(line);
                    }
                });
        });

        self.preview_window(ctx);
    }
}

/// Hands a folder or URL to the platform's default opener
fn open_external(what: String) {
    std::thread::spawn(move || {
        #[cfg(target_os = "windows")]
        let result = std::process::Command::new("explorer").arg(&what).spawn();
        #[cfg(target_os = "macos")]
        let result = std::process::Command::new("open").arg(&what).spawn();
        #[cfg(all(unix, not(target_os = "macos")))]
        let result = std::process::Command::new("xdg-open").arg(&what).spawn();

        if let Err(err) = result {
            log::warn!("Could not open {what}: {err}");
        }
    });
}
