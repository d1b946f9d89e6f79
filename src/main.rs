//! Main application for the tubefetch GUI

// Error taxonomy shared by the retriever and the pipeline
mod error;
// Video metadata retrieval (yt-dlp)
mod info;
// Data models for metadata and pipeline events
mod model;
// Completion notification and file-opening helpers
mod notify;
// Download/convert pipeline
mod pipeline;
// Progress math for the bar and the window title
mod progress;
// The per-session Choice Store
mod selection;
// Thumbnail fetching
mod thumbnail;
// External executable discovery (yt-dlp, ffmpeg)
mod tools;
// Audio transcoder seam (ffmpeg)
mod transcode;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use eframe::{egui, App, Frame};
use egui::{ColorImage, TextureOptions, Visuals};
use once_cell::sync::OnceCell;
use rfd::FileDialog;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use error::Error;
use model::{PipelineEvent, VideoInfo};
use pipeline::DownloadPlan;
use selection::Selection;

/// Window title when no download is running.
const APP_TITLE: &str = "tubefetch";

// Global Tokio runtime stored in a OnceCell for lazy init
static RUNTIME: OnceCell<Arc<Runtime>> = OnceCell::new();

/// Program entry point: initializes logging and the runtime, launches the GUI.
fn main() -> Result<(), eframe::Error> {
    env_logger::init();

    let rt = Arc::new(Runtime::new().expect("failed to start tokio runtime"));
    RUNTIME.set(rt).unwrap();

    let options = eframe::NativeOptions::default();
    eframe::run_native(
        APP_TITLE,
        options,
        Box::new(|cc| {
            cc.egui_ctx.set_visuals(Visuals::dark());
            Box::new(TubefetchApp::default())
        }),
    )
}

fn runtime() -> &'static Arc<Runtime> {
    RUNTIME.get().expect("runtime not initialized")
}

/// Which screen is showing; mirrors the three-step flow plus the
/// download/done/error states.
#[derive(Clone, Copy, PartialEq)]
enum Section {
    ChooseVideo,
    VideoDetail,
    OutputDetail,
    Downloading,
    Done,
    Error,
}

/// Application state for the GUI
struct TubefetchApp {
    /// Current screen
    section: Section,
    /// The session's accumulated choices
    selection: Selection,
    /// URL text field
    url_input: String,
    /// Output file name text field
    name_input: String,
    /// Output folder text field
    path_input: String,
    /// MP3 toggle state
    mp3_input: bool,
    /// Overlay text while the info retriever runs
    loading_message: Option<String>,
    /// Message for the error screen
    error_message: String,
    /// "missing info" warning on the output screen
    missing_info: bool,
    /// In-flight info retrieval result
    info_rx: Option<UnboundedReceiver<Result<VideoInfo, Error>>>,
    /// In-flight pipeline events
    pipeline_rx: Option<UnboundedReceiver<PipelineEvent>>,
    /// Latest download fraction
    download_progress: f32,
    /// Latest byte-count label
    progress_label: String,
    /// True while ffmpeg runs
    transcoding: bool,
    /// The finished file
    done_path: Option<PathBuf>,
    /// Thumbnail decoded off-thread, waiting for texture upload
    thumbnail_result: Arc<Mutex<Option<ColorImage>>>,
    /// Thumbnail texture once uploaded
    thumbnail_tex: Option<egui::TextureHandle>,
}

/// Default initial state
impl Default for TubefetchApp {
    fn default() -> Self {
        Self {
            section: Section::ChooseVideo,
            selection: Selection::default(),
            url_input: String::new(),
            name_input: String::new(),
            path_input: dirs::download_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "./downloads".to_string()),
            mp3_input: false,
            loading_message: None,
            error_message: String::new(),
            missing_info: false,
            info_rx: None,
            pipeline_rx: None,
            download_progress: 0.0,
            progress_label: String::new(),
            transcoding: false,
            done_path: None,
            thumbnail_result: Arc::new(Mutex::new(None)),
            thumbnail_tex: None,
        }
    }
}

impl App for TubefetchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.poll_info(ctx);
        self.poll_pipeline(ctx);
        self.upload_thumbnail(ctx);

        egui::CentralPanel::default().show(ctx, |ui| match self.section {
            Section::ChooseVideo => self.show_choose_video(ui),
            Section::VideoDetail => self.show_video_detail(ui),
            Section::OutputDetail => self.show_output_detail(ui),
            Section::Downloading => self.show_downloading(ui),
            Section::Done => self.show_done(ui),
            Section::Error => self.show_error(ui),
        });

        // Keep polling for channel updates while work is in flight
        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}

impl TubefetchApp {
    /* Channel polling */

    fn poll_info(&mut self, ctx: &egui::Context) {
        let incoming = match self.info_rx.as_mut() {
            Some(rx) => rx.try_recv().ok(),
            None => None,
        };
        let Some(result) = incoming else {
            return;
        };
        self.info_rx = None;
        self.loading_message = None;

        match result {
            Ok(info) => {
                if info.formats.is_empty() {
                    self.error_message =
                        "No downloadable formats were found for this video.".to_string();
                    self.section = Section::Error;
                    return;
                }
                self.selection.video_info = Some(info);
                self.section = Section::VideoDetail;
                self.spawn_thumbnail_fetch(ctx);
            }
            Err(err) => {
                self.error_message = err.to_string();
                self.section = Section::Error;
            }
        }
    }

    fn poll_pipeline(&mut self, ctx: &egui::Context) {
        let mut events = Vec::new();
        if let Some(rx) = self.pipeline_rx.as_mut() {
            while let Ok(event) = rx.try_recv() {
                events.push(event);
            }
        }

        for event in events {
            match event {
                PipelineEvent::Progress { downloaded, total } => {
                    let fraction = progress::fraction(downloaded, total);
                    // Only move forward; out-of-order events never rewind the bar
                    if fraction > self.download_progress {
                        self.download_progress = fraction;
                    }
                    self.progress_label = match total {
                        Some(total) => format!(
                            "{} of {}",
                            progress::format_bytes(downloaded),
                            progress::format_bytes(total)
                        ),
                        None => progress::format_bytes(downloaded),
                    };
                    // Download fraction in the window title, visible from the taskbar
                    ctx.send_viewport_cmd(egui::ViewportCommand::Title(format!(
                        "{} - {:.0}%",
                        APP_TITLE,
                        self.download_progress * 100.0
                    )));
                }
                PipelineEvent::Transcoding => {
                    self.transcoding = true;
                }
                PipelineEvent::Done(path) => {
                    self.pipeline_rx = None;
                    self.transcoding = false;
                    self.done_path = Some(path.clone());
                    self.section = Section::Done;
                    ctx.send_viewport_cmd(egui::ViewportCommand::Title(APP_TITLE.to_owned()));
                    // Blocks on XDG until the notification is dismissed
                    runtime().spawn_blocking(move || notify::notify_completed(&path));
                }
                PipelineEvent::Failed(message) => {
                    self.pipeline_rx = None;
                    self.transcoding = false;
                    self.error_message = message;
                    self.section = Section::Error;
                    ctx.send_viewport_cmd(egui::ViewportCommand::Title(APP_TITLE.to_owned()));
                }
            }
        }
    }

    fn upload_thumbnail(&mut self, ctx: &egui::Context) {
        if self.thumbnail_tex.is_some() {
            return;
        }
        let pending = self.thumbnail_result.lock().unwrap().take();
        if let Some(img) = pending {
            self.thumbnail_tex = Some(ctx.load_texture("thumbnail", img, TextureOptions::default()));
        }
    }

    /* Background work */

    fn start_info_fetch(&mut self) {
        let url = self.url_input.trim().to_string();
        if url.is_empty() {
            return;
        }
        self.loading_message = Some("Fetching video info...".to_string());
        let (tx, rx) = unbounded_channel();
        self.info_rx = Some(rx);
        runtime().spawn(async move {
            let result = info::fetch_video_info(&url).await;
            let _ = tx.send(result);
        });
    }

    fn spawn_thumbnail_fetch(&mut self, ctx: &egui::Context) {
        self.thumbnail_tex = None;
        *self.thumbnail_result.lock().unwrap() = None;

        let url = self.selection.thumbnail_url();
        if url.is_empty() {
            return;
        }
        let slot = Arc::clone(&self.thumbnail_result);
        let ctx = ctx.clone();
        runtime().spawn_blocking(move || {
            if let Some(img) = thumbnail::fetch_thumbnail(&url) {
                *slot.lock().unwrap() = Some(img);
                ctx.request_repaint();
            }
        });
    }

    fn start_download(&mut self) {
        match DownloadPlan::from_selection(&self.selection) {
            Some(plan) => {
                let (tx, rx) = unbounded_channel();
                self.pipeline_rx = Some(rx);
                self.download_progress = 0.0;
                self.progress_label.clear();
                self.transcoding = false;
                self.section = Section::Downloading;
                runtime().spawn(pipeline::spawn_download(plan, tx));
            }
            None => {
                self.error_message = Error::NoStreamUrl.to_string();
                self.section = Section::Error;
            }
        }
    }

    /// The reload affordance: every failure is terminal for the session.
    fn restart(&mut self, ctx: &egui::Context) {
        ctx.send_viewport_cmd(egui::ViewportCommand::Title(APP_TITLE.to_owned()));
        *self = Self::default();
    }

    /* Section Choose Video */

    fn show_choose_video(&mut self, ui: &mut egui::Ui) {
        ui.heading(APP_TITLE);
        ui.add_space(8.0);
        ui.label("Paste a video URL:");
        ui.text_edit_singleline(&mut self.url_input);
        ui.add_space(8.0);

        if let Some(message) = self.loading_message.clone() {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(message);
            });
        } else if ui.button("Fetch video info").clicked() {
            self.start_info_fetch();
        }
    }

    /* Section Video Detail */

    fn show_video_detail(&mut self, ui: &mut egui::Ui) {
        ui.heading(self.selection.title());
        let author = self.selection.author();
        if !author.is_empty() {
            ui.label(author);
        }
        if let Some(tex) = &self.thumbnail_tex {
            ui.image(tex);
        }
        ui.separator();
        ui.label("Pick a format:");

        let mut clicked = None;
        egui::ScrollArea::vertical()
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                if let Some(info) = &self.selection.video_info {
                    for (idx, format) in info.formats.iter().enumerate() {
                        if ui.selectable_label(false, format.label()).clicked() {
                            clicked = Some(idx);
                        }
                    }
                }
            });
        if let Some(idx) = clicked {
            self.choose_format(idx);
        }
    }

    fn choose_format(&mut self, idx: usize) {
        self.selection.format_index = Some(idx);
        if let Some(format) = self.selection.selected_format() {
            self.name_input = self.selection.suggested_name(format);
        }
        self.mp3_input = false;
        self.missing_info = false;
        self.section = Section::OutputDetail;
    }

    /* Section Output Detail */

    fn show_output_detail(&mut self, ui: &mut egui::Ui) {
        ui.heading("Output");
        ui.add_space(8.0);

        ui.label("File name:");
        ui.text_edit_singleline(&mut self.name_input);

        ui.horizontal(|ui| {
            ui.label("Folder:");
            ui.text_edit_singleline(&mut self.path_input);
            if ui.button("Browse...").clicked() {
                if let Some(folder) = FileDialog::new()
                    .set_directory(&self.path_input)
                    .pick_folder()
                {
                    self.path_input = folder.display().to_string();
                }
            }
        });

        if ui
            .checkbox(&mut self.mp3_input, "Convert audio to MP3")
            .changed()
        {
            // Keep the name's extension in step with the toggle
            let container = self.selection.selected_format().map(|f| f.ext.clone());
            if let Some(container) = container {
                self.name_input =
                    selection::rename_extension(&self.name_input, self.mp3_input, &container);
            }
        }

        ui.add_space(8.0);
        if ui.button("Download").clicked() {
            self.selection.output_name = self.name_input.trim().to_string();
            self.selection.output_path = self.path_input.trim().to_string();
            self.selection.force_mp3 = Some(self.mp3_input);

            if self.selection.validate() {
                self.missing_info = false;
                self.start_download();
            } else {
                self.missing_info = true;
            }
        }
        if self.missing_info {
            ui.colored_label(
                egui::Color32::YELLOW,
                "Some details are missing. Fill in every field before downloading.",
            );
        }
    }

    /* Section Downloading */

    fn show_downloading(&mut self, ui: &mut egui::Ui) {
        if self.transcoding {
            ui.heading("Converting to MP3...");
            ui.add_space(8.0);
            ui.spinner();
        } else {
            ui.heading("Downloading...");
            ui.add_space(8.0);
            ui.add(egui::ProgressBar::new(self.download_progress).show_percentage());
            if !self.progress_label.is_empty() {
                ui.label(&self.progress_label);
            }
        }
    }

    /* Section Done */

    fn show_done(&mut self, ui: &mut egui::Ui) {
        ui.heading("Done!");
        if let Some(path) = self.done_path.clone() {
            ui.label(path.display().to_string());
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui.button("Open File").clicked() {
                    notify::open_file(&path);
                }
                if ui.button("Open Folder").clicked() {
                    notify::open_folder(&path);
                }
            });
        }
        ui.add_space(8.0);
        if ui.button("New Download").clicked() {
            let ctx = ui.ctx().clone();
            self.restart(&ctx);
        }
    }

    /* Section Error */

    fn show_error(&mut self, ui: &mut egui::Ui) {
        ui.heading("Something went wrong");
        ui.add_space(8.0);
        ui.colored_label(egui::Color32::LIGHT_RED, &self.error_message);
        ui.add_space(8.0);
        if ui.button("Restart").clicked() {
            let ctx = ui.ctx().clone();
            self.restart(&ctx);
        }
    }
}
