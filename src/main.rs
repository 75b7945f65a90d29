#![allow(dead_code)]

//! path-trace - Mouse Path Tracer
//!
//! Records the mouse cursor's trajectory on one display, animates the path
//! while recording, and exports the finished path as a video.
//!
//! - Fixed-rate cursor sampling on a worker thread
//! - Animated "growing line" preview
//! - Flat colour or image backgrounds
//! - Video export through ffmpeg, one frame per sample
//! - Global F8 hotkey to start/stop

use std::path::PathBuf;
use std::time::{Duration, Instant};

use device_query::Keycode;
use eframe::egui::{self, Color32, RichText};

mod capture;
mod export;
mod recording;
mod render;
mod settings;

use capture::{DevicePointer, HotkeyWatcher, MonitorInfo};
use export::{ExportError, ExportJob, ExportTask};
use recording::{Recording, RecordingSession};
use render::{
    Background, BackgroundMode, LivePreview, PathStyle, ResolvedBackground, SAMPLE_RATE_RANGE,
    SPEED_RANGE, THICKNESS_RANGE,
};
use settings::AppSettings;

const HOTKEY: Keycode = Keycode::F8;
const DEFAULT_EXPORT_NAME: &str = "mouse-path.mp4";
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "webp", "tif", "tiff"];

/// Preview size used when no display could be enumerated
const FALLBACK_SIZE: (u32, u32) = (1920, 1080);

fn main() -> eframe::Result<()> {
    env_logger::init();
    log::info!("Starting path-trace");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_title("Mouse Path Trace"),
        ..Default::default()
    };

    eframe::run_native(
        "path-trace",
        options,
        Box::new(|cc| Ok(Box::new(TracerApp::new(cc)))),
    )
}

/// What the app is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum Status {
    #[default]
    Ready,
    Recording,
    Complete,
    Exporting,
}

impl Status {
    fn label(&self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::Recording => "Recording",
            Self::Complete => "Complete",
            Self::Exporting => "Exporting",
        }
    }

    fn color(&self) -> Color32 {
        match self {
            Self::Recording => Color32::from_rgb(239, 68, 68),
            Self::Exporting => Color32::from_rgb(192, 132, 252),
            Self::Ready | Self::Complete => Color32::from_rgb(52, 211, 153),
        }
    }
}

struct TracerApp {
    monitors: Vec<MonitorInfo>,
    selected_monitor: usize,
    style: PathStyle,
    background: Background,
    resolved_background: ResolvedBackground,
    preview: LivePreview,
    session: Option<RecordingSession>,
    recording: Option<Recording>,
    export: Option<ExportTask>,
    hotkey: Option<HotkeyWatcher>,
    status: Status,
    /// Last notice or error shown under the status line
    message: String,
}

impl TracerApp {
    fn new(cc: &eframe::CreationContext<'_>) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        let (monitors, message) = match MonitorInfo::enumerate() {
            Ok(monitors) => (monitors, String::new()),
            Err(e) => {
                log::error!("{}", e);
                (Vec::new(), format!("Error: {}", e))
            }
        };

        let ctx = cc.egui_ctx.clone();
        let hotkey = match HotkeyWatcher::spawn(HOTKEY, move || ctx.request_repaint()) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                log::warn!("Hotkey unavailable: {}", e);
                None
            }
        };

        let mut app = Self {
            monitors,
            selected_monitor: 0,
            style: PathStyle::default(),
            background: Background::default(),
            resolved_background: ResolvedBackground::default(),
            preview: LivePreview::new(),
            session: None,
            recording: None,
            export: None,
            hotkey,
            status: Status::default(),
            message,
        };

        AppSettings::load().apply(&mut app);
        app.refresh_background(&cc.egui_ctx);
        app
    }

    fn monitor(&self) -> Option<&MonitorInfo> {
        self.monitors.get(self.selected_monitor)
    }

    fn monitor_size(&self) -> (u32, u32) {
        self.monitor().map_or(FALLBACK_SIZE, MonitorInfo::size)
    }

    /// The selected display, or a stand-in so the preview still has a shape
    fn preview_monitor(&self) -> MonitorInfo {
        self.monitor().cloned().unwrap_or_else(|| {
            let (width, height) = FALLBACK_SIZE;
            MonitorInfo::new(0, 0, 0, width, height)
        })
    }

    fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    fn is_exporting(&self) -> bool {
        self.export.is_some()
    }

    /// Re-resolve the background for the selected display and show it
    fn refresh_background(&mut self, ctx: &egui::Context) {
        let (width, height) = self.monitor_size();
        self.resolved_background = match self.background.resolve(width, height) {
            Ok(resolved) => resolved,
            Err(e) => {
                log::error!("Failed to load background: {}", e);
                self.message = format!("Error: {}", e);
                ResolvedBackground::Color(image::Rgb(self.background.color))
            }
        };
        self.preview.set_background(ctx, &self.resolved_background);
    }

    fn toggle_recording(&mut self, ctx: &egui::Context) {
        if self.is_recording() {
            self.stop_recording();
        } else {
            self.start_recording(ctx);
        }
    }

    fn start_recording(&mut self, ctx: &egui::Context) {
        if self.is_exporting() {
            return;
        }
        let Some(monitor) = self.monitor().cloned() else {
            self.message = "No display to record".to_string();
            return;
        };

        self.refresh_background(ctx);
        self.preview.clear();
        self.recording = None;

        let repaint = ctx.clone();
        match RecordingSession::start(
            DevicePointer::checked_new,
            monitor,
            self.style.sample_rate_hz,
            move || repaint.request_repaint(),
        ) {
            Ok(session) => {
                self.session = Some(session);
                self.status = Status::Recording;
                self.message.clear();
            }
            Err(e) => {
                log::error!("Failed to start sampler: {}", e);
                self.message = format!("Error: {}", e);
            }
        }
    }

    fn stop_recording(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        let now = Instant::now();
        let interval = session.interval();
        for point in session.finish() {
            self.preview.push(*point, now, interval);
        }

        let recording = session.into_recording();
        self.message = format!("{} samples recorded", recording.len());
        self.recording = Some(recording);
        self.status = Status::Complete;
    }

    /// Move newly sampled points into the recording and the preview
    fn pump_samples(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let now = Instant::now();
        let interval = session.interval();
        for point in session.drain() {
            self.preview.push(*point, now, interval);
        }
    }

    fn start_export(&mut self) {
        let Some(recording) = self.recording.as_ref() else {
            return;
        };
        if recording.is_empty() || self.is_exporting() {
            return;
        }

        let Some(output) = rfd::FileDialog::new()
            .set_title("Export Video")
            .set_file_name(DEFAULT_EXPORT_NAME)
            .add_filter("MP4 video", &["mp4"])
            .save_file()
        else {
            return;
        };

        let (width, height) = recording.monitor().size();
        let job = ExportJob {
            points: recording.points().into(),
            width,
            height,
            sample_rate_hz: recording.sample_rate_hz(),
            style: self.style.clone(),
            background: self.resolved_background.clone(),
            output: with_default_extension(output),
        };

        log::info!(
            "Exporting {} samples at {:.1} fps to {}",
            recording.len(),
            job.fps(),
            job.output.display()
        );

        match ExportTask::spawn(job) {
            Ok(task) => {
                self.export = Some(task);
                self.status = Status::Exporting;
            }
            Err(e) => {
                log::error!("Failed to start export: {}", e);
                self.message = format!("Error: {}", e);
            }
        }
    }

    fn poll_export(&mut self) {
        let Some(result) = self.export.as_mut().and_then(ExportTask::poll) else {
            return;
        };
        self.export = None;
        self.status = Status::Complete;

        match result {
            Ok(summary) => {
                self.message = format!("Saved {}", summary.path.display());
                rfd::MessageDialog::new()
                    .set_level(rfd::MessageLevel::Info)
                    .set_title("Export Complete")
                    .set_description(summary.notice())
                    .show();
            }
            Err(ExportError::Empty) => {}
            Err(e) => {
                log::error!("Export failed: {}", e);
                self.message = format!("Export failed: {}", e);
                rfd::MessageDialog::new()
                    .set_level(rfd::MessageLevel::Error)
                    .set_title("Export Failed")
                    .set_description(e.to_string())
                    .show();
            }
        }
    }

    fn pick_background_image(&mut self, ctx: &egui::Context) {
        if let Some(path) = rfd::FileDialog::new()
            .set_title("Select Background Image")
            .add_filter("Image files", IMAGE_EXTENSIONS)
            .pick_file()
        {
            self.background.image_path = Some(path);
            self.message.clear();
            self.refresh_background(ctx);
        }
    }

    fn controls_ui(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let idle = !self.is_recording() && !self.is_exporting();

        ui.heading(RichText::new("Mouse Path Trace").color(Color32::from_rgb(192, 132, 252)));
        ui.label(RichText::new("Capture & Animate").small().weak());
        ui.separator();

        section(ui, "DISPLAY", |ui| {
            ui.add_enabled_ui(idle && !self.monitors.is_empty(), |ui| {
                let selected = self
                    .monitor()
                    .map(MonitorInfo::label)
                    .unwrap_or_else(|| "No displays".to_string());
                let before = self.selected_monitor;
                egui::ComboBox::from_id_salt("monitor")
                    .width(ui.available_width())
                    .selected_text(selected)
                    .show_ui(ui, |ui| {
                        for monitor in &self.monitors {
                            ui.selectable_value(&mut self.selected_monitor, monitor.index, monitor.label());
                        }
                    });
                if self.selected_monitor != before {
                    self.refresh_background(ctx);
                }

                ui.label(format!("Sample Rate: {} Hz", self.style.sample_rate_hz));
                ui.add(egui::Slider::new(&mut self.style.sample_rate_hz, SAMPLE_RATE_RANGE).show_value(false));
            });
        });

        section(ui, "PATH STYLE", |ui| {
            ui.horizontal(|ui| {
                ui.color_edit_button_srgb(&mut self.style.color);
                let [r, g, b] = self.style.color;
                ui.monospace(format!("#{:02X}{:02X}{:02X}", r, g, b));
            });

            ui.label(format!("Thickness: {}px", self.style.thickness));
            ui.add(egui::Slider::new(&mut self.style.thickness, THICKNESS_RANGE).show_value(false));

            ui.checkbox(&mut self.style.show_dots, "Show dots");
        });

        section(ui, "BACKGROUND", |ui| {
            ui.add_enabled_ui(idle, |ui| {
                let before = self.background.clone();
                ui.horizontal(|ui| {
                    for mode in [BackgroundMode::Color, BackgroundMode::Image] {
                        ui.radio_value(&mut self.background.mode, mode, mode.name());
                    }
                });

                match self.background.mode {
                    BackgroundMode::Color => {
                        ui.horizontal(|ui| {
                            ui.color_edit_button_srgb(&mut self.background.color);
                            ui.label("Background color");
                        });
                    }
                    BackgroundMode::Image => {
                        if ui.button("Select Image").clicked() {
                            self.pick_background_image(ctx);
                        }
                        let label = self
                            .background
                            .image_label()
                            .unwrap_or_else(|| "No image".to_string());
                        ui.label(RichText::new(label).small().italics());
                    }
                }

                if self.background != before {
                    self.refresh_background(ctx);
                }
            });
        });

        section(ui, "EXPORT", |ui| {
            ui.label(format!("Playback Speed: {:.1}x", self.style.speed));
            ui.add(
                egui::Slider::new(&mut self.style.speed, SPEED_RANGE)
                    .step_by(0.1)
                    .show_value(false),
            );
            ui.label(
                RichText::new("1x = realtime, 2x = 2x faster, 0.5x = slower")
                    .small()
                    .weak(),
            );
        });

        ui.separator();

        let (text, fill) = if self.is_recording() {
            ("■ STOP RECORDING", Color32::from_rgb(239, 68, 68))
        } else {
            ("● START RECORDING", Color32::from_rgb(192, 132, 252))
        };
        let can_toggle = self.is_recording() || (idle && !self.monitors.is_empty());
        let button = egui::Button::new(RichText::new(text).strong().color(Color32::WHITE))
            .fill(fill)
            .min_size(egui::vec2(ui.available_width(), 36.0));
        if ui.add_enabled(can_toggle, button).clicked() {
            self.toggle_recording(ctx);
        }

        let can_export = idle && self.recording.as_ref().is_some_and(|r| !r.is_empty());
        let button = egui::Button::new(RichText::new("💾 EXPORT VIDEO").strong())
            .min_size(egui::vec2(ui.available_width(), 36.0));
        if ui.add_enabled(can_export, button).clicked() {
            self.start_export();
        }

        ui.add_space(4.0);
        ui.label(RichText::new(format!("Press {:?} to start/stop", HOTKEY)).small().weak());
    }

    fn status_ui(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(RichText::new("●").color(self.status.color()).size(16.0));
            ui.label(RichText::new(self.status.label()).strong());

            let samples = self
                .session
                .as_ref()
                .map(RecordingSession::len)
                .or_else(|| self.recording.as_ref().map(Recording::len));
            if let Some(samples) = samples {
                ui.separator();
                ui.label(format!("Samples: {}", samples));
            }

            if let Some(task) = &self.export {
                let (done, total) = task.progress();
                ui.separator();
                ui.label(format!("Frame {}/{}", done, total));
            }

            if !self.message.is_empty() {
                ui.separator();
                ui.label(RichText::new(&self.message).weak());
            }
        });
    }
}

impl eframe::App for TracerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.hotkey.as_ref().is_some_and(HotkeyWatcher::take_pressed) {
            self.toggle_recording(ctx);
        }

        self.pump_samples();
        self.poll_export();

        let animating = self.preview.advance(Instant::now());
        if animating || self.is_recording() || self.is_exporting() {
            ctx.request_repaint_after(Duration::from_millis(16));
        }

        egui::SidePanel::left("controls")
            .resizable(false)
            .exact_width(340.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.controls_ui(ui, ctx);
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.status_ui(ui);
            ui.add_space(8.0);
            let monitor = self.preview_monitor();
            self.preview.show(ui, &monitor, &self.style);
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.stop_recording();
        AppSettings::from_app(self).save();
    }
}

/// A titled group box in the control column
fn section(ui: &mut egui::Ui, title: &str, add_contents: impl FnOnce(&mut egui::Ui)) {
    ui.add_space(6.0);
    ui.label(RichText::new(title).small().strong());
    ui.group(|ui| {
        ui.set_width(ui.available_width());
        add_contents(ui);
    });
}

/// Append `.mp4` when the chosen name has no extension
fn with_default_extension(path: PathBuf) -> PathBuf {
    if path.extension().is_some() {
        path
    } else {
        path.with_extension("mp4")
    }
}
