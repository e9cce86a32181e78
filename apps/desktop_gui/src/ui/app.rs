//! Desktop shell: drop zone, preview, analyze action and verdict card.

use std::{path::PathBuf, time::Duration};

use client_core::{
    preview_for, AnalyzeRejected, CandidateSource, FileCandidate, IntakeRejection, PreviewImage,
    SelectedFile, SessionState, SettleDisposition, Settlement, UploadWorkflow,
};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use egui::TextureHandle;
use shared::{
    domain::{AnalysisReport, ImageMime},
    error::AnalysisFailure,
};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::{
    events::{err_label, UiError, UiErrorContext, UiEvent},
    orchestration::dispatch_backend_command,
};

#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub api_base_url: String,
    pub preview_max_dimension: u32,
    pub initial_file: Option<PathBuf>,
}

/// GPU texture for the selected image. Dropped together with the selection.
pub struct TexturePreview {
    texture: TextureHandle,
    size: egui::Vec2,
}

impl TexturePreview {
    fn load(ctx: &egui::Context, file: &SelectedFile, image: PreviewImage) -> Self {
        let color_image = egui::ColorImage::from_rgba_unmultiplied(image.size(), &image.rgba);
        let texture = ctx.load_texture(
            format!("selection-preview:{}", file.id.0),
            color_image,
            egui::TextureOptions::LINEAR,
        );
        Self {
            texture,
            size: egui::vec2(image.width as f32, image.height as f32),
        }
    }
}

/// `None` when the bytes did not decode; a placeholder is shown instead.
type SelectionPreview = Option<TexturePreview>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusBannerSeverity {
    Error,
}

#[derive(Debug, Clone)]
struct StatusBanner {
    severity: StatusBannerSeverity,
    message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ServiceHealth {
    Unknown,
    Healthy(String),
    Unhealthy(String),
}

pub struct DesktopGuiApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    workflow: UploadWorkflow<SelectionPreview>,
    api_base_url: String,
    preview_max_dimension: u32,
    status: String,
    status_banner: Option<StatusBanner>,
    service_health: ServiceHealth,
}

impl DesktopGuiApp {
    pub fn new(
        ctx: &egui::Context,
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        startup: StartupConfig,
    ) -> Self {
        let mut app = Self {
            cmd_tx,
            ui_rx,
            workflow: UploadWorkflow::new(),
            api_base_url: startup.api_base_url,
            preview_max_dimension: startup.preview_max_dimension,
            status: "Select an image to analyze".to_string(),
            status_banner: None,
            service_health: ServiceHealth::Unknown,
        };
        app.request_health_check();
        if let Some(path) = startup.initial_file {
            app.load_path(ctx, path);
        }
        app
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::AnalysisSettled(settlement) => self.apply_settlement(settlement),
                UiEvent::HealthChecked {
                    api_base_url,
                    healthy,
                    status,
                } => {
                    self.status = format!("{api_base_url} reports '{status}'");
                    self.service_health = if healthy {
                        ServiceHealth::Healthy(status)
                    } else {
                        ServiceHealth::Unhealthy(status)
                    };
                }
                UiEvent::Error(err) => self.report_error(err),
            }
        }
    }

    fn apply_settlement(&mut self, settlement: Settlement) {
        match self.workflow.settle(settlement) {
            SettleDisposition::Applied => {
                self.status = match self.workflow.state() {
                    SessionState::Succeeded(report) => format!(
                        "{}: {} ({})",
                        report.file_name,
                        report.verdict.headline(),
                        report.verdict.confidence_percent()
                    ),
                    SessionState::Failed(failure) => {
                        format!("Analysis failed: {}", failure.kind.label())
                    }
                    SessionState::Idle | SessionState::Pending { .. } => self.status.clone(),
                };
            }
            SettleDisposition::Stale => {
                tracing::debug!("ignoring analysis result for a previous selection");
            }
        }
    }

    fn report_error(&mut self, err: UiError) {
        if err.context() == UiErrorContext::HealthCheck {
            self.service_health = ServiceHealth::Unhealthy(err.message().to_string());
        }
        self.status = format!("{} error: {}", err_label(err.category()), err.message());
        if err.wants_banner() {
            self.status_banner = Some(StatusBanner {
                severity: StatusBannerSeverity::Error,
                message: self.status.clone(),
            });
        }
    }

    fn offer_candidate(&mut self, ctx: &egui::Context, candidate: FileCandidate) {
        self.offer_candidates(ctx, [candidate], 0);
    }

    /// Selects the first of `candidates` through the workflow; the rest are
    /// only counted for the status line.
    fn offer_candidates<I>(&mut self, ctx: &egui::Context, candidates: I, ignored: usize)
    where
        I: IntoIterator,
        I::Item: CandidateSource,
    {
        let max_dimension = self.preview_max_dimension;
        let selected = self.workflow.select_first(candidates, |file| {
            preview_for(file, max_dimension).map(|image| TexturePreview::load(ctx, file, image))
        });
        match selected {
            Ok(_) => {
                if let Some(file) = self.workflow.selected_file() {
                    self.status = format!(
                        "Selected {} ({})",
                        file.name,
                        human_readable_bytes(file.len() as u64)
                    );
                    if ignored > 0 {
                        self.status
                            .push_str(&format!("; ignored {ignored} additional file(s)"));
                    }
                }
            }
            Err(rejection) => self.report_error(UiError::from_rejection(&rejection)),
        }
    }

    fn load_path(&mut self, ctx: &egui::Context, path: PathBuf) {
        match FileCandidate::from_path(&path) {
            Ok(candidate) => self.offer_candidate(ctx, candidate),
            Err(err) => self.report_error(UiError::from_message(
                UiErrorContext::Intake,
                format!("{err:#}"),
            )),
        }
    }

    fn pick_file(&mut self, ctx: &egui::Context) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", &ImageMime::ACCEPTED_EXTENSIONS)
            .pick_file()
        {
            self.load_path(ctx, path);
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        self.offer_dropped(ctx, &dropped);
    }

    fn offer_dropped(&mut self, ctx: &egui::Context, dropped: &[egui::DroppedFile]) {
        if dropped.is_empty() {
            return;
        }
        self.offer_candidates(ctx, dropped.iter().map(DroppedCandidate), dropped.len() - 1);
    }

    fn request_analysis(&mut self) {
        let ticket = match self.workflow.begin_analysis() {
            Ok(ticket) => ticket,
            Err(AnalyzeRejected::AlreadyPending(_)) => return,
            Err(rejected) => {
                self.status = rejected.to_string();
                return;
            }
        };
        self.status = format!("Analyzing {}...", ticket.request.file_name);
        if let Err(BackendCommand::Analyze { ticket }) = dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::Analyze { ticket },
            &mut self.status,
        ) {
            self.workflow.settle(Settlement {
                generation: ticket.generation,
                file_name: ticket.request.file_name,
                outcome: Err(AnalysisFailure::request_setup(
                    "analysis worker is not accepting requests",
                )),
            });
        }
    }

    fn request_health_check(&mut self) {
        self.service_health = ServiceHealth::Unknown;
        self.status = format!("Checking {}...", self.api_base_url);
        let _ = dispatch_backend_command(&self.cmd_tx, BackendCommand::CheckHealth, &mut self.status);
    }

    fn clear_selection(&mut self) {
        self.workflow.clear_selection();
        self.status = "Selection cleared".to_string();
    }

    fn show_status_banner(&mut self, ui: &mut egui::Ui) {
        if let Some(banner) = self.status_banner.clone() {
            let (fill, stroke) = match banner.severity {
                StatusBannerSeverity::Error => (
                    egui::Color32::from_rgb(111, 53, 53),
                    egui::Stroke::new(1.0, egui::Color32::from_rgb(175, 96, 96)),
                ),
            };

            egui::Frame::NONE
                .fill(fill)
                .stroke(stroke)
                .corner_radius(8.0)
                .inner_margin(egui::Margin::symmetric(10, 8))
                .show(ui, |ui| {
                    ui.horizontal_wrapped(|ui| {
                        ui.label(egui::RichText::new(&banner.message).color(egui::Color32::WHITE));
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("Dismiss").clicked() {
                                self.status_banner = None;
                            }
                        });
                    });
                });
            ui.add_space(8.0);
        }
    }

    fn show_header(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("app_header").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Deepfake Lens");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Check service").clicked() {
                        self.request_health_check();
                    }
                    let (dot, color, hint) = match &self.service_health {
                        ServiceHealth::Unknown => {
                            ("○", ui.visuals().weak_text_color(), "not checked yet")
                        }
                        ServiceHealth::Healthy(status) => {
                            ("●", egui::Color32::from_rgb(67, 160, 71), status.as_str())
                        }
                        ServiceHealth::Unhealthy(reason) => {
                            ("●", egui::Color32::from_rgb(211, 47, 47), reason.as_str())
                        }
                    };
                    ui.label(egui::RichText::new(dot).color(color))
                        .on_hover_text(hint);
                    ui.small(egui::RichText::new(&self.api_base_url).weak());
                });
            });
        });
    }

    fn show_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.workflow.is_pending() {
                    ui.add(egui::Spinner::new());
                }
                ui.small(egui::RichText::new(&self.status).weak());
            });
        });
    }

    fn show_drop_zone(&mut self, ui: &mut egui::Ui) {
        let hovering = ui.ctx().input(|i| !i.raw.hovered_files.is_empty());
        let stroke_color = if hovering {
            ui.visuals().selection.stroke.color
        } else {
            ui.visuals().widgets.noninteractive.bg_stroke.color
        };

        egui::Frame::NONE
            .stroke(egui::Stroke::new(2.0, stroke_color))
            .corner_radius(10.0)
            .inner_margin(egui::Margin::same(24))
            .show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                ui.vertical_centered(|ui| {
                    let prompt = if hovering {
                        "Drop the image here"
                    } else {
                        "Drag and drop an image here"
                    };
                    ui.label(egui::RichText::new(prompt).strong().size(16.0));
                    ui.label("or");
                    if ui.button("Browse...").clicked() {
                        let ctx = ui.ctx().clone();
                        self.pick_file(&ctx);
                    }
                    ui.small(egui::RichText::new("Supports JPG, JPEG and PNG").weak());
                });
            });
    }

    fn show_selection(&mut self, ui: &mut egui::Ui) {
        let Some(selection) = self.workflow.selection() else {
            return;
        };
        let file = selection.file();
        let file_line = format!(
            "{} · {} · {}",
            file.name,
            file.mime,
            human_readable_bytes(file.len() as u64)
        );

        ui.add_space(12.0);
        match selection.preview() {
            Some(preview) => {
                let max = egui::vec2(ui.available_width().min(520.0), 360.0);
                let scale = (max.x / preview.size.x)
                    .min(max.y / preview.size.y)
                    .min(1.0);
                ui.vertical_centered(|ui| {
                    ui.add(egui::Image::new((preview.texture.id(), preview.size * scale)));
                });
            }
            None => {
                ui.vertical_centered(|ui| {
                    ui.label(egui::RichText::new("Preview unavailable").italics().weak());
                });
            }
        }

        ui.add_space(8.0);
        let mut analyze_clicked = false;
        let mut clear_clicked = false;
        ui.horizontal(|ui| {
            ui.label(file_line);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                clear_clicked = ui.button("Clear").clicked();
                let label = analyze_button_label(self.workflow.is_pending());
                analyze_clicked = ui
                    .add_enabled(self.workflow.can_analyze(), egui::Button::new(label))
                    .clicked();
            });
        });

        if clear_clicked {
            self.clear_selection();
        } else if analyze_clicked {
            self.request_analysis();
        }
    }

    fn show_outcome(&self, ui: &mut egui::Ui) {
        match self.workflow.state() {
            SessionState::Succeeded(report) => {
                ui.add_space(12.0);
                show_report_card(ui, report);
            }
            SessionState::Failed(failure) => {
                ui.add_space(12.0);
                show_failure(ui, failure);
            }
            SessionState::Idle | SessionState::Pending { .. } => {}
        }
    }
}

fn analyze_button_label(pending: bool) -> &'static str {
    if pending {
        "Analyzing..."
    } else {
        "Analyze Image"
    }
}

fn verdict_color(is_fake: bool) -> egui::Color32 {
    if is_fake {
        egui::Color32::from_rgb(211, 47, 47)
    } else {
        egui::Color32::from_rgb(67, 160, 71)
    }
}

fn show_report_card(ui: &mut egui::Ui, report: &AnalysisReport) {
    let verdict = report.verdict;
    let accent = verdict_color(verdict.is_fake);
    egui::Frame::group(ui.style())
        .stroke(egui::Stroke::new(1.5, accent))
        .corner_radius(8.0)
        .inner_margin(egui::Margin::same(14))
        .show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.label(
                egui::RichText::new(verdict.headline())
                    .color(accent)
                    .strong()
                    .size(18.0),
            );
            ui.add_space(6.0);
            ui.label(format!("Confidence: {}", verdict.confidence_percent()));
            ui.add(
                egui::ProgressBar::new(verdict.confidence as f32)
                    .fill(accent)
                    .text(verdict.confidence_percent()),
            );
            ui.label(format!("Raw score: {}", verdict.raw_score_text()));
            ui.small(
                egui::RichText::new(format!(
                    "{} · analyzed {}",
                    report.file_name,
                    report
                        .analyzed_at
                        .with_timezone(&chrono::Local)
                        .format("%H:%M:%S")
                ))
                .weak(),
            );
        });
}

fn show_failure(ui: &mut egui::Ui, failure: &AnalysisFailure) {
    egui::Frame::NONE
        .fill(egui::Color32::from_rgb(111, 53, 53))
        .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(175, 96, 96)))
        .corner_radius(8.0)
        .inner_margin(egui::Margin::symmetric(10, 8))
        .show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.label(
                egui::RichText::new(failure.kind.label())
                    .strong()
                    .color(egui::Color32::WHITE),
            );
            ui.label(egui::RichText::new(&failure.message).color(egui::Color32::WHITE));
        });
}

/// A dropped item, read from memory or disk only once it is chosen.
struct DroppedCandidate<'a>(&'a egui::DroppedFile);

impl CandidateSource for DroppedCandidate<'_> {
    fn into_candidate(self) -> Result<FileCandidate, IntakeRejection> {
        candidate_from_dropped(self.0).map_err(|err| IntakeRejection::Unreadable {
            name: dropped_name(self.0),
            reason: format!("{err:#}"),
        })
    }
}

fn dropped_name(file: &egui::DroppedFile) -> String {
    if !file.name.is_empty() {
        return file.name.clone();
    }
    file.path
        .as_deref()
        .and_then(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dropped item".to_string())
}

fn candidate_from_dropped(file: &egui::DroppedFile) -> anyhow::Result<FileCandidate> {
    let mut candidate = match (&file.bytes, &file.path) {
        (Some(bytes), _) => FileCandidate::new(file.name.clone(), bytes.to_vec()),
        (None, Some(path)) => FileCandidate::from_path(path)?,
        (None, None) => anyhow::bail!("dropped item '{}' has no readable content", file.name),
    };
    if !file.name.is_empty() {
        candidate.name = file.name.clone();
    }
    Ok(if file.mime.trim().is_empty() {
        candidate
    } else {
        candidate.with_mime(file.mime.clone())
    })
}

fn human_readable_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        return format!("{bytes} B");
    }
    if bytes < MB {
        return format_scaled_unit(bytes, KB, "KB");
    }
    if bytes < GB {
        return format_scaled_unit(bytes, MB, "MB");
    }
    format_scaled_unit(bytes, GB, "GB")
}

fn format_scaled_unit(bytes: u64, unit_size: u64, unit_label: &str) -> String {
    let value = bytes as f64 / unit_size as f64;
    let value_text = format!("{value:.1}");
    let compact_value = value_text.strip_suffix(".0").unwrap_or(&value_text);
    format!("{compact_value} {unit_label}")
}

impl eframe::App for DesktopGuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.handle_dropped_files(ctx);

        self.show_header(ctx);
        self.show_status_bar(ctx);
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                self.show_status_banner(ui);
                self.show_drop_zone(ui);
                self.show_selection(ui);
                self.show_outcome(ui);
            });
        });

        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

#[cfg(test)]
#[path = "tests/app_tests.rs"]
mod tests;
