mod backend_bridge;
mod controller;
mod ui;

use std::path::PathBuf;

use clap::Parser;
use client_core::load_settings_lenient;
use crossbeam_channel::bounded;
use eframe::egui;
use tracing_subscriber::EnvFilter;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};
use crate::ui::{DesktopGuiApp, StartupConfig};

#[derive(Parser, Debug)]
#[command(about = "Desktop client for the deepfake classifier service")]
struct StartupArgs {
    /// Classifier API base URL; overrides the settings file and environment.
    #[arg(long)]
    api_url: Option<String>,
    /// Image to preselect on launch.
    image: Option<PathBuf>,
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = StartupArgs::parse();

    let (settings, settings_error) = load_settings_lenient();
    let settings = settings.with_api_url_override(args.api_url);
    let startup = StartupConfig {
        api_base_url: settings.resolve_api_base_url(),
        preview_max_dimension: settings.preview_max_dimension,
        initial_file: args.image,
    };
    tracing::info!(
        api_base_url = %startup.api_base_url,
        profile = ?settings.effective_profile(),
        "starting desktop client"
    );

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(64);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(256);
    if let Some(err) = settings_error {
        let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
            UiErrorContext::Settings,
            format!("settings file ignored: {err:#}"),
        )));
    }
    backend_bridge::runtime::launch(cmd_rx, ui_tx, settings);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Deepfake Lens")
            .with_inner_size([720.0, 820.0])
            .with_min_inner_size([480.0, 560.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };
    eframe::run_native(
        "Deepfake Lens",
        options,
        Box::new(move |cc| {
            Ok(Box::new(DesktopGuiApp::new(
                &cc.egui_ctx,
                cmd_tx,
                ui_rx,
                startup,
            )))
        }),
    )
}
