use super::*;
use crossbeam_channel::bounded;
use shared::{domain::Verdict, error::ErrorKind};
use std::sync::Arc;

fn test_app() -> (DesktopGuiApp, Receiver<BackendCommand>, Sender<UiEvent>, egui::Context) {
    let ctx = egui::Context::default();
    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(8);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(8);
    let app = DesktopGuiApp::new(
        &ctx,
        cmd_tx,
        ui_rx,
        StartupConfig {
            api_base_url: "http://localhost:5000/api".to_string(),
            preview_max_dimension: 64,
            initial_file: None,
        },
    );
    assert!(matches!(
        cmd_rx.try_recv().expect("startup health check"),
        BackendCommand::CheckHealth
    ));
    (app, cmd_rx, ui_tx, ctx)
}

fn candidate(name: &str) -> FileCandidate {
    FileCandidate::new(name, b"not really image bytes".to_vec())
}

fn take_ticket(cmd_rx: &Receiver<BackendCommand>) -> client_core::AnalysisTicket {
    match cmd_rx.try_recv().expect("queued command") {
        BackendCommand::Analyze { ticket } => ticket,
        BackendCommand::CheckHealth => panic!("expected analyze command"),
    }
}

#[test]
fn formats_file_sizes_readably() {
    assert_eq!(human_readable_bytes(0), "0 B");
    assert_eq!(human_readable_bytes(1023), "1023 B");
    assert_eq!(human_readable_bytes(1024), "1 KB");
    assert_eq!(human_readable_bytes(1536), "1.5 KB");
    assert_eq!(human_readable_bytes(2 * 1024 * 1024), "2 MB");
    assert_eq!(human_readable_bytes(3 * 1024 * 1024 * 1024), "3 GB");
}

#[test]
fn analyze_button_reflects_pending_state() {
    assert_eq!(analyze_button_label(true), "Analyzing...");
    assert_eq!(analyze_button_label(false), "Analyze Image");
}

#[test]
fn analysis_round_trip_through_backend_queue() {
    let (mut app, cmd_rx, ui_tx, ctx) = test_app();
    app.offer_candidate(&ctx, candidate("face.png"));
    assert!(app.workflow.selection().is_some_and(|s| s.preview().is_none()));

    app.request_analysis();
    assert!(app.workflow.is_pending());
    assert!(!app.workflow.can_analyze());
    let ticket = take_ticket(&cmd_rx);
    assert_eq!(ticket.request.file_name, "face.png");

    app.request_analysis();
    assert!(cmd_rx.try_recv().is_err(), "no second request while pending");

    ui_tx
        .send(UiEvent::AnalysisSettled(Settlement {
            generation: ticket.generation,
            file_name: ticket.request.file_name.clone(),
            outcome: Ok(Verdict {
                is_fake: true,
                confidence: 0.87,
                raw_score: 3.21,
            }),
        }))
        .expect("send");
    app.process_ui_events();

    let report = app.workflow.report().expect("report");
    assert_eq!(report.verdict.confidence_percent(), "87.00%");
    assert!(app.status.contains("Fake Image Detected"));
}

#[test]
fn reselection_while_pending_ignores_late_result() {
    let (mut app, cmd_rx, ui_tx, ctx) = test_app();
    app.offer_candidate(&ctx, candidate("a.png"));
    app.request_analysis();
    let ticket = take_ticket(&cmd_rx);

    app.offer_candidate(&ctx, candidate("b.jpg"));
    ui_tx
        .send(UiEvent::AnalysisSettled(Settlement {
            generation: ticket.generation,
            file_name: ticket.request.file_name,
            outcome: Err(AnalysisFailure::no_response()),
        }))
        .expect("send");
    app.process_ui_events();

    assert_eq!(app.workflow.state(), &SessionState::Idle);
    assert_eq!(
        app.workflow.selected_file().map(|f| f.name.as_str()),
        Some("b.jpg")
    );
}

#[test]
fn unsupported_file_keeps_selection_and_only_hints() {
    let (mut app, _cmd_rx, _ui_tx, ctx) = test_app();
    app.offer_candidate(&ctx, candidate("face.png"));
    app.offer_candidate(&ctx, candidate("notes.pdf"));

    assert_eq!(
        app.workflow.selected_file().map(|f| f.name.as_str()),
        Some("face.png")
    );
    assert!(app.status.contains("notes.pdf"));
    assert!(app.status_banner.is_none());
}

#[test]
fn disconnected_worker_settles_as_setup_failure() {
    let (mut app, cmd_rx, _ui_tx, ctx) = test_app();
    drop(cmd_rx);
    app.offer_candidate(&ctx, candidate("face.png"));
    app.request_analysis();

    let failure = app.workflow.failure().expect("failure");
    assert_eq!(failure.kind, ErrorKind::RequestSetupFailed);
    assert!(!app.workflow.is_pending());
}

#[test]
fn clear_returns_to_empty_state() {
    let (mut app, cmd_rx, _ui_tx, ctx) = test_app();
    app.offer_candidate(&ctx, candidate("face.png"));
    app.request_analysis();
    let _ = take_ticket(&cmd_rx);

    app.clear_selection();
    assert!(app.workflow.selection().is_none());
    assert_eq!(app.workflow.state(), &SessionState::Idle);
}

#[test]
fn health_failure_raises_banner() {
    let (mut app, _cmd_rx, ui_tx, _ctx) = test_app();
    ui_tx
        .send(UiEvent::Error(UiError::from_message(
            UiErrorContext::HealthCheck,
            "http://localhost:5000/api is unreachable: connection refused",
        )))
        .expect("send");
    app.process_ui_events();

    assert!(matches!(app.service_health, ServiceHealth::Unhealthy(_)));
    assert!(app.status.starts_with("Transport error"));
    assert!(app.status_banner.is_some());
}

#[test]
fn dropped_bytes_keep_declared_name_and_type() {
    let dropped = egui::DroppedFile {
        name: "face.jpeg".to_string(),
        mime: "image/jpeg".to_string(),
        bytes: Some(Arc::from(b"jpeg".to_vec())),
        ..Default::default()
    };
    let candidate = candidate_from_dropped(&dropped).expect("candidate");
    assert_eq!(candidate.name, "face.jpeg");
    assert_eq!(candidate.declared_mime.as_deref(), Some("image/jpeg"));
    assert_eq!(candidate.validate(), Ok(ImageMime::Jpeg));

    let empty = egui::DroppedFile {
        name: "ghost.png".to_string(),
        ..Default::default()
    };
    assert!(candidate_from_dropped(&empty).is_err());
}

fn dropped(name: &str) -> egui::DroppedFile {
    egui::DroppedFile {
        name: name.to_string(),
        bytes: Some(Arc::from(b"not really image bytes".to_vec())),
        ..Default::default()
    }
}

#[test]
fn multi_drop_selects_first_and_resets_outcome() {
    let (mut app, cmd_rx, ui_tx, ctx) = test_app();
    app.offer_candidate(&ctx, candidate("a.png"));
    app.request_analysis();
    let ticket = take_ticket(&cmd_rx);
    ui_tx
        .send(UiEvent::AnalysisSettled(Settlement {
            generation: ticket.generation,
            file_name: ticket.request.file_name,
            outcome: Err(AnalysisFailure::no_response()),
        }))
        .expect("send");
    app.process_ui_events();
    assert!(app.workflow.failure().is_some());

    app.offer_dropped(&ctx, &[dropped("b.png"), dropped("c.jpg")]);
    assert_eq!(
        app.workflow.selected_file().map(|f| f.name.as_str()),
        Some("b.png")
    );
    assert_eq!(app.workflow.state(), &SessionState::Idle);
    assert!(app.status.contains("ignored 1 additional file(s)"));
}

#[test]
fn unreadable_drop_keeps_selection_and_only_hints() {
    let (mut app, _cmd_rx, _ui_tx, ctx) = test_app();
    app.offer_candidate(&ctx, candidate("face.png"));

    let ghost = egui::DroppedFile {
        name: "ghost.png".to_string(),
        ..Default::default()
    };
    app.offer_dropped(&ctx, &[ghost, dropped("b.png")]);

    assert_eq!(
        app.workflow.selected_file().map(|f| f.name.as_str()),
        Some("face.png")
    );
    assert!(app.status.contains("could not read ghost.png"));
    assert!(app.status_banner.is_none());

    app.offer_dropped(&ctx, &[]);
    assert_eq!(
        app.workflow.selected_file().map(|f| f.name.as_str()),
        Some("face.png")
    );
}
