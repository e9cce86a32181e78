use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::{load_settings, FileCandidate, HttpClassifier, SessionState, UploadWorkflow};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Ask the deepfake classifier service whether an image is authentic")]
struct Args {
    /// Classifier API base URL; overrides the settings file and environment.
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload one JPG/PNG image and print the verdict.
    Analyze { path: PathBuf },
    /// Check the service health endpoint.
    Health,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let settings = load_settings()?.with_api_url_override(args.api_url.clone());
    let classifier = HttpClassifier::from_settings(&settings)?;
    tracing::info!(api_base_url = classifier.api_base_url(), "classifier configured");

    match args.command {
        Command::Analyze { path } => analyze(&classifier, path, args.json).await,
        Command::Health => health(&classifier, args.json).await,
    }
}

async fn analyze(classifier: &HttpClassifier, path: PathBuf, json: bool) -> Result<ExitCode> {
    let candidate = FileCandidate::from_path(&path)?;
    let mut workflow = UploadWorkflow::<()>::new();
    workflow.select_file(candidate, |_| ())?;
    workflow.analyze(classifier).await?;

    let state = workflow.state();
    if json {
        println!("{}", serde_json::to_string_pretty(&state_json(state))?);
    } else {
        println!("{}", render_state(state));
    }
    Ok(if state.report().is_some() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn health(classifier: &HttpClassifier, json: bool) -> Result<ExitCode> {
    let outcome = classifier.check_health().await;
    let healthy = matches!(&outcome, Ok(health) if health.is_healthy());
    if json {
        let value = match &outcome {
            Ok(health) => serde_json::json!({ "healthy": healthy, "status": health.status }),
            Err(err) => serde_json::json!({ "healthy": false, "error": format!("{err:#}") }),
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        match &outcome {
            Ok(health) => println!("{}: {}", classifier.api_base_url(), health.status),
            Err(err) => println!("{}: unreachable ({err:#})", classifier.api_base_url()),
        }
    }
    Ok(if healthy {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn render_state(state: &SessionState) -> String {
    match state {
        SessionState::Succeeded(report) => format!(
            "{}\n{}\nConfidence: {}\nRaw score: {}",
            report.file_name,
            report.verdict.headline(),
            report.verdict.confidence_percent(),
            report.verdict.raw_score_text()
        ),
        SessionState::Failed(failure) => format!("{}: {}", failure.kind.label(), failure.message),
        SessionState::Idle | SessionState::Pending { .. } => {
            format!("analysis did not settle (state: {})", state.label())
        }
    }
}

fn state_json(state: &SessionState) -> serde_json::Value {
    match state {
        SessionState::Succeeded(report) => serde_json::json!({
            "status": state.label(),
            "report": report,
            "headline": report.verdict.headline(),
        }),
        SessionState::Failed(failure) => serde_json::json!({
            "status": state.label(),
            "error": failure,
        }),
        SessionState::Idle | SessionState::Pending { .. } => {
            serde_json::json!({ "status": state.label() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::{
        domain::{AnalysisReport, Verdict},
        error::{AnalysisFailure, ErrorKind},
    };

    #[test]
    fn parses_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "classify",
            "analyze",
            "face.png",
            "--json",
            "--api-url",
            "http://localhost:5000/api",
        ])
        .expect("args");
        assert!(args.json);
        assert_eq!(args.api_url.as_deref(), Some("http://localhost:5000/api"));
        assert!(matches!(args.command, Command::Analyze { ref path } if path == &PathBuf::from("face.png")));
    }

    #[test]
    fn renders_success_with_fixed_precision() {
        let state = SessionState::Succeeded(AnalysisReport {
            file_name: "face.png".to_string(),
            verdict: Verdict {
                is_fake: false,
                confidence: 0.1234,
                raw_score: -1.5,
            },
            analyzed_at: Utc::now(),
        });
        assert_eq!(
            render_state(&state),
            "face.png\nReal Image Detected\nConfidence: 12.34%\nRaw score: -1.5000"
        );
        assert_eq!(state_json(&state)["status"], "succeeded");
    }

    #[test]
    fn renders_failure_with_kind() {
        let state = SessionState::Failed(AnalysisFailure::new(
            ErrorKind::ServerRejected,
            "model unavailable",
        ));
        assert!(render_state(&state).ends_with("model unavailable"));
        assert_eq!(state_json(&state)["error"]["message"], "model unavailable");
    }
}
