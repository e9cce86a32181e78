//! Backend worker: owns the tokio runtime and the classifier, runs queued commands.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

use client_core::{dispatch, ClientSettings, Classifier, HttpClassifier};
use crossbeam_channel::{Receiver, Sender};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

/// Classifier used for analysis plus the HTTP client used for health checks.
#[derive(Clone)]
pub struct BackendServices {
    pub classifier: Arc<dyn Classifier>,
    pub http: Option<Arc<HttpClassifier>>,
}

impl BackendServices {
    pub fn from_settings(settings: &ClientSettings) -> anyhow::Result<Self> {
        let http = Arc::new(HttpClassifier::from_settings(settings)?);
        Ok(Self {
            classifier: http.clone(),
            http: Some(http),
        })
    }
}

pub fn launch(cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>, settings: ClientSettings) {
    match BackendServices::from_settings(&settings) {
        Ok(services) => {
            launch_with(cmd_rx, ui_tx, services);
        }
        Err(err) => {
            let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                UiErrorContext::BackendStartup,
                format!("backend worker startup failure: {err:#}"),
            )));
            tracing::error!("failed to build classifier client: {err:#}");
        }
    }
}

pub fn launch_with(
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
    services: BackendServices,
) -> JoinHandle<()> {
    thread::spawn(move || run_worker(cmd_rx, ui_tx, services))
}

fn run_worker(cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>, services: BackendServices) {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                UiErrorContext::BackendStartup,
                format!("backend worker startup failure: failed to build runtime: {err}"),
            )));
            tracing::error!("failed to build backend runtime: {err}");
            return;
        }
    };

    runtime.block_on(async move {
        tracing::info!("backend worker ready");
        while let Ok(cmd) = cmd_rx.recv() {
            tracing::debug!(command = cmd.name(), "backend received command");
            match cmd {
                BackendCommand::Analyze { ticket } => {
                    let classifier = services.classifier.clone();
                    let ui_tx = ui_tx.clone();
                    tokio::spawn(async move {
                        let settlement = dispatch(classifier.as_ref(), ticket).await;
                        if ui_tx.send(UiEvent::AnalysisSettled(settlement)).is_err() {
                            tracing::warn!("ui event queue closed before analysis settled");
                        }
                    });
                }
                BackendCommand::CheckHealth => {
                    let Some(http) = services.http.clone() else {
                        let _ = ui_tx.try_send(UiEvent::Info(
                            "Health check is not available for this classifier".to_string(),
                        ));
                        continue;
                    };
                    let ui_tx = ui_tx.clone();
                    tokio::spawn(async move {
                        let event = match http.check_health().await {
                            Ok(health) => UiEvent::HealthChecked {
                                api_base_url: http.api_base_url().to_string(),
                                healthy: health.is_healthy(),
                                status: health.status,
                            },
                            Err(err) => UiEvent::Error(UiError::from_message(
                                UiErrorContext::HealthCheck,
                                format!("{} is unreachable: {err:#}", http.api_base_url()),
                            )),
                        };
                        let _ = ui_tx.send(event);
                    });
                }
            }
        }
        tracing::info!("ui command queue closed; backend worker exiting");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use client_core::{AnalysisRequest, AnalysisTicket};
    use crossbeam_channel::bounded;
    use shared::{
        domain::{Generation, ImageMime, Verdict},
        error::AnalysisFailure,
    };
    use std::time::Duration;

    struct EchoClassifier;

    #[async_trait]
    impl Classifier for EchoClassifier {
        async fn classify(&self, request: AnalysisRequest) -> Result<Verdict, AnalysisFailure> {
            Ok(Verdict {
                is_fake: request.file_name.contains("fake"),
                confidence: 0.5,
                raw_score: request.len() as f64,
            })
        }
    }

    #[test]
    fn worker_settles_tickets_with_their_generation() {
        let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(4);
        let (ui_tx, ui_rx) = bounded::<UiEvent>(4);
        let worker = launch_with(
            cmd_rx,
            ui_tx,
            BackendServices {
                classifier: Arc::new(EchoClassifier),
                http: None,
            },
        );

        cmd_tx
            .send(BackendCommand::Analyze {
                ticket: AnalysisTicket {
                    generation: Generation(7),
                    request: AnalysisRequest {
                        file_name: "fake.png".to_string(),
                        mime: ImageMime::Png,
                        bytes: Arc::from(b"1234".to_vec()),
                    },
                },
            })
            .expect("send");

        match ui_rx.recv_timeout(Duration::from_secs(5)).expect("event") {
            UiEvent::AnalysisSettled(settlement) => {
                assert_eq!(settlement.generation, Generation(7));
                let verdict = settlement.outcome.expect("verdict");
                assert!(verdict.is_fake);
                assert_eq!(verdict.raw_score, 4.0);
            }
            _ => panic!("expected settlement"),
        }

        cmd_tx.send(BackendCommand::CheckHealth).expect("send");
        assert!(matches!(
            ui_rx.recv_timeout(Duration::from_secs(5)).expect("event"),
            UiEvent::Info(_)
        ));

        drop(cmd_tx);
        worker.join().expect("worker exits when the queue closes");
    }
}
