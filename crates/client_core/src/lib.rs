use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use shared::{
    domain::Verdict,
    error::AnalysisFailure,
    protocol::{
        ErrorBody, HealthResponse, PredictResponse, HEALTH_PATH, PREDICT_FILE_FIELD, PREDICT_PATH,
    },
};
use tracing::{info, warn};
use url::Url;

pub mod config;
pub mod intake;
pub mod preview;
pub mod session;
pub mod workflow;

pub use config::{load_settings, load_settings_lenient, ClientSettings, DeploymentProfile};
pub use intake::{
    CandidateSource, FileCandidate, IntakeController, IntakeRejection, SelectedFile, Selection,
};
pub use preview::{decode_preview_image, preview_for, PreviewImage};
pub use session::{
    AnalysisRequest, AnalysisSession, AnalysisTicket, AnalyzeRejected, SessionState,
    SettleDisposition, Settlement,
};
pub use workflow::UploadWorkflow;

/// Remote verdict source. Every failure is mapped into the [`AnalysisFailure`]
/// taxonomy; nothing escapes as a transport error.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, request: AnalysisRequest) -> Result<Verdict, AnalysisFailure>;
}

/// Sends the ticket's request and tags the outcome with its generation.
pub async fn dispatch(classifier: &dyn Classifier, ticket: AnalysisTicket) -> Settlement {
    let AnalysisTicket {
        generation,
        request,
    } = ticket;
    let file_name = request.file_name.clone();
    info!(
        generation = generation.0,
        file_name = %file_name,
        bytes = request.len(),
        "dispatching analysis request"
    );

    let outcome = classifier.classify(request).await;
    match &outcome {
        Ok(verdict) => info!(
            generation = generation.0,
            is_fake = verdict.is_fake,
            confidence = verdict.confidence,
            "analysis request settled"
        ),
        Err(failure) => warn!(
            generation = generation.0,
            kind = ?failure.kind,
            "analysis request failed: {}",
            failure.message
        ),
    }

    Settlement {
        generation,
        file_name,
        outcome,
    }
}

pub struct HttpClassifier {
    http: Client,
    api_base_url: String,
}

impl HttpClassifier {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_base_url: api_base_url.into(),
        }
    }

    pub fn with_timeout(api_base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("failed to build HTTP client")?;
        Ok(Self {
            http,
            api_base_url: api_base_url.into(),
        })
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self> {
        Self::with_timeout(settings.resolve_api_base_url(), settings.request_timeout())
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        Url::parse(&format!(
            "{}/{path}",
            self.api_base_url.trim().trim_end_matches('/')
        ))
    }

    pub async fn check_health(&self) -> Result<HealthResponse> {
        let url = self
            .endpoint(HEALTH_PATH)
            .with_context(|| format!("invalid classifier base URL '{}'", self.api_base_url))?;
        let health = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<HealthResponse>()
            .await?;
        Ok(health)
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, request: AnalysisRequest) -> Result<Verdict, AnalysisFailure> {
        let url = self
            .endpoint(PREDICT_PATH)
            .map_err(AnalysisFailure::request_setup)?;
        let part = Part::bytes(request.bytes.to_vec())
            .file_name(request.file_name.clone())
            .mime_str(request.mime.as_str())
            .map_err(AnalysisFailure::request_setup)?;
        let form = Form::new().part(PREDICT_FILE_FIELD, part);

        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let detail = match response.bytes().await {
                Ok(body) => serde_json::from_slice::<ErrorBody>(&body)
                    .ok()
                    .and_then(ErrorBody::message),
                Err(err) => {
                    warn!(status = status.as_u16(), "failed to read error body: {err}");
                    None
                }
            };
            return Err(AnalysisFailure::server_rejected(status.as_u16(), detail));
        }

        let body = response.bytes().await.map_err(map_transport_error)?;
        let parsed: PredictResponse =
            serde_json::from_slice(&body).map_err(AnalysisFailure::malformed_response)?;
        check_verdict(parsed.into())
    }
}

fn map_transport_error(err: reqwest::Error) -> AnalysisFailure {
    if err.is_builder() {
        return AnalysisFailure::request_setup(err);
    }
    warn!(
        timeout = err.is_timeout(),
        connect = err.is_connect(),
        "classifier request got no response: {err}"
    );
    AnalysisFailure::no_response()
}

/// Type and range sanity only; the values are otherwise trusted as given.
fn check_verdict(verdict: Verdict) -> Result<Verdict, AnalysisFailure> {
    if !verdict.confidence.is_finite() || !(0.0..=1.0).contains(&verdict.confidence) {
        return Err(AnalysisFailure::malformed_response(format!(
            "confidence {} is outside [0, 1]",
            verdict.confidence
        )));
    }
    if !verdict.raw_score.is_finite() {
        return Err(AnalysisFailure::malformed_response(format!(
            "raw score {} is not finite",
            verdict.raw_score
        )));
    }
    Ok(verdict)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
