use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const NO_RESPONSE_MESSAGE: &str = "No response received from server. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The service answered with a non-2xx status.
    ServerRejected,
    /// The request left the client but nothing came back.
    NoResponse,
    /// The request could not be built or dispatched.
    RequestSetupFailed,
    /// A 2xx response whose body is not a usable verdict.
    MalformedResponse,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::ServerRejected => "Server rejected",
            Self::NoResponse => "No response",
            Self::RequestSetupFailed => "Request setup failed",
            Self::MalformedResponse => "Malformed response",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind:?}: {message}")]
pub struct AnalysisFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl AnalysisFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Uses the service's `detail` text when it has one, else `Error: <status>`.
    pub fn server_rejected(status: u16, detail: Option<String>) -> Self {
        let message = detail
            .filter(|detail| !detail.trim().is_empty())
            .unwrap_or_else(|| format!("Error: {status}"));
        Self::new(ErrorKind::ServerRejected, message)
    }

    pub fn no_response() -> Self {
        Self::new(ErrorKind::NoResponse, NO_RESPONSE_MESSAGE)
    }

    pub fn request_setup(cause: impl std::fmt::Display) -> Self {
        Self::new(ErrorKind::RequestSetupFailed, format!("Error: {cause}"))
    }

    pub fn malformed_response(cause: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorKind::MalformedResponse,
            format!("Malformed response from server: {cause}"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_rejection_prefers_detail_over_status() {
        let failure = AnalysisFailure::server_rejected(500, Some("model unavailable".into()));
        assert_eq!(failure.kind, ErrorKind::ServerRejected);
        assert_eq!(failure.message, "model unavailable");

        let failure = AnalysisFailure::server_rejected(502, None);
        assert_eq!(failure.message, "Error: 502");

        let failure = AnalysisFailure::server_rejected(400, Some("  ".into()));
        assert_eq!(failure.message, "Error: 400");
    }

    #[test]
    fn setup_failure_carries_cause() {
        let failure = AnalysisFailure::request_setup("relative URL without a base");
        assert_eq!(failure.kind, ErrorKind::RequestSetupFailed);
        assert_eq!(failure.message, "Error: relative URL without a base");
    }
}
