use serde::{Deserialize, Serialize};

use crate::domain::Verdict;

/// Multipart field the classifier reads the image from.
pub const PREDICT_FILE_FIELD: &str = "file";
pub const PREDICT_PATH: &str = "predict";
pub const HEALTH_PATH: &str = "health";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub is_fake: bool,
    pub confidence: f64,
    pub raw_score: f64,
}

impl From<PredictResponse> for Verdict {
    fn from(value: PredictResponse) -> Self {
        Self {
            is_fake: value.is_fake,
            confidence: value.confidence,
            raw_score: value.raw_score,
        }
    }
}

/// Error body sent with non-2xx statuses. Older service revisions used `error`
/// instead of `detail`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn message(self) -> Option<String> {
        let detail = match self.detail {
            Some(serde_json::Value::String(text)) => Some(text),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        detail.or(self.error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}
