//! Analysis session: one outstanding request per generation, stale responses dropped.

use std::sync::Arc;

use chrono::Utc;
use shared::{
    domain::{AnalysisReport, Generation, ImageMime, Verdict},
    error::AnalysisFailure,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::intake::SelectedFile;

/// Bytes of one submission. Lives only for the duration of the call.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub file_name: String,
    pub mime: ImageMime,
    pub bytes: Arc<[u8]>,
}

impl AnalysisRequest {
    pub fn from_file(file: &SelectedFile) -> Self {
        Self {
            file_name: file.name.clone(),
            mime: file.mime,
            bytes: Arc::clone(&file.bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Pending {
        generation: Generation,
        file_name: String,
    },
    Succeeded(AnalysisReport),
    Failed(AnalysisFailure),
}

impl SessionState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        match self {
            Self::Succeeded(report) => Some(report),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&AnalysisFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pending { .. } => "pending",
            Self::Succeeded(_) => "succeeded",
            Self::Failed(_) => "failed",
        }
    }
}

/// Issued by [`AnalysisSession::begin`]; carries the request to send.
#[derive(Debug, Clone)]
pub struct AnalysisTicket {
    pub generation: Generation,
    pub request: AnalysisRequest,
}

/// Result of one remote call, tagged with the generation that issued it.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub generation: Generation,
    pub file_name: String,
    pub outcome: Result<Verdict, AnalysisFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleDisposition {
    Applied,
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalyzeRejected {
    #[error("select an image before analyzing")]
    NoSelection,
    #[error("an analysis is already in progress (generation {0})")]
    AlreadyPending(u64),
}

#[derive(Debug)]
pub struct AnalysisSession {
    state: SessionState,
    generation: Generation,
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            generation: Generation(0),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current_generation(&self) -> Generation {
        self.generation
    }

    /// Moves to `Pending` under a fresh generation. Rejected while already pending.
    pub fn begin(&mut self, file: &SelectedFile) -> Result<AnalysisTicket, AnalyzeRejected> {
        if let SessionState::Pending { generation, .. } = &self.state {
            debug!(generation = generation.0, "session: analyze rejected, already pending");
            return Err(AnalyzeRejected::AlreadyPending(generation.0));
        }

        self.generation = self.generation.next();
        let request = AnalysisRequest::from_file(file);
        self.state = SessionState::Pending {
            generation: self.generation,
            file_name: request.file_name.clone(),
        };
        debug!(generation = self.generation.0, file_name = %request.file_name, "session: pending");
        Ok(AnalysisTicket {
            generation: self.generation,
            request,
        })
    }

    /// Applies a settlement only if it belongs to the pending generation.
    pub fn settle(&mut self, settlement: Settlement) -> SettleDisposition {
        let matches_pending = matches!(
            &self.state,
            SessionState::Pending { generation, .. } if *generation == settlement.generation
        );
        if !matches_pending {
            warn!(
                generation = settlement.generation.0,
                current = self.generation.0,
                file_name = %settlement.file_name,
                "session: dropping stale analysis response"
            );
            return SettleDisposition::Stale;
        }

        self.state = match settlement.outcome {
            Ok(verdict) => SessionState::Succeeded(AnalysisReport {
                file_name: settlement.file_name,
                verdict,
                analyzed_at: Utc::now(),
            }),
            Err(failure) => SessionState::Failed(failure),
        };
        debug!(
            generation = settlement.generation.0,
            state = self.state.label(),
            "session: settled"
        );
        SettleDisposition::Applied
    }

    /// Back to `Idle`; anything still in flight becomes stale.
    pub fn reset(&mut self) {
        self.generation = self.generation.next();
        self.state = SessionState::Idle;
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
