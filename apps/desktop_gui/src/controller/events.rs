//! UI/backend events and error modeling for desktop GUI controller.

use client_core::{IntakeRejection, Settlement};

pub enum UiEvent {
    Info(String),
    AnalysisSettled(Settlement),
    HealthChecked {
        api_base_url: String,
        healthy: bool,
        status: String,
    },
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Transport,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Settings,
    Intake,
    HealthCheck,
}

pub fn err_label(category: UiErrorCategory) -> &'static str {
    match category {
        UiErrorCategory::Transport => "Transport",
        UiErrorCategory::Validation => "Validation",
        UiErrorCategory::Unknown => "Unexpected",
    }
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("not a supported image")
            || message_lower.contains("invalid")
            || message_lower.contains("missing")
            || message_lower.contains("failed to read")
            || message_lower.contains("failed to parse")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("timeout")
            || message_lower.contains("timed out")
            || message_lower.contains("connection")
            || message_lower.contains("unreachable")
            || message_lower.contains("network")
            || message_lower.contains("disconnect")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn from_rejection(rejection: &IntakeRejection) -> Self {
        Self {
            category: UiErrorCategory::Validation,
            context: UiErrorContext::Intake,
            message: rejection.to_string(),
        }
    }

    /// Intake problems are hints; they never interrupt with a banner.
    pub fn wants_banner(&self) -> bool {
        matches!(
            self.context,
            UiErrorContext::BackendStartup
                | UiErrorContext::Settings
                | UiErrorContext::HealthCheck
        )
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_worker_disconnect_as_transport_error() {
        let err = UiError::from_message(
            UiErrorContext::Intake,
            "Backend command processor disconnected (possible startup/runtime failure)",
        );
        assert_eq!(err.category(), UiErrorCategory::Transport);
        assert!(!err.wants_banner());
    }

    #[test]
    fn unsupported_file_is_a_validation_hint() {
        let err = UiError::from_rejection(&IntakeRejection::UnsupportedType {
            name: "notes.pdf".to_string(),
            detected: Some("application/pdf".to_string()),
        });
        assert_eq!(err.category(), UiErrorCategory::Validation);
        assert_eq!(err.context(), UiErrorContext::Intake);
        assert!(!err.wants_banner());
        assert!(err.message().contains("notes.pdf"));
    }

    #[test]
    fn ignored_settings_file_raises_a_validation_banner() {
        let err = UiError::from_message(
            UiErrorContext::Settings,
            "settings file ignored: failed to parse classifier settings file: expected a value",
        );
        assert!(err.wants_banner());
        assert_eq!(err.category(), UiErrorCategory::Validation);
    }

    #[test]
    fn startup_failures_raise_a_banner() {
        let err = UiError::from_message(
            UiErrorContext::BackendStartup,
            "backend worker startup failure: failed to build runtime",
        );
        assert!(err.wants_banner());
        assert_eq!(err_label(err.category()), "Unexpected");
    }
}
