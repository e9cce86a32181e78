//! Backend commands queued from UI to backend worker.

use client_core::AnalysisTicket;

pub enum BackendCommand {
    Analyze { ticket: AnalysisTicket },
    CheckHealth,
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::Analyze { .. } => "analyze",
            BackendCommand::CheckHealth => "check_health",
        }
    }
}
