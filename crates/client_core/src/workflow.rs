//! Upload-and-classify workflow: intake plus session, kept consistent.

use shared::domain::{AnalysisReport, SelectionId};
use shared::error::AnalysisFailure;

use crate::{
    dispatch,
    intake::{
        CandidateSource, FileCandidate, IntakeController, IntakeRejection, SelectedFile,
        Selection,
    },
    session::{
        AnalysisSession, AnalysisTicket, AnalyzeRejected, SessionState, SettleDisposition,
        Settlement,
    },
    Classifier,
};

/// Owns the selection and the analysis session. Any accepted selection change
/// resets the session before returning, so an old outcome is never shown next
/// to a new file.
#[derive(Debug)]
pub struct UploadWorkflow<P> {
    intake: IntakeController<P>,
    session: AnalysisSession,
}

impl<P> Default for UploadWorkflow<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> UploadWorkflow<P> {
    pub fn new() -> Self {
        Self {
            intake: IntakeController::new(),
            session: AnalysisSession::new(),
        }
    }

    pub fn selection(&self) -> Option<&Selection<P>> {
        self.intake.selection()
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.intake.selected_file()
    }

    pub fn state(&self) -> &SessionState {
        self.session.state()
    }

    pub fn is_pending(&self) -> bool {
        self.session.state().is_pending()
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        self.session.state().report()
    }

    pub fn failure(&self) -> Option<&AnalysisFailure> {
        self.session.state().failure()
    }

    pub fn can_analyze(&self) -> bool {
        self.intake.selected_file().is_some() && !self.is_pending()
    }

    pub fn select_file<F>(
        &mut self,
        candidate: FileCandidate,
        acquire_preview: F,
    ) -> Result<SelectionId, IntakeRejection>
    where
        F: FnOnce(&SelectedFile) -> P,
    {
        let id = self.intake.select_file(candidate, acquire_preview)?;
        self.session.reset();
        Ok(id)
    }

    pub fn select_first<I, F>(
        &mut self,
        candidates: I,
        acquire_preview: F,
    ) -> Result<SelectionId, IntakeRejection>
    where
        I: IntoIterator,
        I::Item: CandidateSource,
        F: FnOnce(&SelectedFile) -> P,
    {
        let id = self.intake.select_first(candidates, acquire_preview)?;
        self.session.reset();
        Ok(id)
    }

    pub fn clear_selection(&mut self) {
        self.intake.clear_selection();
        self.session.reset();
    }

    pub fn begin_analysis(&mut self) -> Result<AnalysisTicket, AnalyzeRejected> {
        let file = self
            .intake
            .selected_file()
            .ok_or(AnalyzeRejected::NoSelection)?;
        self.session.begin(file)
    }

    pub fn settle(&mut self, settlement: Settlement) -> SettleDisposition {
        self.session.settle(settlement)
    }

    /// Runs one analysis to completion against `classifier`. Callers that must
    /// stay responsive while the request is out use [`Self::begin_analysis`],
    /// [`dispatch`] and [`Self::settle`] separately.
    pub async fn analyze(
        &mut self,
        classifier: &dyn Classifier,
    ) -> Result<SettleDisposition, AnalyzeRejected> {
        let ticket = self.begin_analysis()?;
        let settlement = dispatch(classifier, ticket).await;
        Ok(self.settle(settlement))
    }
}

#[cfg(test)]
#[path = "tests/workflow_tests.rs"]
mod tests;
