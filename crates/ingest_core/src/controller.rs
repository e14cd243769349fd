//! Workflow controller: the single owner of workflow state.
//!
//! User actions arrive through `&mut self` methods; session progress and the
//! analysis outcome arrive through [`WorkflowController::next_event`], which
//! the owning task polls. Nothing else mutates the state, so no locking is
//! involved.

use std::{sync::Arc, time::Duration};

use analysis_client::AnalysisClient;
use shared::{
    domain::{CandidateFile, Destination, FileSource, ReportMetadata, SessionId},
    error::{ErrorReport, IngestError, TransferError},
    protocol::{AnalysisResult, WorkflowSnapshot, WorkflowState},
};
use thiserror::Error;
use tokio::{sync::watch, time::Instant};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use crate::{
    navigation::Navigator,
    session::{SessionError, SessionEvent, SessionHandle, UploadSession},
    transfer::{SimulatedTransfer, Transfer},
    validator::{validate, ValidationPolicy, Verdict},
};

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowConfig {
    pub validation: ValidationPolicy,
    pub settle_delay: Duration,
    pub analysis_timeout: Option<Duration>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            validation: ValidationPolicy::default(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            analysis_timeout: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("no file selected")]
    NoFileSelected,
    #[error("file input is locked while {state}")]
    InputLocked { state: WorkflowState },
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: WorkflowState,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started(SessionId),
    AlreadyRunning(SessionId),
}

pub struct WorkflowController {
    config: WorkflowConfig,
    uploads: UploadSession,
    navigator: Arc<dyn Navigator>,
    state: WorkflowState,
    file: Option<CandidateFile>,
    metadata: ReportMetadata,
    error: Option<IngestError>,
    result: Option<AnalysisResult>,
    progress: u8,
    session: Option<SessionHandle>,
    settle_deadline: Option<Instant>,
    snapshots: watch::Sender<WorkflowSnapshot>,
}

impl WorkflowController {
    pub fn new(
        config: WorkflowConfig,
        analysis: Arc<dyn AnalysisClient>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let uploads = UploadSession::new(Arc::new(SimulatedTransfer::default()), analysis)
            .with_analysis_timeout(config.analysis_timeout);
        let (snapshots, _) = watch::channel(WorkflowSnapshot::default());
        Self {
            config,
            uploads,
            navigator,
            state: WorkflowState::Idle,
            file: None,
            metadata: ReportMetadata::default(),
            error: None,
            result: None,
            progress: 0,
            session: None,
            settle_deadline: None,
            snapshots,
        }
    }

    /// Replaces the default simulated transfer.
    pub fn with_transfer(mut self, transfer: Arc<dyn Transfer>) -> Self {
        self.uploads.set_transfer(transfer);
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn file(&self) -> Option<&CandidateFile> {
        self.file.as_ref()
    }

    pub fn metadata(&self) -> &ReportMetadata {
        &self.metadata
    }

    pub fn error(&self) -> Option<&IngestError> {
        self.error.as_ref()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(SessionHandle::id)
    }

    pub fn has_active_session(&self) -> bool {
        self.session.is_some()
    }

    /// True while the success hand-off to navigation is still scheduled.
    pub fn navigation_pending(&self) -> bool {
        self.settle_deadline.is_some()
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            state: self.state,
            progress: self.progress,
            session_id: self.session_id(),
            file: self.file.clone(),
            metadata: self.metadata.clone(),
            error: self.error.as_ref().map(ErrorReport::from),
            result: self.result.clone(),
            can_start: self.state == WorkflowState::Idle && self.file.is_some(),
            input_enabled: self.accepts_input(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn snapshot_stream(&self) -> WatchStream<WorkflowSnapshot> {
        WatchStream::new(self.subscribe())
    }

    /// From `error` the stored failure is dropped; the drop zone is live again.
    pub fn drag_enter(&mut self) -> WorkflowState {
        match self.state {
            WorkflowState::Idle => {}
            WorkflowState::Error => {
                self.error = None;
                self.progress = 0;
            }
            _ => return self.state,
        }
        self.transition(WorkflowState::Dragging);
        self.publish();
        self.state
    }

    /// Also used for a drop that carried no file. A staged file survives.
    pub fn drag_leave(&mut self) -> WorkflowState {
        if self.state == WorkflowState::Dragging {
            self.transition(WorkflowState::Idle);
            self.publish();
        }
        self.state
    }

    pub fn select_file(
        &mut self,
        file: CandidateFile,
        source: FileSource,
    ) -> Result<Verdict, WorkflowError> {
        match self.state {
            WorkflowState::Idle | WorkflowState::Dragging | WorkflowState::Error => {}
            state if state.is_busy() => return Err(WorkflowError::InputLocked { state }),
            state => {
                return Err(WorkflowError::InvalidTransition {
                    action: "select a file",
                    state,
                })
            }
        }

        let verdict = validate(&file, &self.config.validation);
        match &verdict {
            Verdict::Accepted => {
                info!(
                    file = %file.name,
                    size_bytes = file.size_bytes,
                    media_type = %file.media_type,
                    source = ?source,
                    "candidate file accepted"
                );
                self.file = Some(file);
                self.error = None;
                self.result = None;
                self.progress = 0;
                self.transition(WorkflowState::Idle);
            }
            Verdict::Rejected(rejection) => {
                warn!(
                    file = %file.name,
                    reason = rejection.code(),
                    source = ?source,
                    "candidate file rejected"
                );
                self.error = Some(IngestError::Validation(rejection.clone()));
                self.transition(WorkflowState::Error);
            }
        }
        self.publish();
        Ok(verdict)
    }

    pub fn drop_file(&mut self, file: CandidateFile) -> Result<Verdict, WorkflowError> {
        self.select_file(file, FileSource::DragDrop)
    }

    pub fn set_metadata(&mut self, metadata: ReportMetadata) -> Result<(), WorkflowError> {
        if self.state.is_busy() {
            return Err(WorkflowError::InputLocked { state: self.state });
        }
        self.metadata = metadata;
        self.publish();
        Ok(())
    }

    pub fn start_analysis(&mut self) -> Result<StartOutcome, WorkflowError> {
        if self.state.is_busy() {
            if let Some(session_id) = self.session_id() {
                debug!(session_id = %session_id, state = %self.state, "start ignored; session already running");
                return Ok(StartOutcome::AlreadyRunning(session_id));
            }
        }
        if self.state != WorkflowState::Idle {
            return Err(WorkflowError::InvalidTransition {
                action: "start analysis",
                state: self.state,
            });
        }

        if let Some(mut previous) = self.session.take() {
            previous.cancel();
        }

        let handle = self
            .uploads
            .start(self.file.as_ref(), &self.metadata)
            .map_err(|err| match err {
                SessionError::NoFile => WorkflowError::NoFileSelected,
            })?;
        let session_id = handle.id();

        self.session = Some(handle);
        self.progress = 0;
        self.error = None;
        self.result = None;
        self.transition(WorkflowState::Uploading);
        self.publish();
        Ok(StartOutcome::Started(session_id))
    }

    /// Returns whether anything was cancelled; repeated calls are no-ops.
    pub fn cancel(&mut self) -> bool {
        if !self.state.is_busy() {
            return false;
        }
        if let Some(mut session) = self.session.take() {
            session.cancel();
        }
        self.file = None;
        self.progress = 0;
        self.transition(WorkflowState::Idle);
        self.publish();
        true
    }

    /// Leaves a terminal state for `idle`, clearing file, progress, error
    /// and result. No-op anywhere else.
    pub fn retry(&mut self) -> bool {
        if !self.state.is_terminal() {
            return false;
        }
        self.settle_deadline = None;
        self.clear_submission();
        self.transition(WorkflowState::Idle);
        self.publish();
        true
    }

    pub fn remove_file(&mut self) -> Result<(), WorkflowError> {
        match self.state {
            WorkflowState::Idle | WorkflowState::Dragging => {
                self.clear_submission();
                self.transition(WorkflowState::Idle);
                self.publish();
                Ok(())
            }
            WorkflowState::Error => {
                self.retry();
                Ok(())
            }
            state if state.is_busy() => Err(WorkflowError::InputLocked { state }),
            state => Err(WorkflowError::InvalidTransition {
                action: "remove the file",
                state,
            }),
        }
    }

    /// User backed out of the upload screen.
    pub fn back(&mut self) {
        self.cancel();
        self.settle_deadline = None;
        self.navigator.navigate_to(Destination::Dashboard);
    }

    /// Waits for and applies the next session event or the pending success
    /// hand-off. Returns the resulting snapshot, or `None` when nothing is
    /// in flight.
    pub async fn next_event(&mut self) -> Option<WorkflowSnapshot> {
        loop {
            if let Some(deadline) = self.settle_deadline {
                tokio::time::sleep_until(deadline).await;
                self.settle_deadline = None;
                info!(destination = %Destination::Report, "success settled; handing off");
                self.navigator.navigate_to(Destination::Report);
                return Some(self.snapshot());
            }

            let session = self.session.as_mut()?;
            match session.next_event().await {
                Some(event) => {
                    if self.apply(event) {
                        return Some(self.snapshot());
                    }
                }
                None => {
                    self.session = None;
                    if self.state.is_busy() {
                        self.fail(IngestError::Transfer(TransferError::Interrupted(
                            "upload session ended without an outcome".into(),
                        )));
                        return Some(self.snapshot());
                    }
                    return None;
                }
            }
        }
    }

    /// Drives the workflow until nothing is in flight and returns the last
    /// snapshot.
    pub async fn run_until_settled(&mut self) -> WorkflowSnapshot {
        while self.next_event().await.is_some() {}
        self.snapshot()
    }

    fn apply(&mut self, event: SessionEvent) -> bool {
        if Some(event.session_id()) != self.session_id() {
            debug!(session_id = %event.session_id(), "discarding event from stale session");
            return false;
        }

        match (self.state, event) {
            (WorkflowState::Uploading, SessionEvent::Progress { percent, .. }) => {
                self.progress = self
                    .session
                    .as_ref()
                    .map_or(percent, SessionHandle::progress);
                debug!(percent = self.progress, "upload progress");
            }
            (WorkflowState::Uploading, SessionEvent::TransferComplete { artifact, .. }) => {
                debug!(artifact = %artifact, "transfer complete");
                self.progress = 100;
                self.transition(WorkflowState::Analyzing);
            }
            (WorkflowState::Uploading, SessionEvent::TransferFailed { error, .. }) => {
                self.session = None;
                self.fail(IngestError::Transfer(error));
                return true;
            }
            (WorkflowState::Analyzing, SessionEvent::AnalysisFinished { outcome, .. }) => {
                self.session = None;
                match outcome {
                    Ok(result) => {
                        info!(artifact = %result.artifact, "analysis succeeded");
                        self.result = Some(result);
                        self.file = None;
                        self.settle_deadline = Some(Instant::now() + self.config.settle_delay);
                        self.transition(WorkflowState::Success);
                    }
                    Err(failure) => {
                        self.fail(IngestError::Analysis(failure));
                        return true;
                    }
                }
            }
            (state, event) => {
                warn!(state = %state, event = ?event, "event does not apply in current state");
                return false;
            }
        }

        self.publish();
        true
    }

    fn fail(&mut self, error: IngestError) {
        warn!(kind = error.kind().as_str(), code = error.code(), error = %error, "workflow failed");
        self.error = Some(error);
        self.transition(WorkflowState::Error);
        self.publish();
    }

    /// Picker and drop zone respond in `idle`, `dragging` and `error`.
    fn accepts_input(&self) -> bool {
        matches!(
            self.state,
            WorkflowState::Idle | WorkflowState::Dragging | WorkflowState::Error
        )
    }

    fn clear_submission(&mut self) {
        self.file = None;
        self.progress = 0;
        self.error = None;
        self.result = None;
    }

    fn transition(&mut self, next: WorkflowState) {
        if self.state != next {
            info!(from = %self.state, to = %next, "workflow transition");
        }
        self.state = next;
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
