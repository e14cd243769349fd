//! One in-flight submission: transfer with progress, then a single analysis
//! call, reported back over a per-session channel.

use std::{sync::Arc, time::Duration};

use analysis_client::AnalysisClient;
use shared::{
    domain::{ArtifactRef, CandidateFile, ReportMetadata, SessionId},
    error::{AnalysisFailure, TransferError},
    protocol::AnalysisResult,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::transfer::{ProgressReporter, Transfer};

const SESSION_EVENT_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Progress {
        session_id: SessionId,
        percent: u8,
    },
    TransferComplete {
        session_id: SessionId,
        artifact: ArtifactRef,
    },
    TransferFailed {
        session_id: SessionId,
        error: TransferError,
    },
    AnalysisFinished {
        session_id: SessionId,
        outcome: Result<AnalysisResult, AnalysisFailure>,
    },
}

impl SessionEvent {
    pub fn session_id(&self) -> SessionId {
        match self {
            SessionEvent::Progress { session_id, .. }
            | SessionEvent::TransferComplete { session_id, .. }
            | SessionEvent::TransferFailed { session_id, .. }
            | SessionEvent::AnalysisFinished { session_id, .. } => *session_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no file supplied for upload")]
    NoFile,
}

/// Factory for upload sessions. Holds the injected transfer and analysis
/// collaborators; each [`UploadSession::start`] spawns an independent task.
#[derive(Clone)]
pub struct UploadSession {
    transfer: Arc<dyn Transfer>,
    analysis: Arc<dyn AnalysisClient>,
    analysis_timeout: Option<Duration>,
}

impl UploadSession {
    pub fn new(transfer: Arc<dyn Transfer>, analysis: Arc<dyn AnalysisClient>) -> Self {
        Self {
            transfer,
            analysis,
            analysis_timeout: None,
        }
    }

    pub fn set_transfer(&mut self, transfer: Arc<dyn Transfer>) {
        self.transfer = transfer;
    }

    pub fn with_analysis_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.analysis_timeout = timeout;
        self
    }

    pub fn start(
        &self,
        file: Option<&CandidateFile>,
        metadata: &ReportMetadata,
    ) -> Result<SessionHandle, SessionError> {
        let file = file.ok_or(SessionError::NoFile)?.clone();
        let session_id = SessionId::new();
        let token = CancellationToken::new();
        let (tx, rx) = mpsc::channel(SESSION_EVENT_CAPACITY);

        info!(
            session_id = %session_id,
            file = %file.name,
            size_bytes = file.size_bytes,
            media_type = %file.media_type,
            "upload session started"
        );

        tokio::spawn(run_session(SessionTask {
            session_id,
            file,
            metadata: metadata.clone(),
            transfer: Arc::clone(&self.transfer),
            analysis: Arc::clone(&self.analysis),
            analysis_timeout: self.analysis_timeout,
            token: token.clone(),
            tx,
        }));

        Ok(SessionHandle {
            session_id,
            token,
            events: rx,
            progress: 0,
        })
    }
}

/// Owning side of a running session. Dropping the handle cancels the task.
pub struct SessionHandle {
    session_id: SessionId,
    token: CancellationToken,
    events: mpsc::Receiver<SessionEvent>,
    progress: u8,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.session_id
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Idempotent; a second call is a no-op.
    pub fn cancel(&mut self) {
        if self.token.is_cancelled() {
            return;
        }
        self.token.cancel();
        self.events.close();
        info!(session_id = %self.session_id, progress = self.progress, "upload session cancelled");
    }

    /// Next event for this session, or `None` once the task has finished or
    /// the session was cancelled. Cancel-safe.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            if self.token.is_cancelled() {
                return None;
            }
            let event = self.events.recv().await?;
            if let SessionEvent::Progress { percent, .. } = &event {
                if *percent <= self.progress {
                    continue;
                }
                self.progress = *percent;
            }
            if let SessionEvent::TransferComplete { .. } = &event {
                self.progress = 100;
            }
            return Some(event);
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

struct SessionTask {
    session_id: SessionId,
    file: CandidateFile,
    metadata: ReportMetadata,
    transfer: Arc<dyn Transfer>,
    analysis: Arc<dyn AnalysisClient>,
    analysis_timeout: Option<Duration>,
    token: CancellationToken,
    tx: mpsc::Sender<SessionEvent>,
}

async fn run_session(task: SessionTask) {
    let SessionTask {
        session_id,
        file,
        metadata,
        transfer,
        analysis,
        analysis_timeout,
        token,
        tx,
    } = task;

    let mut reporter = ProgressReporter::new(session_id, tx.clone());
    let transferred = tokio::select! {
        biased;
        _ = token.cancelled() => {
            debug!(session_id = %session_id, "transfer aborted by cancellation");
            return;
        }
        result = transfer.transfer(&file, &mut reporter) => result,
    };

    let artifact = match transferred {
        Ok(artifact) => artifact,
        Err(error) => {
            warn!(session_id = %session_id, error = %error, "transfer failed");
            let _ = tx
                .send(SessionEvent::TransferFailed { session_id, error })
                .await;
            return;
        }
    };

    // The contract is progress up to 100 before completion even if the
    // transport reported coarser steps.
    reporter.report(100).await;
    drop(file);

    if tx
        .send(SessionEvent::TransferComplete {
            session_id,
            artifact: artifact.clone(),
        })
        .await
        .is_err()
    {
        return;
    }

    debug!(session_id = %session_id, artifact = %artifact, "requesting analysis");
    let outcome = tokio::select! {
        biased;
        _ = token.cancelled() => {
            debug!(session_id = %session_id, "analysis result abandoned by cancellation");
            return;
        }
        outcome = analyze_with_timeout(analysis.as_ref(), &artifact, &metadata, analysis_timeout) => outcome,
    };

    if token.is_cancelled() {
        return;
    }
    let _ = tx
        .send(SessionEvent::AnalysisFinished {
            session_id,
            outcome,
        })
        .await;
}

async fn analyze_with_timeout(
    analysis: &dyn AnalysisClient,
    artifact: &ArtifactRef,
    metadata: &ReportMetadata,
    timeout: Option<Duration>,
) -> Result<AnalysisResult, AnalysisFailure> {
    let call = analysis.analyze(artifact, metadata);
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(artifact = %artifact, timeout_ms = limit.as_millis() as u64, "analysis timed out");
                Err(AnalysisFailure::TimedOut { after: limit })
            }
        },
        None => call.await,
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
