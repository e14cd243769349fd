use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use analysis_client::AnalysisClient;
use async_trait::async_trait;
use chrono::Utc;
use shared::{
    domain::{ArtifactRef, CandidateFile, Destination, ReportMetadata},
    error::{AnalysisFailure, TransferError},
    protocol::AnalysisResult,
};
use tokio::sync::Notify;

use crate::{
    navigation::Navigator,
    transfer::{ProgressReporter, Transfer},
};

pub const MIB: u64 = 1024 * 1024;

pub fn pdf(size_bytes: u64) -> CandidateFile {
    CandidateFile::new("blood-panel.pdf", size_bytes, "application/pdf")
}

pub fn jpeg(size_bytes: u64) -> CandidateFile {
    CandidateFile::new("xray.jpg", size_bytes, "image/jpeg")
}

enum Behavior {
    Succeed,
    Fail(AnalysisFailure),
    Gated(Arc<Notify>),
    Stall,
}

/// Analysis double that counts calls and resolves according to its script.
pub struct ScriptedAnalysisClient {
    calls: AtomicUsize,
    completed: AtomicUsize,
    delay: Duration,
    behavior: Behavior,
    seen_metadata: Mutex<Vec<ReportMetadata>>,
}

impl ScriptedAnalysisClient {
    fn with_behavior(delay: Duration, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            delay,
            behavior,
            seen_metadata: Mutex::new(Vec::new()),
        })
    }

    pub fn succeeding(delay: Duration) -> Arc<Self> {
        Self::with_behavior(delay, Behavior::Succeed)
    }

    pub fn failing(failure: AnalysisFailure) -> Arc<Self> {
        Self::with_behavior(Duration::from_millis(100), Behavior::Fail(failure))
    }

    /// Succeeds only after the returned gate is notified.
    pub fn gated() -> (Arc<Self>, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        (
            Self::with_behavior(Duration::ZERO, Behavior::Gated(Arc::clone(&gate))),
            gate,
        )
    }

    pub fn stalled() -> Arc<Self> {
        Self::with_behavior(Duration::ZERO, Behavior::Stall)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn seen_metadata(&self) -> Vec<ReportMetadata> {
        self.seen_metadata.lock().expect("metadata lock").clone()
    }
}

#[async_trait]
impl AnalysisClient for ScriptedAnalysisClient {
    async fn analyze(
        &self,
        artifact: &ArtifactRef,
        metadata: &ReportMetadata,
    ) -> Result<AnalysisResult, AnalysisFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_metadata
            .lock()
            .expect("metadata lock")
            .push(metadata.clone());
        tokio::time::sleep(self.delay).await;

        let outcome = match &self.behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail(failure) => Err(failure.clone()),
            Behavior::Gated(gate) => {
                gate.notified().await;
                Ok(())
            }
            Behavior::Stall => std::future::pending::<Result<(), AnalysisFailure>>().await,
        };
        self.completed.fetch_add(1, Ordering::SeqCst);

        outcome.map(|()| AnalysisResult {
            artifact: artifact.clone(),
            payload: serde_json::json!({ "summary": "scripted" }),
            completed_at: Utc::now(),
        })
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    destinations: Mutex<Vec<Destination>>,
}

impl RecordingNavigator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn destinations(&self) -> Vec<Destination> {
        self.destinations.lock().expect("navigator lock").clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate_to(&self, destination: Destination) {
        self.destinations
            .lock()
            .expect("navigator lock")
            .push(destination);
    }
}

/// Transfer that reports progress up to `fail_at` and then errors.
pub struct FailingTransfer {
    pub fail_at: u8,
}

#[async_trait]
impl Transfer for FailingTransfer {
    async fn transfer(
        &self,
        _file: &CandidateFile,
        progress: &mut ProgressReporter,
    ) -> Result<ArtifactRef, TransferError> {
        let mut percent = 0;
        while percent < self.fail_at {
            tokio::time::sleep(Duration::from_millis(10)).await;
            percent = (percent + 10).min(self.fail_at);
            progress.report(percent).await;
        }
        Err(TransferError::Interrupted("connection reset".into()))
    }
}
