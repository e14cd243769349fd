//! Upload stage: moves a candidate file to wherever the analysis stage can
//! reach it, reporting progress as it goes.

use std::time::Duration;

use async_trait::async_trait;
use shared::{
    domain::{ArtifactRef, CandidateFile, SessionId},
    error::TransferError,
};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::session::SessionEvent;

/// Progress sink handed to a [`Transfer`].
///
/// Values are clamped to 100 and anything at or below the last reported
/// value is dropped, so downstream consumers only ever see a strictly
/// increasing sequence.
pub struct ProgressReporter {
    session_id: SessionId,
    last: u8,
    tx: mpsc::Sender<SessionEvent>,
}

impl ProgressReporter {
    pub(crate) fn new(session_id: SessionId, tx: mpsc::Sender<SessionEvent>) -> Self {
        Self {
            session_id,
            last: 0,
            tx,
        }
    }

    pub fn current(&self) -> u8 {
        self.last
    }

    pub async fn report(&mut self, percent: u8) {
        let percent = percent.min(100);
        if percent <= self.last {
            return;
        }
        self.last = percent;
        // A closed channel means the session was torn down; the session task
        // notices through its cancellation token.
        let _ = self
            .tx
            .send(SessionEvent::Progress {
                session_id: self.session_id,
                percent,
            })
            .await;
    }

    /// Byte-level variant for real transports.
    pub async fn report_bytes(&mut self, sent: u64, total: u64) {
        let percent = if total == 0 {
            100
        } else {
            (u128::from(sent.min(total)) * 100 / u128::from(total)) as u8
        };
        self.report(percent).await;
    }
}

#[async_trait]
pub trait Transfer: Send + Sync {
    async fn transfer(
        &self,
        file: &CandidateFile,
        progress: &mut ProgressReporter,
    ) -> Result<ArtifactRef, TransferError>;
}

/// Timer-driven transfer that never touches the network: advances by `step`
/// percent every `interval` until it reaches 100.
#[derive(Debug, Clone)]
pub struct SimulatedTransfer {
    step: u8,
    interval: Duration,
}

impl SimulatedTransfer {
    pub const DEFAULT_STEP: u8 = 10;
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(150);

    pub fn new(step: u8, interval: Duration) -> Self {
        Self {
            step: step.clamp(1, 100),
            interval,
        }
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for SimulatedTransfer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_STEP, Self::DEFAULT_INTERVAL)
    }
}

#[async_trait]
impl Transfer for SimulatedTransfer {
    async fn transfer(
        &self,
        file: &CandidateFile,
        progress: &mut ProgressReporter,
    ) -> Result<ArtifactRef, TransferError> {
        while progress.current() < 100 {
            tokio::time::sleep(self.interval).await;
            let next = progress.current().saturating_add(self.step);
            progress.report(next).await;
        }
        Ok(ArtifactRef::new(format!("uploads/{}/{}", Uuid::new_v4(), file.name)))
    }
}

#[cfg(test)]
#[path = "tests/transfer_tests.rs"]
mod tests;
