use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use shared::{
    domain::{ArtifactRef, ReportMetadata},
    error::AnalysisFailure,
    protocol::AnalysisResult,
};
use tracing::debug;

/// Remote stage that turns an uploaded artifact into a structured report.
///
/// Called once per artifact. Implementations may take arbitrarily long; the
/// caller decides whether to bound the wait.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    async fn analyze(
        &self,
        artifact: &ArtifactRef,
        metadata: &ReportMetadata,
    ) -> Result<AnalysisResult, AnalysisFailure>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatedOutcome {
    Succeed,
    Fail(AnalysisFailure),
}

/// Stand-in for the hosted analysis model: waits a fixed delay and returns a
/// canned summary shaped like the results view expects.
#[derive(Debug, Clone)]
pub struct SimulatedAnalysisClient {
    delay: Duration,
    outcome: SimulatedOutcome,
}

impl SimulatedAnalysisClient {
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(2000);

    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            outcome: SimulatedOutcome::Succeed,
        }
    }

    pub fn failing(delay: Duration, failure: AnalysisFailure) -> Self {
        Self {
            delay,
            outcome: SimulatedOutcome::Fail(failure),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for SimulatedAnalysisClient {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DELAY)
    }
}

#[async_trait]
impl AnalysisClient for SimulatedAnalysisClient {
    async fn analyze(
        &self,
        artifact: &ArtifactRef,
        metadata: &ReportMetadata,
    ) -> Result<AnalysisResult, AnalysisFailure> {
        debug!(artifact = %artifact, delay_ms = self.delay.as_millis() as u64, "simulated analysis started");
        tokio::time::sleep(self.delay).await;

        match &self.outcome {
            SimulatedOutcome::Succeed => Ok(AnalysisResult {
                artifact: artifact.clone(),
                payload: sample_summary(metadata),
                completed_at: Utc::now(),
            }),
            SimulatedOutcome::Fail(failure) => Err(failure.clone()),
        }
    }
}

fn sample_summary(metadata: &ReportMetadata) -> serde_json::Value {
    json!({
        "title": format!("{} Report", metadata.category.label()),
        "category": metadata.category.as_slug(),
        "report_date": metadata.report_date,
        "key_findings": [
            { "label": "Hemoglobin (Hb)", "value": "11.8 g/dL", "status": "low", "normal": "12-16 g/dL" },
            { "label": "White Blood Cells", "value": "7,500/uL", "status": "normal", "normal": "4,000-11,000/uL" },
            { "label": "Platelets", "value": "250,000/uL", "status": "normal", "normal": "150,000-450,000/uL" },
            { "label": "Blood Sugar (Fasting)", "value": "95 mg/dL", "status": "normal", "normal": "70-100 mg/dL" }
        ],
        "summary": "Hemoglobin is slightly below the normal range, which could indicate mild anemia. Other parameters are within normal limits.",
        "disclaimer": "AI analysis is for understanding only. Always consult your doctor before making health decisions."
    })
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
