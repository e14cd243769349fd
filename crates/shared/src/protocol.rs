use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{ArtifactRef, CandidateFile, ReportMetadata, SessionId},
    error::ErrorReport,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    #[default]
    Idle,
    Dragging,
    Uploading,
    Analyzing,
    Success,
    Error,
}

impl WorkflowState {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::Dragging => "dragging",
            WorkflowState::Uploading => "uploading",
            WorkflowState::Analyzing => "analyzing",
            WorkflowState::Success => "success",
            WorkflowState::Error => "error",
        }
    }

    /// A session is in flight; file input and metadata are locked.
    pub fn is_busy(self) -> bool {
        matches!(self, WorkflowState::Uploading | WorkflowState::Analyzing)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowState::Success | WorkflowState::Error)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful output of the analysis stage. The payload is opaque to the
/// workflow and only rendered by the results view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub artifact: ArtifactRef,
    pub payload: serde_json::Value,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub state: WorkflowState,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<CandidateFile>,
    pub metadata: ReportMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    pub can_start: bool,
    pub input_enabled: bool,
}

impl Default for WorkflowSnapshot {
    fn default() -> Self {
        Self {
            state: WorkflowState::Idle,
            progress: 0,
            session_id: None,
            file: None,
            metadata: ReportMetadata::default(),
            error: None,
            result: None,
            can_start: false,
            input_enabled: true,
        }
    }
}
