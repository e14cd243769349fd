use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    ValidationError,
    TransferError,
    AnalysisError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "validation-error",
            ErrorKind::TransferError => "transfer-error",
            ErrorKind::AnalysisError => "analysis-error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("unsupported media type '{media_type}'")]
    UnsupportedType { media_type: String },
    #[error("file is {size_bytes} bytes, the limit is {max_bytes}")]
    TooLarge { size_bytes: u64, max_bytes: u64 },
}

impl Rejection {
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::UnsupportedType { .. } => "unsupported-type",
            Rejection::TooLarge { .. } => "too-large",
        }
    }
}

/// Failures of the transfer stage. The simulated transfer never produces
/// these; they exist for real uploads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("transfer interrupted: {0}")]
    Interrupted(String),
    #[error("upload refused by remote: {0}")]
    Refused(String),
}

impl TransferError {
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::Interrupted(_) => "transfer-interrupted",
            TransferError::Refused(_) => "transfer-refused",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisFailure {
    #[error("analysis rejected the report: {0}")]
    Rejected(String),
    #[error("analysis service unavailable: {0}")]
    Unavailable(String),
    #[error("analysis did not finish within {}ms", .after.as_millis())]
    TimedOut { after: Duration },
}

impl AnalysisFailure {
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisFailure::Rejected(_) => "analysis-rejected",
            AnalysisFailure::Unavailable(_) => "analysis-unavailable",
            AnalysisFailure::TimedOut { .. } => "timed-out",
        }
    }
}

/// Every reason the workflow can land in its `error` state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("validation failed: {0}")]
    Validation(#[from] Rejection),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    Analysis(#[from] AnalysisFailure),
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::Validation(_) => ErrorKind::ValidationError,
            IngestError::Transfer(_) => ErrorKind::TransferError,
            IngestError::Analysis(_) => ErrorKind::AnalysisError,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            IngestError::Validation(rejection) => rejection.code(),
            IngestError::Transfer(err) => err.code(),
            IngestError::Analysis(failure) => failure.code(),
        }
    }
}

/// Serializable form of [`IngestError`] for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
}

impl From<&IngestError> for ErrorReport {
    fn from(value: &IngestError) -> Self {
        Self {
            kind: value.kind(),
            code: value.code().to_string(),
            message: value.to_string(),
        }
    }
}
