//! Report ingestion workflow: validate a candidate file, upload it with
//! progress, hand the artifact to analysis and resolve to success or error.

pub mod config;
pub mod controller;
pub mod navigation;
pub mod session;
pub mod transfer;
pub mod validator;

pub use controller::{StartOutcome, WorkflowConfig, WorkflowController, WorkflowError};
pub use navigation::{ChannelNavigator, Navigator, TracingNavigator};
pub use session::{SessionError, SessionEvent, SessionHandle, UploadSession};
pub use transfer::{ProgressReporter, SimulatedTransfer, Transfer};
pub use validator::{validate, ValidationPolicy, Verdict};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
