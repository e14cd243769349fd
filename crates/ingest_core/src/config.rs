use std::{path::Path, time::Duration};

use analysis_client::SimulatedAnalysisClient;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use shared::domain::{MEDIA_TYPE_JPEG, MEDIA_TYPE_PDF, MEDIA_TYPE_PNG};
use thiserror::Error;

use crate::{
    controller::{WorkflowConfig, DEFAULT_SETTLE_DELAY},
    transfer::SimulatedTransfer,
    validator::{ValidationPolicy, DEFAULT_MAX_FILE_BYTES},
};

pub const ENV_PREFIX: &str = "INGEST";
pub const DEFAULT_SETTINGS_FILE: &str = "ingest.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub allowed_media_types: Vec<String>,
    pub max_file_bytes: u64,
    pub progress_step: u8,
    pub progress_interval_ms: u64,
    pub analysis_delay_ms: u64,
    pub settle_delay_ms: u64,
    pub analysis_timeout_ms: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            allowed_media_types: vec![
                MEDIA_TYPE_PDF.into(),
                MEDIA_TYPE_JPEG.into(),
                MEDIA_TYPE_PNG.into(),
            ],
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            progress_step: SimulatedTransfer::DEFAULT_STEP,
            progress_interval_ms: SimulatedTransfer::DEFAULT_INTERVAL.as_millis() as u64,
            analysis_delay_ms: SimulatedAnalysisClient::DEFAULT_DELAY.as_millis() as u64,
            settle_delay_ms: DEFAULT_SETTLE_DELAY.as_millis() as u64,
            analysis_timeout_ms: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allowed_media_types.is_empty() {
            return Err(ConfigError::Invalid {
                field: "allowed_media_types",
                reason: "at least one media type is required".into(),
            });
        }
        if self.max_file_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "max_file_bytes",
                reason: "must be greater than zero".into(),
            });
        }
        if !(1..=100).contains(&self.progress_step) {
            return Err(ConfigError::Invalid {
                field: "progress_step",
                reason: format!("must be within 1..=100, got {}", self.progress_step),
            });
        }
        if self.analysis_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid {
                field: "analysis_timeout_ms",
                reason: "use no value to disable the timeout, not zero".into(),
            });
        }
        Ok(())
    }

    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy::new(
            self.allowed_media_types.iter().map(String::as_str),
            self.max_file_bytes,
        )
    }

    pub fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            validation: self.validation_policy(),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            analysis_timeout: self.analysis_timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn simulated_transfer(&self) -> SimulatedTransfer {
        SimulatedTransfer::new(
            self.progress_step,
            Duration::from_millis(self.progress_interval_ms),
        )
    }

    pub fn simulated_analysis(&self) -> SimulatedAnalysisClient {
        SimulatedAnalysisClient::new(Duration::from_millis(self.analysis_delay_ms))
    }
}

/// Defaults, then the settings file, then `INGEST__*` environment variables.
///
/// Without an explicit path, `ingest.toml` in the working directory is read
/// if present.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let file = match path {
        Some(path) => File::from(path).format(FileFormat::Toml).required(true),
        None => File::new(DEFAULT_SETTINGS_FILE, FileFormat::Toml).required(false),
    };

    let settings: Settings = Config::builder()
        .add_source(Config::try_from(&Settings::default())?)
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("allowed_media_types"),
        )
        .build()?
        .try_deserialize()?;

    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
