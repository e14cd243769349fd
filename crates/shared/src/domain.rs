use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_newtype!(SessionId);

pub const MEDIA_TYPE_PDF: &str = "application/pdf";
pub const MEDIA_TYPE_JPEG: &str = "image/jpeg";
pub const MEDIA_TYPE_PNG: &str = "image/png";

/// A declared media type, normalized to its lowercase essence.
///
/// Parameters (`; charset=...`) are dropped and the non-standard `image/jpg`
/// spelling is folded into `image/jpeg`, so allow-set comparisons are plain
/// string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaType(String);

impl MediaType {
    pub fn parse(raw: &str) -> Self {
        let essence = raw
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let essence = match essence.as_str() {
            "image/jpg" | "image/pjpeg" => MEDIA_TYPE_JPEG.to_string(),
            _ => essence,
        };
        Self(essence)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MediaType {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for MediaType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A file the user picked or dropped, before it is accepted for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateFile {
    pub name: String,
    pub size_bytes: u64,
    pub media_type: MediaType,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, size_bytes: u64, media_type: impl Into<MediaType>) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            media_type: media_type.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileSource {
    Picker,
    DragDrop,
}

/// Opaque handle to uploaded content, handed to the analysis stage in place
/// of raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(pub String);

impl ArtifactRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportCategory {
    #[default]
    Blood,
    Xray,
    Ultrasound,
    Mri,
    Ct,
    Ecg,
    Prescription,
    Other,
}

impl ReportCategory {
    pub const ALL: [ReportCategory; 8] = [
        ReportCategory::Blood,
        ReportCategory::Xray,
        ReportCategory::Ultrasound,
        ReportCategory::Mri,
        ReportCategory::Ct,
        ReportCategory::Ecg,
        ReportCategory::Prescription,
        ReportCategory::Other,
    ];

    /// Unknown slugs are kept as `Other`; the form owns category semantics.
    pub fn from_slug(slug: &str) -> Self {
        let slug = slug.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_slug().eq_ignore_ascii_case(slug))
            .unwrap_or(ReportCategory::Other)
    }

    pub fn as_slug(self) -> &'static str {
        match self {
            ReportCategory::Blood => "blood",
            ReportCategory::Xray => "xray",
            ReportCategory::Ultrasound => "ultrasound",
            ReportCategory::Mri => "mri",
            ReportCategory::Ct => "ct",
            ReportCategory::Ecg => "ecg",
            ReportCategory::Prescription => "prescription",
            ReportCategory::Other => "other",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReportCategory::Blood => "Blood Test",
            ReportCategory::Xray => "X-Ray",
            ReportCategory::Ultrasound => "Ultrasound",
            ReportCategory::Mri => "MRI Scan",
            ReportCategory::Ct => "CT Scan",
            ReportCategory::Ecg => "ECG",
            ReportCategory::Prescription => "Prescription",
            ReportCategory::Other => "Other",
        }
    }
}

/// Form fields that travel with a submission. The core forwards them to the
/// analysis stage without interpreting them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_date: Option<String>,
    #[serde(default)]
    pub category: ReportCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Report,
    Dashboard,
}

impl Destination {
    pub fn as_str(self) -> &'static str {
        match self {
            Destination::Report => "report",
            Destination::Dashboard => "dashboard",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
