use shared::{
    domain::{CandidateFile, MediaType, MEDIA_TYPE_JPEG, MEDIA_TYPE_PDF, MEDIA_TYPE_PNG},
    error::Rejection,
};

pub const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    allowed_media_types: Vec<MediaType>,
    max_file_bytes: u64,
}

impl ValidationPolicy {
    pub fn new<I, M>(allowed_media_types: I, max_file_bytes: u64) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MediaType>,
    {
        Self {
            allowed_media_types: allowed_media_types.into_iter().map(Into::into).collect(),
            max_file_bytes,
        }
    }

    pub fn allowed_media_types(&self) -> &[MediaType] {
        &self.allowed_media_types
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_bytes
    }

    pub fn allows(&self, media_type: &MediaType) -> bool {
        self.allowed_media_types.contains(media_type)
    }
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::new(
            [MEDIA_TYPE_PDF, MEDIA_TYPE_JPEG, MEDIA_TYPE_PNG],
            DEFAULT_MAX_FILE_BYTES,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(Rejection),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

/// Checks a candidate against the policy. Type is checked before size.
pub fn validate(file: &CandidateFile, policy: &ValidationPolicy) -> Verdict {
    if !policy.allows(&file.media_type) {
        return Verdict::Rejected(Rejection::UnsupportedType {
            media_type: file.media_type.to_string(),
        });
    }

    if file.size_bytes > policy.max_file_bytes {
        return Verdict::Rejected(Rejection::TooLarge {
            size_bytes: file.size_bytes,
            max_bytes: policy.max_file_bytes,
        });
    }

    Verdict::Accepted
}

#[cfg(test)]
#[path = "tests/validator_tests.rs"]
mod tests;
