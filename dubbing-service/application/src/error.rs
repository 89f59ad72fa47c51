use dubbing_domain::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DubbingError {
    #[error("Invalid job_id format. Only letters, digits, '_' and '-' are allowed.")]
    InvalidJobId,

    #[error("Invalid URL scheme. Only http and https sources are accepted.")]
    InvalidSourceScheme,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Daily limit reached ({limit}/{limit}). Please try again in 24 hours.")]
    RateLimitExceeded { limit: usize },

    #[error("Video download failed: {0}")]
    Acquisition(String),

    #[error("Audio extraction failed: {0}")]
    AudioExtraction(String),

    #[error("Demucs failed: {0}")]
    Separation(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    #[error("Mixing failed: {0}")]
    Mixing(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Job exceeded its time budget of {0} seconds")]
    Timeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DubbingError {
    /// Stable machine-readable code carried in error responses.
    pub fn reason(&self) -> &'static str {
        match self {
            DubbingError::InvalidJobId => "invalid_job_id",
            DubbingError::InvalidSourceScheme => "invalid_source_scheme",
            DubbingError::InvalidRequest(_) => "invalid_request",
            DubbingError::RateLimitExceeded { .. } => "rate_limit_exceeded",
            DubbingError::Acquisition(_) => "acquisition_failed",
            DubbingError::AudioExtraction(_) => "audio_extraction_failed",
            DubbingError::Separation(_) => "separation_failed",
            DubbingError::Transcription(_) => "transcription_failed",
            DubbingError::Synthesis(_) => "synthesis_failed",
            DubbingError::Mixing(_) => "mixing_failed",
            DubbingError::Upload(_) => "upload_failed",
            DubbingError::Timeout(_) => "timeout",
            DubbingError::Internal(_) => "internal_error",
        }
    }

    /// Short text safe to hand back to callers. Causes stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            DubbingError::InvalidJobId
            | DubbingError::InvalidSourceScheme
            | DubbingError::InvalidRequest(_)
            | DubbingError::RateLimitExceeded { .. }
            | DubbingError::Timeout(_) => self.to_string(),
            DubbingError::Acquisition(_) => "Video download failed".to_string(),
            DubbingError::AudioExtraction(_) => "Audio extraction failed".to_string(),
            DubbingError::Separation(_) => "Demucs failed".to_string(),
            DubbingError::Transcription(_) => "Transcription failed".to_string(),
            DubbingError::Synthesis(_) => "Synthesis failed".to_string(),
            DubbingError::Mixing(_) => "Mixing failed".to_string(),
            DubbingError::Upload(_) => "Upload failed".to_string(),
            DubbingError::Internal(_) => "Internal error".to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DubbingError::InvalidJobId
                | DubbingError::InvalidSourceScheme
                | DubbingError::InvalidRequest(_)
        )
    }
}

impl From<DomainError> for DubbingError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::InvalidInput { message } => DubbingError::InvalidRequest(message),
            other => DubbingError::Internal(other.to_string()),
        }
    }
}

/// Recoverable failure on a single segment. Logged and counted, never fatal.
#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("translation of segment {index} failed: {source}")]
    Translation { index: usize, source: DomainError },

    #[error("synthesis of segment {index} failed: {source}")]
    Synthesis { index: usize, source: DomainError },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_are_distinct_per_failure_kind() {
        let errors = [
            DubbingError::InvalidJobId,
            DubbingError::InvalidSourceScheme,
            DubbingError::InvalidRequest(String::new()),
            DubbingError::RateLimitExceeded { limit: 3 },
            DubbingError::Acquisition(String::new()),
            DubbingError::AudioExtraction(String::new()),
            DubbingError::Separation(String::new()),
            DubbingError::Transcription(String::new()),
            DubbingError::Synthesis(String::new()),
            DubbingError::Mixing(String::new()),
            DubbingError::Upload(String::new()),
            DubbingError::Timeout(1),
            DubbingError::Internal(String::new()),
        ];
        let mut reasons: Vec<_> = errors.iter().map(DubbingError::reason).collect();
        reasons.sort_unstable();
        reasons.dedup();
        assert_eq!(reasons.len(), errors.len());
    }

    #[test]
    fn public_message_hides_the_cause() {
        let error = DubbingError::Separation(
            "no vocals.wav/no_vocals.wav under /srv/dubbing/jobs/job_1/separated".to_string(),
        );
        assert_eq!(error.public_message(), "Demucs failed");
        assert!(error.to_string().contains("/srv/dubbing"));

        let error = DubbingError::Internal("job workspace: permission denied".to_string());
        assert_eq!(error.public_message(), "Internal error");
    }

    #[test]
    fn rate_limit_message_names_the_quota() {
        let message = DubbingError::RateLimitExceeded { limit: 3 }.to_string();
        assert!(message.contains("3/3"));
    }
}
