use url::Url;

use crate::DubbingError;

/// Longest single path component common filesystems accept.
pub const MAX_JOB_ID_LEN: usize = 255;

/// Job ids become directory and object-key names, so only `[A-Za-z0-9_-]+` passes.
pub fn validate_job_id(job_id: &str) -> Result<(), DubbingError> {
    let well_formed = !job_id.is_empty()
        && job_id.len() <= MAX_JOB_ID_LEN
        && job_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if well_formed {
        Ok(())
    } else {
        Err(DubbingError::InvalidJobId)
    }
}

pub fn validate_source_url(source_url: &str) -> Result<(), DubbingError> {
    let parsed = Url::parse(source_url).map_err(|_| DubbingError::InvalidSourceScheme)?;
    match parsed.scheme() {
        "http" | "https" if parsed.has_host() => Ok(()),
        _ => Err(DubbingError::InvalidSourceScheme),
    }
}

/// Runs both checks; nothing else in the pipeline starts until this passes.
pub fn validate_job_request(job_id: &str, source_url: &str) -> Result<(), DubbingError> {
    validate_job_id(job_id)?;
    validate_source_url(source_url)
}
