use thiserror::Error;

use crate::DubbingError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("{message}")]
    Validation { code: String, message: String },

    #[error("{message}")]
    RateLimited { code: String, message: String },

    #[error("{message}")]
    Timeout { code: String, message: String },

    #[error("{message}")]
    Business { code: String, message: String },

    #[error("{message}")]
    Infrastructure { code: String, message: String },
}

impl CommandError {
    pub fn validation(code: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn business(code: &str, message: impl Into<String>) -> Self {
        Self::Business {
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn infrastructure(code: &str, message: impl Into<String>) -> Self {
        Self::Infrastructure {
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            CommandError::Validation { code, .. }
            | CommandError::RateLimited { code, .. }
            | CommandError::Timeout { code, .. }
            | CommandError::Business { code, .. }
            | CommandError::Infrastructure { code, .. } => code,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CommandError::Validation { message, .. }
            | CommandError::RateLimited { message, .. }
            | CommandError::Timeout { message, .. }
            | CommandError::Business { message, .. }
            | CommandError::Infrastructure { message, .. } => message,
        }
    }
}

impl From<DubbingError> for CommandError {
    fn from(error: DubbingError) -> Self {
        let code = error.reason().to_string();
        let message = error.public_message();
        match error {
            err if err.is_validation() => CommandError::Validation { code, message },
            DubbingError::RateLimitExceeded { .. } => CommandError::RateLimited { code, message },
            DubbingError::Timeout(_) => CommandError::Timeout { code, message },
            DubbingError::Internal(_) => CommandError::Infrastructure { code, message },
            _ => CommandError::Business { code, message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dubbing_errors_keep_their_reason_code() {
        let error = CommandError::from(DubbingError::InvalidJobId);
        assert!(matches!(error, CommandError::Validation { .. }));
        assert_eq!(error.code(), "invalid_job_id");

        let error = CommandError::from(DubbingError::Mixing("exit 1".to_string()));
        assert!(matches!(error, CommandError::Business { .. }));
        assert_eq!(error.code(), "mixing_failed");
        assert_eq!(error.message(), "Mixing failed");

        let error = CommandError::from(DubbingError::RateLimitExceeded { limit: 3 });
        assert!(matches!(error, CommandError::RateLimited { .. }));

        let error = CommandError::from(DubbingError::Timeout(3600));
        assert!(matches!(error, CommandError::Timeout { .. }));
    }
}
