use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dubbing_application::CommandError;
use serde_json::json;

#[derive(Debug)]
pub enum HttpError {
    Validation { reason: String, message: String },
    RateLimited { reason: String, message: String },
    Timeout { reason: String, message: String },
    Internal { reason: String, message: String },
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            HttpError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            HttpError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            HttpError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (reason, message) = match self {
            HttpError::Validation { reason, message }
            | HttpError::RateLimited { reason, message }
            | HttpError::Timeout { reason, message }
            | HttpError::Internal { reason, message } => (reason, message),
        };

        (
            status,
            Json(json!({
                "status": "error",
                "reason": reason,
                "message": message,
            })),
        )
            .into_response()
    }
}

pub fn error_mapper(error: CommandError) -> HttpError {
    let reason = error.code().to_string();
    let message = error.message().to_string();
    match error {
        CommandError::Validation { .. } => HttpError::Validation { reason, message },
        CommandError::RateLimited { .. } => HttpError::RateLimited { reason, message },
        CommandError::Timeout { .. } => HttpError::Timeout { reason, message },
        CommandError::Business { .. } | CommandError::Infrastructure { .. } => {
            HttpError::Internal { reason, message }
        }
    }
}
