use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
};
use dubbing_application::{DubVideoCommand, DubVideoRequest, DubVideoResponse};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{error_mapper, HttpError};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DubVideoSuccess {
    pub status: &'static str,
    #[serde(flatten)]
    pub result: DubVideoResponse,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn dub_video(
    State(state): State<AppState>,
    payload: Result<Json<DubVideoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DubVideoSuccess>), HttpError> {
    let Json(request) = payload.map_err(|rejection| HttpError::Validation {
        reason: "invalid_request".to_string(),
        message: rejection.body_text(),
    })?;
    tracing::info!(
        job_id = %request.job_id,
        target_lang = request.target_lang.as_deref().unwrap_or("default"),
        "received dub request"
    );

    match state.dub_video.handle(DubVideoCommand::new(request)).await {
        Ok(result) => {
            tracing::info!(
                job_id = %result.job_id,
                synthesis_mode = %result.synthesis_mode,
                skipped_segments = result.skipped_segments,
                "dub request completed"
            );
            Ok((
                StatusCode::OK,
                Json(DubVideoSuccess {
                    status: "success",
                    result,
                }),
            ))
        }
        Err(error) => {
            tracing::error!(reason = error.code(), error = %error, "dub request failed");
            Err(error_mapper(error))
        }
    }
}
