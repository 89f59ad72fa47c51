use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct DubVideoRequest {
    pub job_id: String,
    #[validate(length(min = 1, max = 4096))]
    pub video_url: String,
    #[validate(length(max = 16))]
    pub target_lang: Option<String>,
    #[validate(length(max = 256))]
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DubVideoResponse {
    pub job_id: String,
    pub video_url: String,
    pub target_lang: String,
    pub synthesis_mode: String,
    pub segments: usize,
    pub skipped_segments: usize,
    pub untranslated_segments: usize,
}
