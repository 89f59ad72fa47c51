use std::sync::Arc;

use async_trait::async_trait;
use dubbing_domain::{JobContext, MixRequest, Mixer};

use crate::{DubbingError, PipelineStage};

/// Lays the dubbed speech over the attenuated background stem, keeping the
/// original video stream untouched.
pub struct MixStage {
    mixer: Arc<dyn Mixer>,
    background_gain: f32,
}

impl MixStage {
    pub fn new(mixer: Arc<dyn Mixer>, background_gain: f32) -> Self {
        Self {
            mixer,
            background_gain,
        }
    }
}

#[async_trait]
impl PipelineStage for MixStage {
    fn name(&self) -> &'static str {
        "mix"
    }

    async fn execute(&self, context: &mut JobContext) -> Result<(), DubbingError> {
        let stems = context
            .stems
            .as_ref()
            .ok_or_else(|| DubbingError::Internal("mix ran before separation".to_string()))?;
        let request = MixRequest {
            video: context.paths.source_video.clone(),
            speech: context.paths.dubbed_audio.clone(),
            background: stems.background.clone(),
            output: context.paths.final_video.clone(),
            background_gain: self.background_gain,
        };
        self.mixer
            .mix(&request)
            .await
            .map_err(|err| DubbingError::Mixing(err.to_string()))?;

        if !tokio::fs::try_exists(&request.output).await.unwrap_or(false) {
            return Err(DubbingError::Mixing(
                "mixer produced no output file".to_string(),
            ));
        }
        Ok(())
    }
}
