use std::sync::Arc;

use async_trait::async_trait;
use dubbing_domain::{AudioExtractor, JobContext};

use crate::{DubbingError, PipelineStage};

pub struct ExtractAudioStage {
    extractor: Arc<dyn AudioExtractor>,
}

impl ExtractAudioStage {
    pub fn new(extractor: Arc<dyn AudioExtractor>) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl PipelineStage for ExtractAudioStage {
    fn name(&self) -> &'static str {
        "extract_audio"
    }

    async fn execute(&self, context: &mut JobContext) -> Result<(), DubbingError> {
        self.extractor
            .extract(&context.paths.source_video, &context.paths.extracted_audio)
            .await
            .map_err(|err| DubbingError::AudioExtraction(err.to_string()))
    }
}
