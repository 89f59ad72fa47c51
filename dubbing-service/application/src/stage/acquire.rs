use std::sync::Arc;

use async_trait::async_trait;
use dubbing_domain::{JobContext, MediaFetcher};

use crate::{DubbingError, PipelineStage};

pub struct AcquireStage {
    fetcher: Arc<dyn MediaFetcher>,
}

impl AcquireStage {
    pub fn new(fetcher: Arc<dyn MediaFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl PipelineStage for AcquireStage {
    fn name(&self) -> &'static str {
        "acquire"
    }

    async fn execute(&self, context: &mut JobContext) -> Result<(), DubbingError> {
        let bytes = self
            .fetcher
            .fetch(&context.job.source_url, &context.paths.source_video)
            .await
            .map_err(|err| DubbingError::Acquisition(err.to_string()))?;
        tracing::debug!(job_id = %context.job.id, bytes, "source video downloaded");
        Ok(())
    }
}
