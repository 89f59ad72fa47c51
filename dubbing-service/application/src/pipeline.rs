use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use dubbing_domain::JobContext;

use crate::DubbingError;

#[async_trait]
pub trait PipelineStage: Send + Sync {
    fn name(&self) -> &'static str;
    async fn execute(&self, context: &mut JobContext) -> Result<(), DubbingError>;
}

/// Runs stages strictly in order; the first failure aborts the job.
#[derive(Default)]
pub struct PipelineEngine {
    stages: Vec<Arc<dyn PipelineStage>>,
}

impl PipelineEngine {
    pub fn new(stages: Vec<Arc<dyn PipelineStage>>) -> Self {
        Self { stages }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub async fn run(&self, context: &mut JobContext) -> Result<(), DubbingError> {
        for stage in &self.stages {
            let started = Instant::now();
            tracing::debug!(job_id = %context.job.id, "executing stage={}", stage.name());
            if let Err(err) = stage.execute(context).await {
                tracing::warn!(
                    job_id = %context.job.id,
                    stage = stage.name(),
                    reason = err.reason(),
                    error = %err,
                    "stage failed"
                );
                return Err(err);
            }
            tracing::info!(
                job_id = %context.job.id,
                stage = stage.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "stage completed"
            );
        }
        Ok(())
    }
}
