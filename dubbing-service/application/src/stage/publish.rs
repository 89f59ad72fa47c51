use std::sync::Arc;

use async_trait::async_trait;
use dubbing_domain::{JobContext, ObjectStore};

use crate::{DubbingError, PipelineStage};

pub fn result_object_key(prefix: &str, job_id: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{job_id}.mp4")
    } else {
        format!("{prefix}/{job_id}.mp4")
    }
}

pub struct PublishStage {
    store: Arc<dyn ObjectStore>,
    key_prefix: String,
}

impl PublishStage {
    pub fn new(store: Arc<dyn ObjectStore>, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
        }
    }
}

#[async_trait]
impl PipelineStage for PublishStage {
    fn name(&self) -> &'static str {
        "publish"
    }

    async fn execute(&self, context: &mut JobContext) -> Result<(), DubbingError> {
        let key = result_object_key(&self.key_prefix, &context.job.id);
        let url = self
            .store
            .publish(&context.paths.final_video, &key)
            .await
            .map_err(|err| DubbingError::Upload(err.to_string()))?;
        tracing::info!(job_id = %context.job.id, key = %key, "dubbed video published");
        context.result_url = Some(url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::result_object_key;

    #[test]
    fn result_key_is_derived_from_job_id() {
        assert_eq!(result_object_key("dubbed", "job_1"), "dubbed/job_1.mp4");
        assert_eq!(result_object_key("/dubbed/", "job_1"), "dubbed/job_1.mp4");
        assert_eq!(result_object_key("", "job_1"), "job_1.mp4");
    }
}
