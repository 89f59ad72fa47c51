use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dubbing_domain::{Job, JobContext, ObjectStore};
use tokio::sync::Semaphore;

use crate::rate_limiter::ANONYMOUS_CLIENT;
use crate::validation::validate_job_request;
use crate::{
    DubVideoRequest, DubVideoResponse, DubbingError, JobWorkspace, PipelineEngine, RateLimiter,
};

#[async_trait]
pub trait DubVideoUseCase: Send + Sync {
    async fn dub(&self, request: DubVideoRequest) -> Result<DubVideoResponse, DubbingError>;
}

#[derive(Debug, Clone)]
pub struct JobSettings {
    pub work_dir: PathBuf,
    pub job_timeout: Duration,
    pub default_target_lang: String,
    pub max_concurrent_jobs: usize,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("dubbing-jobs"),
            job_timeout: Duration::from_secs(3_600),
            default_target_lang: "hi".to_string(),
            max_concurrent_jobs: 2,
        }
    }
}

/// Removes the uploaded source object once its job has succeeded.
pub struct SourceCleanup {
    store: Arc<dyn ObjectStore>,
    key_prefix: String,
}

impl SourceCleanup {
    pub fn new(store: Arc<dyn ObjectStore>, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
        }
    }

    pub fn source_key(&self, job_id: &str) -> String {
        let prefix = self.key_prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("{job_id}/video.mp4")
        } else {
            format!("{prefix}/{job_id}/video.mp4")
        }
    }

    async fn run(&self, job_id: &str) {
        let key = self.source_key(job_id);
        if let Err(err) = self.store.delete(&key).await {
            tracing::warn!(job_id = job_id, key = %key, error = %err, "source object not deleted");
        }
    }
}

pub struct DubVideoUseCaseImpl {
    pipeline: PipelineEngine,
    rate_limiter: RateLimiter,
    settings: JobSettings,
    job_slots: Semaphore,
    source_cleanup: Option<SourceCleanup>,
}

impl DubVideoUseCaseImpl {
    pub fn new(pipeline: PipelineEngine, rate_limiter: RateLimiter, settings: JobSettings) -> Self {
        let job_slots = Semaphore::new(settings.max_concurrent_jobs.max(1));
        Self {
            pipeline,
            rate_limiter,
            settings,
            job_slots,
            source_cleanup: None,
        }
    }

    pub fn with_source_cleanup(mut self, cleanup: SourceCleanup) -> Self {
        self.source_cleanup = Some(cleanup);
        self
    }

    fn resolve_job(&self, request: DubVideoRequest) -> Job {
        let target_lang = request
            .target_lang
            .map(|lang| lang.trim().to_ascii_lowercase())
            .filter(|lang| !lang.is_empty())
            .unwrap_or_else(|| self.settings.default_target_lang.clone());
        let client_id = request
            .client_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| ANONYMOUS_CLIENT.to_string());
        Job {
            id: request.job_id,
            source_url: request.video_url,
            target_lang,
            client_id,
        }
    }

    async fn run_pipeline(&self, context: &mut JobContext) -> Result<(), DubbingError> {
        let budget = self.settings.job_timeout;
        match tokio::time::timeout(budget, self.pipeline.run(context)).await {
            Ok(result) => result,
            Err(_) => Err(DubbingError::Timeout(budget.as_secs())),
        }
    }
}

#[async_trait]
impl DubVideoUseCase for DubVideoUseCaseImpl {
    async fn dub(&self, request: DubVideoRequest) -> Result<DubVideoResponse, DubbingError> {
        validate_job_request(&request.job_id, &request.video_url)?;
        let job = self.resolve_job(request);

        self.rate_limiter.admit(&job.client_id).await?;

        let _permit = self
            .job_slots
            .acquire()
            .await
            .map_err(|_| DubbingError::Internal("job slots closed".to_string()))?;

        tracing::info!(
            job_id = %job.id,
            target_lang = %job.target_lang,
            client_id = %job.client_id,
            "starting dubbing job"
        );

        let workspace = JobWorkspace::create(&self.settings.work_dir, &job.id)
            .await
            .map_err(|err| DubbingError::Internal(format!("job workspace: {err}")))?;
        let mut context = JobContext::new(job, workspace.paths().clone());

        let result = self.run_pipeline(&mut context).await;
        workspace.cleanup().await;
        result?;

        let video_url = context
            .result_url
            .take()
            .ok_or_else(|| DubbingError::Internal("pipeline produced no result".to_string()))?;

        if let Some(cleanup) = &self.source_cleanup {
            cleanup.run(&context.job.id).await;
        }

        tracing::info!(
            job_id = %context.job.id,
            segments = context.stats.segments,
            skipped_segments = context.stats.skipped_segments,
            untranslated_segments = context.stats.untranslated_segments,
            "dubbing job completed"
        );

        Ok(DubVideoResponse {
            job_id: context.job.id,
            video_url,
            target_lang: context.job.target_lang,
            synthesis_mode: context
                .synthesis_mode
                .map(|mode| mode.as_str().to_string())
                .unwrap_or_default(),
            segments: context.stats.segments,
            skipped_segments: context.stats.skipped_segments,
            untranslated_segments: context.stats.untranslated_segments,
        })
    }
}
