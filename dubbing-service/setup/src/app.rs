use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use dubbing_application::{
    DubVideoCommandHandler, DubVideoUseCase, DubVideoUseCaseImpl, SourceCleanup,
};
use dubbing_configuration::AppConfig;
use dubbing_http_server::{build_router, serve, AppState};

use crate::wiring::{self, PipelinePorts};

pub async fn build_and_run(config: AppConfig) -> Result<(), Error> {
    Application::new(config).await?.run().await
}

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

impl Application {
    pub async fn new(config: AppConfig) -> Result<Self, Error> {
        #[cfg(feature = "whisper-runtime")]
        tracing::info!("whisper runtime feature enabled");
        #[cfg(feature = "whisper-cuda")]
        tracing::info!("whisper backend: CUDA");
        #[cfg(feature = "whisper-vulkan")]
        tracing::info!("whisper backend: Vulkan");

        let service = &config.service;
        tracing::info!(
            work_dir = %service.jobs.work_dir,
            max_concurrent_jobs = service.jobs.max_concurrent_jobs,
            rate_backend = ?service.rate_limit.backend,
            recognizer_backend = ?service.speech.recognizer_backend,
            sidecar = %service.speech.base_url,
            cloning_languages = service.cloning.languages.len(),
            "initializing dubbing application"
        );

        let ports = PipelinePorts::from_config(&config).context("building pipeline adapters")?;
        let object_store = ports.object_store.clone();
        let pipeline = wiring::build_pipeline(&config, ports);
        tracing::info!(stages = ?pipeline.stage_names(), "pipeline assembled");

        let rate_limiter = wiring::build_rate_limiter(&config).context("building rate limiter")?;
        let mut usecase =
            DubVideoUseCaseImpl::new(pipeline, rate_limiter, wiring::job_settings(&config));
        if service.storage.delete_source {
            usecase = usecase.with_source_cleanup(SourceCleanup::new(
                object_store,
                service.storage.source_prefix.clone(),
            ));
        }
        let usecase: Arc<dyn DubVideoUseCase> = Arc::new(usecase);
        let state = AppState::new(Arc::new(DubVideoCommandHandler::new(usecase)));

        Ok(Self { config, state })
    }

    pub async fn run(self) -> Result<(), Error> {
        let server = &self.config.server;
        let addr: SocketAddr = format!("{}:{}", server.host, server.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", server.host, server.port))?;
        let router = build_router(self.state, server.max_body_bytes);
        serve(router, addr).await
    }
}
