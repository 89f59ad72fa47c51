use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Error};
use dubbing_application::stage::{
    AcquireStage, ExtractAudioStage, MixStage, PublishStage, SeparateStage, SynthesizeStage,
    TranscribeStage, TranslateStage,
};
use dubbing_application::{
    CloningSynthesis, EngineCache, FallbackSynthesis, GenderClassifier, GenderSettings,
    JobSettings, PipelineEngine, PipelineStage, RateLimiter, SynthesisRouter,
};
use dubbing_configuration::{AppConfig, RateStoreBackend, RecognizerBackend};
use dubbing_domain::{
    AudioCodec, AudioExtractor, EngineProvider, MediaFetcher, Mixer, NeuralVoice, ObjectStore,
    PitchTracker, RatePolicy, RateRecordStore, SourceSeparator, SystemClock, Translator,
};
use dubbing_infra::{
    DemucsSeparator, DemucsSettings, FfmpegAudioCodec, FfmpegAudioExtractor, FfmpegMixer,
    InMemoryRateRecordStore, ProcessRunner, RedisRateRecordStore, YinPitchTracker,
};
use dubbing_infra_edge_tts::{EdgeNeuralVoice, EdgeVoiceSettings};
use dubbing_infra_rest::{GoogleTranslator, SidecarClient, SidecarEngineProvider, SidecarSettings};
use dubbing_infra_storage::{HttpMediaFetcher, S3ObjectStore, S3Settings};

/// Every adapter the pipeline talks to.
pub struct PipelinePorts {
    pub fetcher: Arc<dyn MediaFetcher>,
    pub extractor: Arc<dyn AudioExtractor>,
    pub separator: Arc<dyn SourceSeparator>,
    pub engines: Arc<EngineCache>,
    pub translator: Arc<dyn Translator>,
    pub neural_voice: Arc<dyn NeuralVoice>,
    pub codec: Arc<dyn AudioCodec>,
    pub pitch_tracker: Arc<dyn PitchTracker>,
    pub mixer: Arc<dyn Mixer>,
    pub object_store: Arc<dyn ObjectStore>,
}

impl PipelinePorts {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let service = &config.service;
        let tools = &service.tools;
        let runner = ProcessRunner::new(Duration::from_secs(tools.process_timeout_secs));
        for program in [&tools.ffmpeg, &tools.demucs] {
            if !ProcessRunner::command_exists(program) {
                tracing::warn!(program = %program, "external tool not found on PATH");
            }
        }

        let fetcher = HttpMediaFetcher::new(
            Duration::from_secs(service.download.timeout_secs),
            Duration::from_secs(service.download.connect_timeout_secs),
        )?;
        let separator = DemucsSeparator::new(
            runner.clone(),
            DemucsSettings {
                program: tools.demucs.clone(),
                model: tools.demucs_model.clone(),
                segment_secs: tools.demucs_segment,
            },
        );
        let translator = GoogleTranslator::new(
            &service.translation.endpoint,
            &service.translation.source_lang,
            Duration::from_secs(service.translation.timeout_secs),
        )?;
        let neural_voice = EdgeNeuralVoice::new(EdgeVoiceSettings {
            endpoint: service.neural_voice.endpoint.clone(),
            trusted_client_token: service.neural_voice.trusted_client_token.clone(),
            output_format: service.neural_voice.output_format.clone(),
            timeout: Duration::from_secs(service.neural_voice.timeout_secs),
        });

        Ok(Self {
            fetcher: Arc::new(fetcher),
            extractor: Arc::new(FfmpegAudioExtractor::new(runner.clone(), tools.ffmpeg.clone())),
            separator: Arc::new(separator),
            engines: Arc::new(EngineCache::new(engine_provider(config)?)),
            translator: Arc::new(translator),
            neural_voice: Arc::new(neural_voice),
            codec: Arc::new(FfmpegAudioCodec::new(runner.clone(), tools.ffmpeg.clone())),
            pitch_tracker: Arc::new(YinPitchTracker::default()),
            mixer: Arc::new(FfmpegMixer::new(runner, tools.ffmpeg.clone())),
            object_store: object_store(config)?,
        })
    }
}

fn engine_provider(config: &AppConfig) -> Result<Arc<dyn EngineProvider>, Error> {
    let speech = &config.service.speech;
    let cloning = &config.service.cloning;
    let speech_client = SidecarClient::new(
        speech.base_url.clone(),
        Duration::from_secs(speech.request_timeout_secs),
    )?;
    let cloning_client = SidecarClient::new(
        cloning.base_url.clone(),
        Duration::from_secs(cloning.request_timeout_secs),
    )?;
    let provider = SidecarEngineProvider::new(
        speech_client,
        cloning_client,
        SidecarSettings {
            recognizer_model: speech.recognizer_model.clone(),
            compute_type: speech.compute_type.clone(),
            batch_size: speech.batch_size,
            chunk_size: speech.chunk_size,
            cloning_model: cloning.model.clone(),
            hf_token: speech.hf_token.clone(),
        },
    );

    let provider = match speech.recognizer_backend {
        RecognizerBackend::Sidecar => provider,
        #[cfg(feature = "whisper-runtime")]
        RecognizerBackend::Whisper => {
            use dubbing_infra_asr_whisper::{WhisperRecognizer, WhisperRecognizerConfig};
            let whisper = &speech.whisper;
            tracing::info!(model_path = %whisper.model_path, "using in-process whisper recognizer");
            provider.with_recognizer(Arc::new(WhisperRecognizer::new(WhisperRecognizerConfig {
                model_path: whisper.model_path.clone(),
                language: whisper.language.clone(),
                temperature: whisper.temperature,
                threads: whisper.threads,
            })))
        }
        #[cfg(not(feature = "whisper-runtime"))]
        RecognizerBackend::Whisper => {
            bail!("recognizer_backend = \"whisper\" requires the `whisper-runtime` feature")
        }
    };
    Ok(Arc::new(provider))
}

fn object_store(config: &AppConfig) -> Result<Arc<dyn ObjectStore>, Error> {
    let storage = &config.service.storage;
    if storage.bucket.trim().is_empty() {
        bail!("service.storage.bucket must be set");
    }
    let store = S3ObjectStore::from_settings(&S3Settings {
        bucket: storage.bucket.clone(),
        endpoint: storage.endpoint.clone(),
        region: storage.region.clone(),
        access_key_id: storage.access_key_id.clone(),
        secret_access_key: storage.secret_access_key.clone(),
        presign_ttl: Duration::from_secs(storage.presign_ttl_secs),
    })
    .context("configuring object storage")?;
    Ok(Arc::new(store))
}

/// Stages run in this order: acquire, extract, separate, transcribe,
/// translate, synthesize, mix, publish.
pub fn build_pipeline(config: &AppConfig, ports: PipelinePorts) -> PipelineEngine {
    let service = &config.service;
    let gender = &service.gender;
    let output_rate = service.cloning.output_sample_rate_hz;
    let classifier = GenderClassifier::new(
        ports.pitch_tracker,
        GenderSettings {
            threshold_hz: gender.threshold_hz,
            analysis_seconds: gender.analysis_seconds,
            fmin_hz: gender.fmin_hz,
            fmax_hz: gender.fmax_hz,
        },
    );
    let router = SynthesisRouter::new(
        Arc::new(CloningSynthesis::new(ports.engines.clone(), output_rate)),
        Arc::new(FallbackSynthesis::new(
            ports.neural_voice,
            ports.codec.clone(),
            classifier,
            output_rate,
        )),
        service.cloning.languages.iter().cloned(),
    );

    let stages: Vec<Arc<dyn PipelineStage>> = vec![
        Arc::new(AcquireStage::new(ports.fetcher)),
        Arc::new(ExtractAudioStage::new(ports.extractor)),
        Arc::new(SeparateStage::new(ports.separator)),
        Arc::new(TranscribeStage::new(ports.engines)),
        Arc::new(TranslateStage::new(ports.translator)),
        Arc::new(SynthesizeStage::new(router, ports.codec)),
        Arc::new(MixStage::new(ports.mixer, service.mixing.background_gain)),
        Arc::new(PublishStage::new(
            ports.object_store,
            service.storage.result_prefix.clone(),
        )),
    ];
    PipelineEngine::new(stages)
}

pub fn build_rate_limiter(config: &AppConfig) -> Result<RateLimiter, Error> {
    let rate = &config.service.rate_limit;
    let store: Arc<dyn RateRecordStore> = match rate.backend {
        RateStoreBackend::Memory => Arc::new(InMemoryRateRecordStore::new()),
        RateStoreBackend::Redis => Arc::new(RedisRateRecordStore::new(
            &rate.redis_url,
            rate.key_prefix.clone(),
        )?),
    };
    Ok(RateLimiter::new(store, Arc::new(SystemClock), rate_policy(config)))
}

pub fn rate_policy(config: &AppConfig) -> RatePolicy {
    let rate = &config.service.rate_limit;
    RatePolicy {
        max_requests: rate.max_requests,
        window_secs: rate.window_secs as f64,
    }
}

pub fn job_settings(config: &AppConfig) -> JobSettings {
    let jobs = &config.service.jobs;
    JobSettings {
        work_dir: PathBuf::from(&jobs.work_dir),
        job_timeout: Duration::from_secs(jobs.timeout_secs),
        default_target_lang: jobs.default_target_lang.to_ascii_lowercase(),
        max_concurrent_jobs: jobs.max_concurrent_jobs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_bucket() -> AppConfig {
        let mut config = AppConfig::default();
        config.service.storage.bucket = "dubs".to_string();
        config.service.storage.access_key_id = Some("key".to_string());
        config.service.storage.secret_access_key = Some("secret".to_string());
        config
    }

    #[test]
    fn pipeline_stages_follow_the_job_order() {
        let config = config_with_bucket();
        let ports = PipelinePorts::from_config(&config).expect("ports");
        let pipeline = build_pipeline(&config, ports);
        assert_eq!(
            pipeline.stage_names(),
            vec![
                "acquire",
                "extract_audio",
                "separate",
                "transcribe",
                "translate",
                "synthesize",
                "mix",
                "publish"
            ]
        );
    }

    #[test]
    fn missing_bucket_is_a_startup_error() {
        let config = AppConfig::default();
        assert!(PipelinePorts::from_config(&config).is_err());
    }

    #[test]
    fn rate_limiter_uses_configured_policy() {
        let mut config = AppConfig::default();
        config.service.rate_limit.max_requests = 5;
        config.service.rate_limit.window_secs = 60;
        assert!(build_rate_limiter(&config).is_ok());
        let policy = rate_policy(&config);
        assert_eq!(policy.max_requests, 5);
        assert_eq!(policy.window_secs, 60.0);
    }

    #[test]
    fn job_settings_mirror_config() {
        let mut config = AppConfig::default();
        config.service.jobs.default_target_lang = "TA".to_string();
        let settings = job_settings(&config);
        assert_eq!(settings.default_target_lang, "ta");
        assert_eq!(settings.job_timeout, Duration::from_secs(3_600));
    }

    #[cfg(not(feature = "whisper-runtime"))]
    #[test]
    fn whisper_backend_needs_the_runtime_feature() {
        let mut config = config_with_bucket();
        config.service.speech.recognizer_backend = RecognizerBackend::Whisper;
        assert!(PipelinePorts::from_config(&config).is_err());
    }
}
