use std::path::Path;
#[cfg(feature = "whisper-runtime")]
use std::sync::Arc;

use async_trait::async_trait;
use dubbing_domain::{DomainError, Recognition, Recognizer};
#[cfg(feature = "whisper-runtime")]
use dubbing_domain::Segment;
#[cfg(feature = "whisper-runtime")]
use tokio::sync::OnceCell;
#[cfg(feature = "whisper-runtime")]
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// whisper.cpp expects 16 kHz mono input.
pub const WHISPER_SAMPLE_RATE_HZ: u32 = 16_000;

#[derive(Debug, Clone)]
pub struct WhisperRecognizerConfig {
    pub model_path: String,
    pub language: String,
    pub temperature: f32,
    pub threads: usize,
}

/// In-process recognizer backed by whisper.cpp. The model is loaded on the
/// first transcription and reused afterwards.
pub struct WhisperRecognizer {
    config: WhisperRecognizerConfig,
    #[cfg(feature = "whisper-runtime")]
    context: OnceCell<Arc<WhisperContext>>,
}

impl WhisperRecognizer {
    pub fn new(config: WhisperRecognizerConfig) -> Self {
        Self {
            config,
            #[cfg(feature = "whisper-runtime")]
            context: OnceCell::new(),
        }
    }

    pub fn language(&self) -> &str {
        &self.config.language
    }

    #[cfg(feature = "whisper-runtime")]
    async fn context(&self) -> Result<Arc<WhisperContext>, DomainError> {
        self.context
            .get_or_try_init(|| async {
                let model_path = self.config.model_path.clone();
                tracing::info!(model = %model_path, "loading whisper model");
                tokio::task::spawn_blocking(move || {
                    WhisperContext::new_with_params(
                        &model_path,
                        WhisperContextParameters::default(),
                    )
                    .map(Arc::new)
                    .map_err(|err| {
                        DomainError::external_service_error(
                            "whisper",
                            &format!("failed to load model: {err}"),
                        )
                    })
                })
                .await
                .map_err(|err| DomainError::internal_error(&format!("whisper load task: {err}")))?
            })
            .await
            .cloned()
    }
}

/// Ticks are hundredths of a second.
#[cfg(feature = "whisper-runtime")]
fn ticks_to_ms(ticks: i64) -> u64 {
    u64::try_from(ticks).unwrap_or_default() * 10
}

#[cfg(feature = "whisper-runtime")]
fn decode(
    context: &WhisperContext,
    config: &WhisperRecognizerConfig,
    samples: &[f32],
) -> Result<Vec<Segment>, DomainError> {
    let whisper_error = |stage: &str, err: whisper_rs::WhisperError| {
        DomainError::external_service_error("whisper", &format!("{stage}: {err}"))
    };
    let mut state = context
        .create_state()
        .map_err(|err| whisper_error("failed to create state", err))?;

    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
    params.set_n_threads(config.threads as i32);
    params.set_language(Some(config.language.as_str()));
    params.set_no_timestamps(false);
    params.set_temperature(config.temperature);
    params.set_single_segment(false);
    params.set_print_realtime(false);
    params.set_print_progress(false);
    params.set_print_timestamps(false);

    state
        .full(params, samples)
        .map_err(|err| whisper_error("full decode failed", err))?;

    let mut segments = Vec::new();
    for idx in 0..state.full_n_segments() {
        let Some(segment) = state.get_segment(idx) else {
            continue;
        };
        let text = segment
            .to_str_lossy()
            .map(|cow| cow.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            continue;
        }
        let start_ms = ticks_to_ms(segment.start_timestamp());
        let end_ms = ticks_to_ms(segment.end_timestamp()).max(start_ms);
        segments.push(Segment::new(start_ms, end_ms, text));
    }
    Ok(segments)
}

#[async_trait]
impl Recognizer for WhisperRecognizer {
    async fn transcribe(&self, audio: &Path) -> Result<Recognition, DomainError> {
        #[cfg(feature = "whisper-runtime")]
        {
            let context = self.context().await?;
            let config = self.config.clone();
            let path = audio.to_path_buf();
            let segments = tokio::task::spawn_blocking(move || {
                let clip = dubbing_infra::wav::read_wav(&path)?.resampled(WHISPER_SAMPLE_RATE_HZ);
                decode(&context, &config, &clip.samples)
            })
            .await
            .map_err(|err| DomainError::internal_error(&format!("whisper task: {err}")))??;
            tracing::debug!(segments = segments.len(), "whisper transcription finished");
            Ok(Recognition {
                language: self.config.language.to_ascii_lowercase(),
                segments,
            })
        }

        #[cfg(not(feature = "whisper-runtime"))]
        {
            let _ = audio;
            Err(DomainError::external_service_error(
                "whisper",
                "built without the whisper-runtime feature",
            ))
        }
    }
}
