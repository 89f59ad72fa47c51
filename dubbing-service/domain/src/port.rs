use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::{AudioClip, DomainError, RateDecision, RatePolicy, Segment, SpeakerTurn};

/// Streams a remote media resource to a local file and returns the byte count.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, DomainError>;
}

/// Decodes the audio track of a video into a 44.1 kHz stereo PCM WAV file.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    async fn extract(&self, video: &Path, destination: &Path) -> Result<(), DomainError>;
}

/// Runs two-stem separation, writing its outputs somewhere under `output_dir`.
///
/// The caller decides success by looking for the stem files, so an `Err`
/// here is advisory when the files exist anyway.
#[async_trait]
pub trait SourceSeparator: Send + Sync {
    async fn separate(&self, audio: &Path, output_dir: &Path) -> Result<(), DomainError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub language: String,
    pub segments: Vec<Segment>,
}

#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<Recognition, DomainError>;
}

/// Refines segment boundaries to word-level timing for one language.
#[async_trait]
pub trait Aligner: Send + Sync {
    async fn align(&self, segments: Vec<Segment>, audio: &Path)
        -> Result<Vec<Segment>, DomainError>;
}

#[async_trait]
pub trait Diarizer: Send + Sync {
    async fn diarize(&self, audio: &Path) -> Result<Vec<SpeakerTurn>, DomainError>;
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, DomainError>;
}

/// Speaks `text` in the timbre of the `reference` recording.
#[async_trait]
pub trait CloningSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        reference: &Path,
        language: &str,
    ) -> Result<AudioClip, DomainError>;
}

/// Speaks `text` with a named stock voice, writing the encoded clip to `destination`.
#[async_trait]
pub trait NeuralVoice: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &str, destination: &Path)
        -> Result<(), DomainError>;
}

/// File level audio conversions.
#[async_trait]
pub trait AudioCodec: Send + Sync {
    /// Decodes any supported container to a mono clip at its native rate.
    async fn decode(&self, source: &Path) -> Result<AudioClip, DomainError>;

    async fn write_wav(&self, clip: &AudioClip, destination: &Path) -> Result<(), DomainError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchWindow {
    pub max_seconds: f32,
    pub fmin_hz: f32,
    pub fmax_hz: f32,
}

/// Mean fundamental frequency over voiced frames, `None` when nothing is voiced.
#[async_trait]
pub trait PitchTracker: Send + Sync {
    async fn mean_pitch_hz(
        &self,
        audio: &Path,
        window: PitchWindow,
    ) -> Result<Option<f32>, DomainError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct MixRequest {
    pub video: PathBuf,
    pub speech: PathBuf,
    pub background: PathBuf,
    pub output: PathBuf,
    pub background_gain: f32,
}

#[async_trait]
pub trait Mixer: Send + Sync {
    async fn mix(&self, request: &MixRequest) -> Result<(), DomainError>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Uploads `file` under `key` and returns a time-limited retrieval URL.
    async fn publish(&self, file: &Path, key: &str) -> Result<String, DomainError>;

    async fn delete(&self, key: &str) -> Result<(), DomainError>;
}

/// Persistent per-client admission history. `try_admit` must be atomic per client.
#[async_trait]
pub trait RateRecordStore: Send + Sync {
    async fn try_admit(
        &self,
        client_id: &str,
        now: f64,
        policy: &RatePolicy,
    ) -> Result<RateDecision, DomainError>;
}

pub trait Clock: Send + Sync {
    /// Seconds since the Unix epoch.
    fn now_secs(&self) -> f64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> f64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs_f64())
            .unwrap_or_default()
    }
}

/// Constructs inference engine handles. Each call may be expensive; callers cache.
#[async_trait]
pub trait EngineProvider: Send + Sync {
    async fn load_recognizer(&self) -> Result<Arc<dyn Recognizer>, DomainError>;

    async fn load_aligner(&self, language: &str) -> Result<Arc<dyn Aligner>, DomainError>;

    async fn load_diarizer(&self) -> Result<Arc<dyn Diarizer>, DomainError>;

    async fn load_cloning_synthesizer(&self) -> Result<Arc<dyn CloningSynthesizer>, DomainError>;
}
