mod loader;
mod logging;

use serde::{Deserialize, Serialize};

pub use loader::{load_config, load_config_from, ConfigError, ENV_PREFIX};
pub use logging::setup_logging;

pub type AppConfig = DubbingConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DubbingConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub service: ServiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub cloning: CloningConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub neural_voice: NeuralVoiceConfig,
    #[serde(default)]
    pub gender: GenderConfig,
    #[serde(default)]
    pub mixing: MixingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_work_dir")]
    pub work_dir: String,
    #[serde(default = "default_job_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_target_lang")]
    pub default_target_lang: String,
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateStoreBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_max_requests")]
    pub max_requests: usize,
    #[serde(default = "default_rate_window_secs")]
    pub window_secs: u64,
    #[serde(default = "default_rate_backend")]
    pub backend: RateStoreBackend,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default = "default_rate_key_prefix")]
    pub key_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    #[serde(default = "default_download_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
    #[serde(default = "default_demucs")]
    pub demucs: String,
    #[serde(default = "default_demucs_model")]
    pub demucs_model: String,
    #[serde(default = "default_demucs_segment")]
    pub demucs_segment: u32,
    #[serde(default = "default_process_timeout_secs")]
    pub process_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognizerBackend {
    Sidecar,
    Whisper,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default = "default_sidecar_url")]
    pub base_url: String,
    #[serde(default = "default_sidecar_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_recognizer_backend")]
    pub recognizer_backend: RecognizerBackend,
    #[serde(default = "default_recognizer_model")]
    pub recognizer_model: String,
    #[serde(default = "default_compute_type")]
    pub compute_type: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,
    #[serde(default)]
    pub hf_token: Option<String>,
    #[serde(default)]
    pub whisper: WhisperConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperConfig {
    #[serde(default = "default_whisper_model_path")]
    pub model_path: String,
    #[serde(default = "default_whisper_language")]
    pub language: String,
    #[serde(default = "default_whisper_threads")]
    pub threads: usize,
    #[serde(default)]
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloningConfig {
    #[serde(default = "default_sidecar_url")]
    pub base_url: String,
    #[serde(default = "default_sidecar_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_cloning_model")]
    pub model: String,
    #[serde(default = "default_cloning_languages")]
    pub languages: Vec<String>,
    #[serde(default = "default_output_sample_rate_hz")]
    pub output_sample_rate_hz: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(default = "default_translation_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_translation_source_lang")]
    pub source_lang: String,
    #[serde(default = "default_translation_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuralVoiceConfig {
    #[serde(default = "default_neural_voice_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_trusted_client_token")]
    pub trusted_client_token: String,
    #[serde(default = "default_neural_voice_format")]
    pub output_format: String,
    #[serde(default = "default_neural_voice_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenderConfig {
    #[serde(default = "default_gender_threshold_hz")]
    pub threshold_hz: f32,
    #[serde(default = "default_gender_analysis_seconds")]
    pub analysis_seconds: f32,
    #[serde(default = "default_pitch_fmin_hz")]
    pub fmin_hz: f32,
    #[serde(default = "default_pitch_fmax_hz")]
    pub fmax_hz: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixingConfig {
    #[serde(default = "default_background_gain")]
    pub background_gain: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_storage_region")]
    pub region: String,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(default = "default_result_prefix")]
    pub result_prefix: String,
    #[serde(default = "default_source_prefix")]
    pub source_prefix: String,
    #[serde(default = "default_true")]
    pub delete_source: bool,
    #[serde(default = "default_presign_ttl_secs")]
    pub presign_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            timeout_secs: default_job_timeout_secs(),
            default_target_lang: default_target_lang(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_rate_max_requests(),
            window_secs: default_rate_window_secs(),
            backend: default_rate_backend(),
            redis_url: default_redis_url(),
            key_prefix: default_rate_key_prefix(),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_download_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            demucs: default_demucs(),
            demucs_model: default_demucs_model(),
            demucs_segment: default_demucs_segment(),
            process_timeout_secs: default_process_timeout_secs(),
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: default_sidecar_url(),
            request_timeout_secs: default_sidecar_timeout_secs(),
            recognizer_backend: default_recognizer_backend(),
            recognizer_model: default_recognizer_model(),
            compute_type: default_compute_type(),
            batch_size: default_batch_size(),
            chunk_size: default_chunk_size(),
            hf_token: None,
            whisper: WhisperConfig::default(),
        }
    }
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model_path: default_whisper_model_path(),
            language: default_whisper_language(),
            threads: default_whisper_threads(),
            temperature: 0.0,
        }
    }
}

impl Default for CloningConfig {
    fn default() -> Self {
        Self {
            base_url: default_sidecar_url(),
            request_timeout_secs: default_sidecar_timeout_secs(),
            model: default_cloning_model(),
            languages: default_cloning_languages(),
            output_sample_rate_hz: default_output_sample_rate_hz(),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_translation_endpoint(),
            source_lang: default_translation_source_lang(),
            timeout_secs: default_translation_timeout_secs(),
        }
    }
}

impl Default for NeuralVoiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_neural_voice_endpoint(),
            trusted_client_token: default_trusted_client_token(),
            output_format: default_neural_voice_format(),
            timeout_secs: default_neural_voice_timeout_secs(),
        }
    }
}

impl Default for GenderConfig {
    fn default() -> Self {
        Self {
            threshold_hz: default_gender_threshold_hz(),
            analysis_seconds: default_gender_analysis_seconds(),
            fmin_hz: default_pitch_fmin_hz(),
            fmax_hz: default_pitch_fmax_hz(),
        }
    }
}

impl Default for MixingConfig {
    fn default() -> Self {
        Self {
            background_gain: default_background_gain(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            endpoint: None,
            region: default_storage_region(),
            access_key_id: None,
            secret_access_key: None,
            result_prefix: default_result_prefix(),
            source_prefix: default_source_prefix(),
            delete_source: true,
            presign_ttl_secs: default_presign_ttl_secs(),
        }
    }
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_work_dir() -> String {
    "/tmp/dubbing-jobs".to_string()
}

fn default_job_timeout_secs() -> u64 {
    3_600
}

fn default_target_lang() -> String {
    "hi".to_string()
}

fn default_max_concurrent_jobs() -> usize {
    2
}

fn default_rate_max_requests() -> usize {
    3
}

fn default_rate_window_secs() -> u64 {
    86_400
}

fn default_rate_backend() -> RateStoreBackend {
    RateStoreBackend::Memory
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_rate_key_prefix() -> String {
    "dubbing:rate:".to_string()
}

fn default_download_timeout_secs() -> u64 {
    600
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_demucs() -> String {
    "demucs".to_string()
}

fn default_demucs_model() -> String {
    "htdemucs".to_string()
}

fn default_demucs_segment() -> u32 {
    7
}

fn default_process_timeout_secs() -> u64 {
    1_800
}

fn default_sidecar_url() -> String {
    "http://127.0.0.1:9000".to_string()
}

fn default_sidecar_timeout_secs() -> u64 {
    1_800
}

fn default_recognizer_backend() -> RecognizerBackend {
    RecognizerBackend::Sidecar
}

fn default_recognizer_model() -> String {
    "medium".to_string()
}

fn default_compute_type() -> String {
    "float16".to_string()
}

fn default_batch_size() -> u32 {
    8
}

fn default_chunk_size() -> u32 {
    30
}

fn default_whisper_model_path() -> String {
    "models/ggml-medium.bin".to_string()
}

fn default_whisper_language() -> String {
    "en".to_string()
}

fn default_whisper_threads() -> usize {
    4
}

fn default_cloning_model() -> String {
    "tts_models/multilingual/multi-dataset/xtts_v2".to_string()
}

fn default_cloning_languages() -> Vec<String> {
    [
        "en", "es", "fr", "de", "it", "pt", "pl", "tr", "ru", "nl", "cs", "ar", "zh", "ja", "ko",
        "hi",
    ]
    .iter()
    .map(|lang| lang.to_string())
    .collect()
}

fn default_output_sample_rate_hz() -> u32 {
    24_000
}

fn default_translation_endpoint() -> String {
    "https://translate.googleapis.com/translate_a/single".to_string()
}

fn default_translation_source_lang() -> String {
    "auto".to_string()
}

fn default_translation_timeout_secs() -> u64 {
    30
}

fn default_neural_voice_endpoint() -> String {
    "wss://speech.platform.bing.com/consumer/speech/synthesize/readaloud/edge/v1".to_string()
}

fn default_trusted_client_token() -> String {
    "6A5AA1D4EAFF4E9FB37E23D68491D6F4".to_string()
}

fn default_neural_voice_format() -> String {
    "audio-24khz-48kbitrate-mono-mp3".to_string()
}

fn default_neural_voice_timeout_secs() -> u64 {
    60
}

fn default_gender_threshold_hz() -> f32 {
    165.0
}

fn default_gender_analysis_seconds() -> f32 {
    30.0
}

fn default_pitch_fmin_hz() -> f32 {
    50.0
}

fn default_pitch_fmax_hz() -> f32 {
    400.0
}

fn default_background_gain() -> f32 {
    0.5
}

fn default_storage_region() -> String {
    "auto".to_string()
}

fn default_result_prefix() -> String {
    "dubbed".to_string()
}

fn default_source_prefix() -> String {
    "temp".to_string()
}

fn default_true() -> bool {
    true
}

fn default_presign_ttl_secs() -> u64 {
    3_600
}
