use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dubbing_application::stage::{
    AcquireStage, ExtractAudioStage, MixStage, PublishStage, SeparateStage, SynthesizeStage,
    TranscribeStage, TranslateStage,
};
use dubbing_application::{
    CloningSynthesis, CommandHandler, DubVideoCommand, DubVideoCommandHandler, DubVideoRequest,
    DubVideoUseCase, DubVideoUseCaseImpl, DubbingError, EngineCache, FallbackSynthesis,
    GenderClassifier, GenderSettings, JobSettings, PipelineEngine, PipelineStage, RateLimiter,
    SourceCleanup, SynthesisRouter,
};
use dubbing_domain::{
    Aligner, AudioClip, AudioCodec, AudioExtractor, CloningSynthesizer, Clock, Diarizer,
    DomainError, EngineProvider, MediaFetcher, MixRequest, Mixer, NeuralVoice, ObjectStore,
    PitchTracker, PitchWindow, RateDecision, RatePolicy, RateRecord, RateRecordStore,
    Recognition, Recognizer, Segment, SourceSeparator, SpeakerTurn, Translator,
    CLONING_LANGUAGES,
};

#[derive(Default)]
struct Recorder {
    fetches: AtomicUsize,
    pitch_calls: AtomicUsize,
    voices: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    published: Mutex<Vec<String>>,
    written_tracks: Mutex<Vec<Vec<f32>>>,
}

impl Recorder {
    fn written_lengths(&self) -> Vec<usize> {
        self.written_tracks
            .lock()
            .expect("lock")
            .iter()
            .map(Vec::len)
            .collect()
    }
}

/// Sample level that identifies which text a clip was spoken from.
fn level_for(text_len: usize) -> f32 {
    text_len as f32 / 100.0
}

fn assert_runs(track: &[f32], runs: &[(f32, usize)]) {
    let expected_len: usize = runs.iter().map(|(_, len)| len).sum();
    assert_eq!(track.len(), expected_len);
    let mut offset = 0;
    for (level, len) in runs {
        for sample in &track[offset..offset + len] {
            assert!((sample - level).abs() < 1e-4, "expected {level}, got {sample}");
        }
        offset += len;
    }
}

struct FakeFetcher {
    recorder: Arc<Recorder>,
    delay: Duration,
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, DomainError> {
        self.recorder.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if url.contains("missing") {
            return Err(DomainError::external_service_error("download", "HTTP 404"));
        }
        tokio::fs::write(destination, b"video").await?;
        Ok(5)
    }
}

struct FakeExtractor;

#[async_trait]
impl AudioExtractor for FakeExtractor {
    async fn extract(&self, _video: &Path, destination: &Path) -> Result<(), DomainError> {
        tokio::fs::write(destination, b"wav").await?;
        Ok(())
    }
}

struct FakeSeparator {
    produce_stems: bool,
}

#[async_trait]
impl SourceSeparator for FakeSeparator {
    async fn separate(&self, _audio: &Path, output_dir: &Path) -> Result<(), DomainError> {
        if !self.produce_stems {
            return Err(DomainError::external_service_error("demucs", "exit status 1"));
        }
        let nested = output_dir.join("htdemucs").join("audio");
        tokio::fs::create_dir_all(&nested).await?;
        tokio::fs::write(nested.join("vocals.wav"), b"v").await?;
        tokio::fs::write(nested.join("no_vocals.wav"), b"b").await?;
        Ok(())
    }
}

struct FakeEngines;

#[async_trait]
impl Recognizer for FakeEngines {
    async fn transcribe(&self, audio: &Path) -> Result<Recognition, DomainError> {
        assert!(audio.ends_with("vocals.wav"));
        Ok(Recognition {
            language: "en".to_string(),
            segments: vec![
                Segment::new(0, 1_000, "hello"),
                Segment::new(1_000, 2_000, "untranslatable"),
                Segment::new(2_000, 2_500, "  "),
                Segment::new(2_500, 3_000, "explode"),
            ],
        })
    }
}

#[async_trait]
impl Aligner for FakeEngines {
    async fn align(
        &self,
        segments: Vec<Segment>,
        _audio: &Path,
    ) -> Result<Vec<Segment>, DomainError> {
        Ok(segments)
    }
}

#[async_trait]
impl Diarizer for FakeEngines {
    async fn diarize(&self, _audio: &Path) -> Result<Vec<SpeakerTurn>, DomainError> {
        Ok(vec![SpeakerTurn {
            start_ms: 0,
            end_ms: 3_000,
            speaker: "SPEAKER_00".to_string(),
        }])
    }
}

#[async_trait]
impl CloningSynthesizer for FakeEngines {
    async fn synthesize(
        &self,
        text: &str,
        reference: &Path,
        _language: &str,
    ) -> Result<AudioClip, DomainError> {
        assert!(reference.ends_with("vocals.wav"));
        if text.contains("explode") {
            return Err(DomainError::external_service_error("xtts", "cuda oom"));
        }
        Ok(AudioClip::new(24_000, vec![level_for(text.len()); 240]))
    }
}

struct FakeProvider;

#[async_trait]
impl EngineProvider for FakeProvider {
    async fn load_recognizer(&self) -> Result<Arc<dyn Recognizer>, DomainError> {
        Ok(Arc::new(FakeEngines))
    }

    async fn load_aligner(&self, language: &str) -> Result<Arc<dyn Aligner>, DomainError> {
        assert_eq!(language, "en");
        Ok(Arc::new(FakeEngines))
    }

    async fn load_diarizer(&self) -> Result<Arc<dyn Diarizer>, DomainError> {
        Ok(Arc::new(FakeEngines))
    }

    async fn load_cloning_synthesizer(&self) -> Result<Arc<dyn CloningSynthesizer>, DomainError> {
        Ok(Arc::new(FakeEngines))
    }
}

struct FakeTranslator;

#[async_trait]
impl Translator for FakeTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, DomainError> {
        if text == "untranslatable" {
            return Err(DomainError::external_service_error("translate", "429"));
        }
        Ok(format!("[{target_lang}] {text}"))
    }
}

struct FakeVoice {
    recorder: Arc<Recorder>,
}

#[async_trait]
impl NeuralVoice for FakeVoice {
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        destination: &Path,
    ) -> Result<(), DomainError> {
        self.recorder.voices.lock().expect("lock").push(voice.to_string());
        if text.contains("explode") {
            return Err(DomainError::external_service_error("edge-tts", "no audio"));
        }
        tokio::fs::write(destination, text.as_bytes()).await?;
        Ok(())
    }
}

struct FakeCodec {
    recorder: Arc<Recorder>,
}

#[async_trait]
impl AudioCodec for FakeCodec {
    async fn decode(&self, source: &Path) -> Result<AudioClip, DomainError> {
        let spoken = tokio::fs::read(source).await?;
        Ok(AudioClip::new(48_000, vec![level_for(spoken.len()); 480]))
    }

    async fn write_wav(&self, clip: &AudioClip, destination: &Path) -> Result<(), DomainError> {
        assert_eq!(clip.sample_rate_hz, 24_000);
        self.recorder
            .written_tracks
            .lock()
            .expect("lock")
            .push(clip.samples.clone());
        tokio::fs::write(destination, b"dubbed").await?;
        Ok(())
    }
}

struct FakePitch {
    mean: Option<f32>,
    recorder: Arc<Recorder>,
}

#[async_trait]
impl PitchTracker for FakePitch {
    async fn mean_pitch_hz(
        &self,
        _audio: &Path,
        window: PitchWindow,
    ) -> Result<Option<f32>, DomainError> {
        self.recorder.pitch_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(window.max_seconds, 30.0);
        Ok(self.mean)
    }
}

struct FakeMixer {
    fail: bool,
}

#[async_trait]
impl Mixer for FakeMixer {
    async fn mix(&self, request: &MixRequest) -> Result<(), DomainError> {
        if self.fail {
            return Err(DomainError::external_service_error(
                "ffmpeg",
                "exit status 1: Invalid data found when processing input",
            ));
        }
        assert!(request.background.ends_with("no_vocals.wav"));
        assert_eq!(request.background_gain, 0.5);
        tokio::fs::write(&request.output, b"final").await?;
        Ok(())
    }
}

struct FakeStore {
    recorder: Arc<Recorder>,
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn publish(&self, file: &Path, key: &str) -> Result<String, DomainError> {
        assert!(file.exists());
        self.recorder
            .published
            .lock()
            .expect("lock")
            .push(key.to_string());
        Ok(format!("https://cdn.example.com/{key}?sig=abc"))
    }

    async fn delete(&self, key: &str) -> Result<(), DomainError> {
        self.recorder.deleted.lock().expect("lock").push(key.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct MemoryRates(Mutex<HashMap<String, RateRecord>>);

#[async_trait]
impl RateRecordStore for MemoryRates {
    async fn try_admit(
        &self,
        client_id: &str,
        now: f64,
        policy: &RatePolicy,
    ) -> Result<RateDecision, DomainError> {
        let mut records = self.0.lock().expect("lock");
        Ok(records
            .entry(client_id.to_string())
            .or_default()
            .try_admit(now, policy))
    }
}

struct StaticClock;

impl Clock for StaticClock {
    fn now_secs(&self) -> f64 {
        1_700_000_000.0
    }
}

struct Harness {
    usecase: Arc<DubVideoUseCaseImpl>,
    recorder: Arc<Recorder>,
    work_dir: tempfile::TempDir,
}

struct HarnessOptions {
    produce_stems: bool,
    mixer_fails: bool,
    fetch_delay: Duration,
    job_timeout: Duration,
    mean_pitch: Option<f32>,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            produce_stems: true,
            mixer_fails: false,
            fetch_delay: Duration::ZERO,
            job_timeout: Duration::from_secs(30),
            mean_pitch: Some(120.0),
        }
    }
}

fn harness(options: HarnessOptions) -> Harness {
    let recorder = Arc::new(Recorder::default());
    let work_dir = tempfile::tempdir().expect("tempdir");
    let engines = Arc::new(EngineCache::new(Arc::new(FakeProvider)));
    let codec: Arc<dyn AudioCodec> = Arc::new(FakeCodec {
        recorder: recorder.clone(),
    });
    let store: Arc<dyn ObjectStore> = Arc::new(FakeStore {
        recorder: recorder.clone(),
    });

    let router = SynthesisRouter::new(
        Arc::new(CloningSynthesis::new(engines.clone(), 24_000)),
        Arc::new(FallbackSynthesis::new(
            Arc::new(FakeVoice {
                recorder: recorder.clone(),
            }),
            codec.clone(),
            GenderClassifier::new(
                Arc::new(FakePitch {
                    mean: options.mean_pitch,
                    recorder: recorder.clone(),
                }),
                GenderSettings::default(),
            ),
            24_000,
        )),
        CLONING_LANGUAGES.iter().map(|lang| lang.to_string()),
    );

    let stages: Vec<Arc<dyn PipelineStage>> = vec![
        Arc::new(AcquireStage::new(Arc::new(FakeFetcher {
            recorder: recorder.clone(),
            delay: options.fetch_delay,
        }))),
        Arc::new(ExtractAudioStage::new(Arc::new(FakeExtractor))),
        Arc::new(SeparateStage::new(Arc::new(FakeSeparator {
            produce_stems: options.produce_stems,
        }))),
        Arc::new(TranscribeStage::new(engines)),
        Arc::new(TranslateStage::new(Arc::new(FakeTranslator))),
        Arc::new(SynthesizeStage::new(router, codec)),
        Arc::new(MixStage::new(
            Arc::new(FakeMixer {
                fail: options.mixer_fails,
            }),
            0.5,
        )),
        Arc::new(PublishStage::new(store.clone(), "dubbed")),
    ];

    let rate_limiter = RateLimiter::new(
        Arc::new(MemoryRates::default()),
        Arc::new(StaticClock),
        RatePolicy::default(),
    );
    let settings = JobSettings {
        work_dir: work_dir.path().join("jobs"),
        job_timeout: options.job_timeout,
        default_target_lang: "hi".to_string(),
        max_concurrent_jobs: 2,
    };
    let usecase = Arc::new(
        DubVideoUseCaseImpl::new(PipelineEngine::new(stages), rate_limiter, settings)
            .with_source_cleanup(SourceCleanup::new(store, "temp")),
    );

    Harness {
        usecase,
        recorder,
        work_dir,
    }
}

fn request(job_id: &str, target_lang: Option<&str>, client_id: Option<&str>) -> DubVideoRequest {
    DubVideoRequest {
        job_id: job_id.to_string(),
        video_url: "https://bucket.example.com/temp/video.mp4".to_string(),
        target_lang: target_lang.map(str::to_string),
        client_id: client_id.map(str::to_string),
    }
}

fn job_dir(harness: &Harness, job_id: &str) -> PathBuf {
    harness.work_dir.path().join("jobs").join(job_id)
}

#[tokio::test]
async fn cloning_job_publishes_and_cleans_up() {
    let harness = harness(HarnessOptions::default());

    let response = harness
        .usecase
        .dub(request("job_1700000000", None, Some("alice")))
        .await
        .expect("job succeeds");

    assert_eq!(
        response.video_url,
        "https://cdn.example.com/dubbed/job_1700000000.mp4?sig=abc"
    );
    assert_eq!(response.target_lang, "hi");
    assert_eq!(response.synthesis_mode, "cloning");
    assert_eq!(response.segments, 4);
    assert_eq!(response.untranslated_segments, 1);
    assert_eq!(response.skipped_segments, 1);
    assert_eq!(harness.recorder.pitch_calls.load(Ordering::SeqCst), 0);
    assert!(harness.recorder.voices.lock().expect("lock").is_empty());
    assert_eq!(harness.recorder.written_lengths(), vec![480]);
    assert_eq!(
        *harness.recorder.deleted.lock().expect("lock"),
        vec!["temp/job_1700000000/video.mp4".to_string()]
    );
    assert!(!job_dir(&harness, "job_1700000000").exists());
}

#[tokio::test]
async fn fallback_job_uses_gendered_persona_voice() {
    let harness = harness(HarnessOptions {
        mean_pitch: Some(210.0),
        ..HarnessOptions::default()
    });

    let response = harness
        .usecase
        .dub(request("job_ta", Some("ta"), None))
        .await
        .expect("job succeeds");

    assert_eq!(response.synthesis_mode, "fallback");
    assert_eq!(response.skipped_segments, 1);
    assert_eq!(harness.recorder.pitch_calls.load(Ordering::SeqCst), 1);
    let voices = harness.recorder.voices.lock().expect("lock").clone();
    assert_eq!(voices.len(), 3);
    assert!(voices.iter().all(|voice| voice == "ta-IN-PallaviNeural"));
    // Two decoded 48 kHz clips of 480 samples each, resampled to 24 kHz.
    assert_eq!(harness.recorder.written_lengths(), vec![480]);
}

#[tokio::test]
async fn dubbed_track_follows_transcript_order() {
    let harness = harness(HarnessOptions::default());

    harness
        .usecase
        .dub(request("job_order", Some("hi"), None))
        .await
        .expect("job succeeds");

    let tracks = harness.recorder.written_tracks.lock().expect("lock").clone();
    assert_eq!(tracks.len(), 1);
    // "[hi] hello" then the untranslated "untranslatable"; the blank and
    // failing segments leave no gap.
    assert_runs(
        &tracks[0],
        &[
            (level_for("[hi] hello".len()), 240),
            (level_for("untranslatable".len()), 240),
        ],
    );
}

#[tokio::test]
async fn kannada_job_uses_male_persona_for_low_pitch() {
    let harness = harness(HarnessOptions {
        mean_pitch: Some(110.0),
        ..HarnessOptions::default()
    });

    let response = harness
        .usecase
        .dub(request("job_1700000000", Some("kn"), Some("carol")))
        .await
        .expect("job succeeds");

    assert_eq!(response.synthesis_mode, "fallback");
    assert_eq!(response.target_lang, "kn");
    assert_eq!(
        response.video_url,
        "https://cdn.example.com/dubbed/job_1700000000.mp4?sig=abc"
    );
    assert_eq!(harness.recorder.pitch_calls.load(Ordering::SeqCst), 1);
    let voices = harness.recorder.voices.lock().expect("lock").clone();
    assert_eq!(voices.len(), 3);
    assert!(voices.iter().all(|voice| voice == "kn-IN-GaganNeural"));
    let tracks = harness.recorder.written_tracks.lock().expect("lock").clone();
    assert_runs(
        &tracks[0],
        &[
            (level_for("[kn] hello".len()), 240),
            (level_for("untranslatable".len()), 240),
        ],
    );
    assert!(!job_dir(&harness, "job_1700000000").exists());
}

#[tokio::test]
async fn mixing_failure_cleans_up_and_publishes_nothing() {
    let harness = harness(HarnessOptions {
        mixer_fails: true,
        ..HarnessOptions::default()
    });

    let err = harness
        .usecase
        .dub(request("job_mix", None, Some("dave")))
        .await
        .expect_err("mixing fails");

    assert_eq!(err.reason(), "mixing_failed");
    assert!(harness.recorder.published.lock().expect("lock").is_empty());
    assert!(harness.recorder.deleted.lock().expect("lock").is_empty());
    assert!(!job_dir(&harness, "job_mix").exists());
}

#[tokio::test]
async fn missing_stems_fail_with_separation_error() {
    let harness = harness(HarnessOptions {
        produce_stems: false,
        ..HarnessOptions::default()
    });

    let err = harness
        .usecase
        .dub(request("job_sep", None, None))
        .await
        .expect_err("separation fails");

    assert_eq!(err.reason(), "separation_failed");
    assert!(harness.recorder.deleted.lock().expect("lock").is_empty());
    assert!(harness.recorder.published.lock().expect("lock").is_empty());
    assert!(!job_dir(&harness, "job_sep").exists());
}

#[tokio::test]
async fn invalid_job_id_is_rejected_before_any_work() {
    let harness = harness(HarnessOptions::default());

    let err = harness
        .usecase
        .dub(request("../escape", None, None))
        .await
        .expect_err("rejected");

    assert!(matches!(err, DubbingError::InvalidJobId));
    assert_eq!(harness.recorder.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fourth_job_for_a_client_is_rate_limited_before_download() {
    let harness = harness(HarnessOptions::default());
    for index in 0..3 {
        harness
            .usecase
            .dub(request(&format!("job_{index}"), None, Some("bob")))
            .await
            .expect("within quota");
    }

    let err = harness
        .usecase
        .dub(request("job_3", None, Some("bob")))
        .await
        .expect_err("over quota");

    assert!(matches!(err, DubbingError::RateLimitExceeded { limit: 3 }));
    assert_eq!(harness.recorder.fetches.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn job_exceeding_its_budget_times_out_and_cleans_up() {
    let harness = harness(HarnessOptions {
        fetch_delay: Duration::from_millis(500),
        job_timeout: Duration::from_millis(50),
        ..HarnessOptions::default()
    });

    let err = harness
        .usecase
        .dub(request("job_slow", None, None))
        .await
        .expect_err("times out");

    assert_eq!(err.reason(), "timeout");
    assert!(!job_dir(&harness, "job_slow").exists());
}

#[tokio::test]
async fn command_errors_carry_typed_reasons_and_short_messages() {
    let harness = harness(HarnessOptions {
        produce_stems: false,
        ..HarnessOptions::default()
    });
    let handler = DubVideoCommandHandler::new(harness.usecase.clone());

    let err = handler
        .handle(DubVideoCommand::new(request("", None, None)))
        .await
        .expect_err("empty id");
    assert_eq!(err.code(), "invalid_job_id");

    let err = handler
        .handle(DubVideoCommand::new(request("../escape", Some(""), None)))
        .await
        .expect_err("bad id");
    assert_eq!(err.code(), "invalid_job_id");

    let err = handler
        .handle(DubVideoCommand::new(request("job_sep", None, None)))
        .await
        .expect_err("separation fails");
    assert_eq!(err.code(), "separation_failed");
    assert_eq!(err.message(), "Demucs failed");
}

#[tokio::test]
async fn long_job_id_and_empty_language_are_accepted() {
    let harness = harness(HarnessOptions::default());
    let handler = DubVideoCommandHandler::new(harness.usecase.clone());
    let job_id = "a".repeat(129);

    let response = handler
        .handle(DubVideoCommand::new(request(&job_id, Some(""), None)))
        .await
        .expect("job succeeds");

    assert_eq!(response.target_lang, "hi");
    assert_eq!(response.job_id, job_id);
}
