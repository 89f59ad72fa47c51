use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use dubbing_domain::{DomainError, EngineProvider};
use dubbing_infra_rest::{SidecarClient, SidecarEngineProvider, SidecarSettings};
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<(String, Value)>>>,
}

impl Recorded {
    fn push(&self, path: &str, body: Value) {
        self.requests
            .lock()
            .expect("lock")
            .push((path.to_string(), body));
    }

    fn bodies(&self, path: &str) -> Vec<Value> {
        self.requests
            .lock()
            .expect("lock")
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, body)| body.clone())
            .collect()
    }
}

fn tone_wav() -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 24_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("writer");
        for i in 0..2_400 {
            writer
                .write_sample(if i % 2 == 0 { 8_000_i16 } else { -8_000 })
                .expect("sample");
        }
        writer.finalize().expect("finalize");
    }
    cursor.into_inner()
}

async fn load(State(state): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    let kind = body["kind"].as_str().unwrap_or("unknown").to_string();
    state.push("/v1/models/load", body);
    Json(json!({ "handle": format!("{kind}-1") }))
}

async fn transcribe(State(state): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    state.push("/v1/transcribe", body);
    Json(json!({
        "language": "EN",
        "segments": [
            {"start": 0.0, "end": 1.5, "text": " hello there "},
            {"start": 2.0, "end": 3.25, "text": "general kenobi"}
        ]
    }))
}

async fn align(State(state): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    state.push("/v1/align", body);
    Json(json!({
        "segments": [{
            "start": 0.1,
            "end": 1.4,
            "text": "hello there",
            "words": [
                {"word": "hello", "start": 0.1, "end": 0.6, "score": 0.9},
                {"word": "there", "start": 0.7, "end": 1.4, "score": 0.8},
                {"word": "42"}
            ]
        }]
    }))
}

async fn diarize(State(state): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    state.push("/v1/diarize", body);
    Json(json!({ "turns": [{"start": 0.0, "end": 2.0, "speaker": "SPEAKER_00"}] }))
}

async fn tts(State(state): State<Recorded>, Json(body): Json<Value>) -> (StatusCode, Vec<u8>) {
    let reject = body["text"].as_str() == Some("boom");
    state.push("/v1/tts", body);
    if reject {
        (StatusCode::INTERNAL_SERVER_ERROR, b"cuda out of memory".to_vec())
    } else {
        (StatusCode::OK, tone_wav())
    }
}

async fn spawn_sidecar() -> (String, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/v1/models/load", post(load))
        .route("/v1/transcribe", post(transcribe))
        .route("/v1/align", post(align))
        .route("/v1/diarize", post(diarize))
        .route("/v1/tts", post(tts))
        .with_state(recorded.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    (format!("http://{addr}"), recorded)
}

fn provider(base_url: &str) -> SidecarEngineProvider {
    let client = SidecarClient::new(base_url, Duration::from_secs(5)).expect("client");
    SidecarEngineProvider::new(
        client.clone(),
        client,
        SidecarSettings {
            recognizer_model: "medium".to_string(),
            compute_type: "float16".to_string(),
            batch_size: 8,
            chunk_size: 30,
            cloning_model: "xtts_v2".to_string(),
            hf_token: Some("hf_secret".to_string()),
        },
    )
}

#[tokio::test]
async fn speech_engines_speak_the_sidecar_protocol() {
    let (base_url, recorded) = spawn_sidecar().await;
    let provider = provider(&base_url);
    let audio = Path::new("/jobs/job_1/separated/htdemucs/audio/vocals.wav");

    let recognizer = provider.load_recognizer().await.expect("recognizer");
    let recognition = recognizer.transcribe(audio).await.expect("transcribe");
    assert_eq!(recognition.language, "en");
    assert_eq!(recognition.segments.len(), 2);
    assert_eq!(recognition.segments[0].text, "hello there");
    assert_eq!(recognition.segments[1].start_ms, 2_000);
    assert_eq!(recognition.segments[1].end_ms, 3_250);

    let aligner = provider.load_aligner("en").await.expect("aligner");
    let aligned = aligner
        .align(recognition.segments.clone(), audio)
        .await
        .expect("align");
    assert_eq!(aligned.len(), 1);
    assert_eq!(aligned[0].words.len(), 2);
    assert_eq!(aligned[0].words[1].start_ms, 700);

    let diarizer = provider.load_diarizer().await.expect("diarizer");
    let turns = diarizer.diarize(audio).await.expect("diarize");
    assert_eq!(turns[0].speaker, "SPEAKER_00");
    assert_eq!(turns[0].end_ms, 2_000);

    let transcribe = recorded.bodies("/v1/transcribe");
    assert_eq!(transcribe[0]["handle"], "recognizer-1");
    assert_eq!(transcribe[0]["batch_size"], 8);
    assert_eq!(
        transcribe[0]["audio_path"],
        "/jobs/job_1/separated/htdemucs/audio/vocals.wav"
    );
    let align_body = &recorded.bodies("/v1/align")[0];
    assert_eq!(align_body["segments"][1]["start"], 2.0);

    let loads = recorded.bodies("/v1/models/load");
    assert_eq!(loads[0]["model"], "medium");
    assert_eq!(loads[1], json!({"kind": "aligner", "language": "en"}));
    assert_eq!(loads[2]["hf_token"], "hf_secret");
}

#[tokio::test]
async fn cloning_decodes_wav_and_surfaces_sidecar_errors() {
    let (base_url, recorded) = spawn_sidecar().await;
    let provider = provider(&base_url);
    let synthesizer = provider
        .load_cloning_synthesizer()
        .await
        .expect("synthesizer");

    let clip = synthesizer
        .synthesize("namaste", Path::new("/jobs/job_1/vocals.wav"), "hi")
        .await
        .expect("clip");
    assert_eq!(clip.sample_rate_hz, 24_000);
    assert_eq!(clip.samples.len(), 2_400);

    let err = synthesizer
        .synthesize("boom", Path::new("/jobs/job_1/vocals.wav"), "hi")
        .await
        .expect_err("server error");
    match err {
        DomainError::ExternalService { service, message } => {
            assert_eq!(service, "cloning");
            assert!(message.contains("500"), "message {message}");
            assert!(message.contains("cuda out of memory"), "message {message}");
        }
        other => panic!("unexpected error {other:?}"),
    }

    let tts = recorded.bodies("/v1/tts");
    assert_eq!(tts[0]["handle"], "cloning-1");
    assert_eq!(tts[0]["language"], "hi");
    assert_eq!(tts[0]["speaker_wav"], "/jobs/job_1/vocals.wav");
}

#[tokio::test]
async fn unreachable_sidecar_is_an_external_service_error() {
    let provider = provider("http://127.0.0.1:9");
    let result = provider.load_diarizer().await;
    assert!(matches!(
        result,
        Err(DomainError::ExternalService { ref service, .. }) if service == "diarizer"
    ));
}
