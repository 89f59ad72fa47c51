use std::path::Path;

use async_trait::async_trait;
use dubbing_domain::{
    Aligner, Diarizer, DomainError, Recognition, Recognizer, Segment, SpeakerTurn, WordTiming,
};
use serde::{Deserialize, Serialize};

use crate::SidecarClient;

fn secs_to_ms(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        (secs * 1_000.0).round() as u64
    } else {
        0
    }
}

fn ms_to_secs(ms: u64) -> f64 {
    ms as f64 / 1_000.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireWord {
    pub word: String,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
    #[serde(default)]
    pub score: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub words: Vec<WireWord>,
}

impl WireSegment {
    fn from_segment(segment: &Segment) -> Self {
        Self {
            start: ms_to_secs(segment.start_ms),
            end: ms_to_secs(segment.end_ms),
            text: segment.text.clone(),
            words: Vec::new(),
        }
    }

    /// Words the aligner could not place (digits, symbols) carry no timing
    /// and are dropped from the word list; the segment text keeps them.
    fn into_segment(self) -> Segment {
        let start_ms = secs_to_ms(self.start);
        let end_ms = secs_to_ms(self.end).max(start_ms);
        let words = self
            .words
            .into_iter()
            .filter_map(|word| {
                let start_ms = secs_to_ms(word.start?);
                let end_ms = secs_to_ms(word.end?).max(start_ms);
                Some(WordTiming {
                    word: word.word,
                    start_ms,
                    end_ms,
                    confidence: word.score,
                    speaker: None,
                })
            })
            .collect();
        Segment {
            start_ms,
            end_ms,
            text: self.text.trim().to_string(),
            speaker: None,
            words,
            translated_text: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct TranscribeRequest<'a> {
    handle: &'a str,
    audio_path: String,
    batch_size: u32,
    chunk_size: u32,
}

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    language: String,
    segments: Vec<WireSegment>,
}

/// Batched recognizer hosted by the sidecar. Audio travels by path on the
/// shared job volume.
pub struct SidecarRecognizer {
    client: SidecarClient,
    handle: String,
    batch_size: u32,
    chunk_size: u32,
}

impl SidecarRecognizer {
    pub fn new(client: SidecarClient, handle: String, batch_size: u32, chunk_size: u32) -> Self {
        Self {
            client,
            handle,
            batch_size,
            chunk_size,
        }
    }
}

#[async_trait]
impl Recognizer for SidecarRecognizer {
    async fn transcribe(&self, audio: &Path) -> Result<Recognition, DomainError> {
        let response: TranscribeResponse = self
            .client
            .post_json(
                "recognizer",
                "/v1/transcribe",
                &TranscribeRequest {
                    handle: &self.handle,
                    audio_path: audio.to_string_lossy().into_owned(),
                    batch_size: self.batch_size,
                    chunk_size: self.chunk_size,
                },
            )
            .await?;
        Ok(Recognition {
            language: response.language.trim().to_ascii_lowercase(),
            segments: response
                .segments
                .into_iter()
                .map(WireSegment::into_segment)
                .collect(),
        })
    }
}

#[derive(Debug, Serialize)]
struct AlignRequest<'a> {
    handle: &'a str,
    audio_path: String,
    segments: Vec<WireSegment>,
}

#[derive(Debug, Deserialize)]
struct AlignResponse {
    segments: Vec<WireSegment>,
}

pub struct SidecarAligner {
    client: SidecarClient,
    handle: String,
}

impl SidecarAligner {
    pub fn new(client: SidecarClient, handle: String) -> Self {
        Self { client, handle }
    }
}

#[async_trait]
impl Aligner for SidecarAligner {
    async fn align(
        &self,
        segments: Vec<Segment>,
        audio: &Path,
    ) -> Result<Vec<Segment>, DomainError> {
        let response: AlignResponse = self
            .client
            .post_json(
                "aligner",
                "/v1/align",
                &AlignRequest {
                    handle: &self.handle,
                    audio_path: audio.to_string_lossy().into_owned(),
                    segments: segments.iter().map(WireSegment::from_segment).collect(),
                },
            )
            .await?;
        Ok(response
            .segments
            .into_iter()
            .map(WireSegment::into_segment)
            .collect())
    }
}

#[derive(Debug, Serialize)]
struct DiarizeRequest<'a> {
    handle: &'a str,
    audio_path: String,
}

#[derive(Debug, Deserialize)]
struct WireTurn {
    start: f64,
    end: f64,
    speaker: String,
}

#[derive(Debug, Deserialize)]
struct DiarizeResponse {
    turns: Vec<WireTurn>,
}

pub struct SidecarDiarizer {
    client: SidecarClient,
    handle: String,
}

impl SidecarDiarizer {
    pub fn new(client: SidecarClient, handle: String) -> Self {
        Self { client, handle }
    }
}

#[async_trait]
impl Diarizer for SidecarDiarizer {
    async fn diarize(&self, audio: &Path) -> Result<Vec<SpeakerTurn>, DomainError> {
        let response: DiarizeResponse = self
            .client
            .post_json(
                "diarizer",
                "/v1/diarize",
                &DiarizeRequest {
                    handle: &self.handle,
                    audio_path: audio.to_string_lossy().into_owned(),
                },
            )
            .await?;
        Ok(response
            .turns
            .into_iter()
            .map(|turn| {
                let start_ms = secs_to_ms(turn.start);
                SpeakerTurn {
                    start_ms,
                    end_ms: secs_to_ms(turn.end).max(start_ms),
                    speaker: turn.speaker,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untimed_words_are_dropped_and_times_converted() {
        let wire = WireSegment {
            start: 1.25,
            end: 2.5,
            text: " it costs 20 dollars ".to_string(),
            words: vec![
                WireWord {
                    word: "costs".to_string(),
                    start: Some(1.5),
                    end: Some(1.9),
                    score: Some(0.8),
                },
                WireWord {
                    word: "20".to_string(),
                    start: None,
                    end: None,
                    score: None,
                },
            ],
        };

        let segment = wire.into_segment();

        assert_eq!(segment.start_ms, 1_250);
        assert_eq!(segment.end_ms, 2_500);
        assert_eq!(segment.text, "it costs 20 dollars");
        assert_eq!(segment.words.len(), 1);
        assert_eq!(segment.words[0].start_ms, 1_500);
        assert_eq!(segment.words[0].end_ms, 1_900);
    }

    #[test]
    fn negative_or_nan_times_clamp_to_zero() {
        assert_eq!(secs_to_ms(-1.0), 0);
        assert_eq!(secs_to_ms(f64::NAN), 0);
        assert_eq!(secs_to_ms(0.0015), 2);
    }
}
