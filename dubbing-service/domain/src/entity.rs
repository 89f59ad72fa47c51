use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A single dubbing request after defaults have been resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub source_url: String,
    pub target_lang: String,
    pub client_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub confidence: Option<f32>,
    pub speaker: Option<String>,
}

/// A timed span of recognized speech. `translated_text` stays `None` until
/// the translation stage has visited the segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
    pub speaker: Option<String>,
    pub words: Vec<WordTiming>,
    pub translated_text: Option<String>,
}

impl Segment {
    pub fn new(start_ms: u64, end_ms: u64, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            end_ms,
            text: text.into(),
            speaker: None,
            words: Vec::new(),
            translated_text: None,
        }
    }

    /// Text handed to synthesis: the translation when present, the source otherwise.
    pub fn spoken_text(&self) -> &str {
        self.translated_text.as_deref().unwrap_or(&self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub language: String,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerTurn {
    pub start_ms: u64,
    pub end_ms: u64,
    pub speaker: String,
}

/// Mono PCM samples in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AudioClip {
    pub sample_rate_hz: u32,
    pub samples: Vec<f32>,
}

impl AudioClip {
    pub fn new(sample_rate_hz: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate_hz,
            samples,
        }
    }

    pub fn empty(sample_rate_hz: u32) -> Self {
        Self::new(sample_rate_hz, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate_hz == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate_hz)
    }

    /// Returns the clip at `target_rate_hz`, clamping samples into range on the way.
    pub fn resampled(mut self, target_rate_hz: u32) -> Self {
        clamp_samples(&mut self.samples);
        if self.sample_rate_hz == 0 || target_rate_hz == 0 {
            return Self::new(target_rate_hz, self.samples);
        }
        let samples = resample_linear(&self.samples, self.sample_rate_hz, target_rate_hz);
        Self::new(target_rate_hz, samples)
    }
}

fn clamp_samples(samples: &mut [f32]) {
    for sample in samples {
        *sample = if sample.is_finite() {
            sample.clamp(-1.0, 1.0)
        } else {
            0.0
        };
    }
}

pub fn resample_linear(samples: &[f32], source_rate_hz: u32, target_rate_hz: u32) -> Vec<f32> {
    if source_rate_hz == target_rate_hz || samples.len() <= 1 {
        return samples.to_vec();
    }

    let output_len = ((samples.len() as u64 * u64::from(target_rate_hz))
        / u64::from(source_rate_hz))
    .max(1) as usize;
    if output_len <= 1 {
        return vec![samples[0]];
    }

    let step = f64::from(source_rate_hz) / f64::from(target_rate_hz);
    let last = samples.len() - 1;
    (0..output_len)
        .map(|out_idx| {
            let position = out_idx as f64 * step;
            let left = (position.floor() as usize).min(last);
            let right = (left + 1).min(last);
            let frac = (position - left as f64) as f32;
            samples[left] * (1.0 - frac) + samples[right] * frac
        })
        .collect()
}

/// Separated stems produced by the source separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StemSet {
    pub vocals: PathBuf,
    pub background: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceGender {
    Male,
    Female,
}

impl fmt::Display for VoiceGender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceGender::Male => f.write_str("male"),
            VoiceGender::Female => f.write_str("female"),
        }
    }
}

/// Which synthesis engine produced the dubbed track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisMode {
    Cloning,
    Fallback,
}

impl SynthesisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SynthesisMode::Cloning => "cloning",
            SynthesisMode::Fallback => "fallback",
        }
    }
}
