mod cloning;
mod fallback;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use dubbing_domain::{AudioClip, Segment, SynthesisMode};

use crate::{DubbingError, SegmentError};

pub use cloning::CloningSynthesis;
pub use fallback::FallbackSynthesis;

pub struct SynthesisRequest<'a> {
    pub segments: &'a [Segment],
    pub target_lang: &'a str,
    pub vocals: &'a Path,
    pub scratch_dir: &'a Path,
}

/// Placement of one spoken segment inside the dubbed track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesizedPiece {
    pub segment_index: usize,
    pub start_sample: usize,
    pub sample_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisOutcome {
    pub track: AudioClip,
    pub pieces: Vec<SynthesizedPiece>,
    pub skipped: usize,
}

/// Turns translated segments into one contiguous waveform.
///
/// Segments whose synthesis fails are left out; the rest are concatenated
/// back to back in source order.
#[async_trait]
pub trait SegmentSynthesizer: Send + Sync {
    fn mode(&self) -> SynthesisMode;

    async fn synthesize(
        &self,
        request: SynthesisRequest<'_>,
    ) -> Result<SynthesisOutcome, DubbingError>;
}

/// Chooses the synthesizer for a target language.
pub struct SynthesisRouter {
    cloning: Arc<dyn SegmentSynthesizer>,
    fallback: Arc<dyn SegmentSynthesizer>,
    cloning_languages: HashSet<String>,
}

impl SynthesisRouter {
    pub fn new(
        cloning: Arc<dyn SegmentSynthesizer>,
        fallback: Arc<dyn SegmentSynthesizer>,
        cloning_languages: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            cloning,
            fallback,
            cloning_languages: cloning_languages
                .into_iter()
                .map(|language| language.trim().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn select_mode(&self, target_lang: &str) -> SynthesisMode {
        select_mode(target_lang, &self.cloning_languages)
    }

    pub fn route(&self, target_lang: &str) -> &Arc<dyn SegmentSynthesizer> {
        match self.select_mode(target_lang) {
            SynthesisMode::Cloning => &self.cloning,
            SynthesisMode::Fallback => &self.fallback,
        }
    }
}

pub fn select_mode(target_lang: &str, cloning_languages: &HashSet<String>) -> SynthesisMode {
    if cloning_languages.contains(&target_lang.trim().to_ascii_lowercase()) {
        SynthesisMode::Cloning
    } else {
        SynthesisMode::Fallback
    }
}

/// Folds per-segment results into the output track.
pub(crate) struct TrackAssembler {
    track: AudioClip,
    pieces: Vec<SynthesizedPiece>,
    skipped: usize,
}

impl TrackAssembler {
    pub(crate) fn new(sample_rate_hz: u32) -> Self {
        Self {
            track: AudioClip::empty(sample_rate_hz),
            pieces: Vec::new(),
            skipped: 0,
        }
    }

    pub(crate) fn push(&mut self, segment_index: usize, clip: AudioClip) {
        let clip = clip.resampled(self.track.sample_rate_hz);
        let piece = SynthesizedPiece {
            segment_index,
            start_sample: self.track.samples.len(),
            sample_count: clip.samples.len(),
        };
        self.track.samples.extend(clip.samples);
        self.pieces.push(piece);
    }

    pub(crate) fn skip(&mut self, error: SegmentError) {
        tracing::warn!(error = %error, "skipping segment");
        self.skipped += 1;
    }

    pub(crate) fn finish(self) -> SynthesisOutcome {
        SynthesisOutcome {
            track: self.track,
            pieces: self.pieces,
            skipped: self.skipped,
        }
    }
}
