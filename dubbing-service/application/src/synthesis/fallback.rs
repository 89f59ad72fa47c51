use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use dubbing_domain::{
    persona_for, AudioClip, AudioCodec, DomainError, NeuralVoice, SynthesisMode,
};

use super::{SegmentSynthesizer, SynthesisOutcome, SynthesisRequest, TrackAssembler};
use crate::{DubbingError, GenderClassifier, SegmentError};

/// Speaks segments with a stock neural voice chosen by language and by the
/// detected gender of the original speaker.
pub struct FallbackSynthesis {
    voice: Arc<dyn NeuralVoice>,
    codec: Arc<dyn AudioCodec>,
    classifier: GenderClassifier,
    output_rate_hz: u32,
}

impl FallbackSynthesis {
    pub fn new(
        voice: Arc<dyn NeuralVoice>,
        codec: Arc<dyn AudioCodec>,
        classifier: GenderClassifier,
        output_rate_hz: u32,
    ) -> Self {
        Self {
            voice,
            codec,
            classifier,
            output_rate_hz,
        }
    }

    async fn speak(
        &self,
        text: &str,
        voice: &str,
        clip_path: &Path,
    ) -> Result<AudioClip, DomainError> {
        self.voice.synthesize(text, voice, clip_path).await?;
        let decoded = self.codec.decode(clip_path).await;
        if let Err(err) = tokio::fs::remove_file(clip_path).await {
            tracing::debug!(path = %clip_path.display(), error = %err, "temporary clip not removed");
        }
        decoded
    }
}

#[async_trait]
impl SegmentSynthesizer for FallbackSynthesis {
    fn mode(&self) -> SynthesisMode {
        SynthesisMode::Fallback
    }

    async fn synthesize(
        &self,
        request: SynthesisRequest<'_>,
    ) -> Result<SynthesisOutcome, DubbingError> {
        let gender = self.classifier.classify(request.vocals).await;
        let voice = persona_for(request.target_lang).voice_for(gender);
        tracing::info!(
            target_lang = request.target_lang,
            gender = %gender,
            voice = voice,
            "fallback voice selected"
        );

        let mut assembler = TrackAssembler::new(self.output_rate_hz);
        for (index, segment) in request.segments.iter().enumerate() {
            let text = segment.spoken_text().trim();
            if text.is_empty() {
                continue;
            }
            let clip_path = request.scratch_dir.join(format!("temp_{index}.mp3"));
            match self.speak(text, voice, &clip_path).await {
                Ok(clip) => assembler.push(index, clip),
                Err(source) => assembler.skip(SegmentError::Synthesis { index, source }),
            }
        }
        Ok(assembler.finish())
    }
}
