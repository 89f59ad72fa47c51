use std::sync::Arc;

use async_trait::async_trait;
use dubbing_domain::SynthesisMode;

use super::{SegmentSynthesizer, SynthesisOutcome, SynthesisRequest, TrackAssembler};
use crate::{DubbingError, EngineCache, SegmentError};

/// Speaks each segment in the original speaker's timbre, using the separated
/// vocal stem as the reference recording.
pub struct CloningSynthesis {
    engines: Arc<EngineCache>,
    output_rate_hz: u32,
}

impl CloningSynthesis {
    pub fn new(engines: Arc<EngineCache>, output_rate_hz: u32) -> Self {
        Self {
            engines,
            output_rate_hz,
        }
    }
}

#[async_trait]
impl SegmentSynthesizer for CloningSynthesis {
    fn mode(&self) -> SynthesisMode {
        SynthesisMode::Cloning
    }

    async fn synthesize(
        &self,
        request: SynthesisRequest<'_>,
    ) -> Result<SynthesisOutcome, DubbingError> {
        let engine = self
            .engines
            .cloning_synthesizer()
            .await
            .map_err(|err| DubbingError::Synthesis(err.to_string()))?;

        let mut assembler = TrackAssembler::new(self.output_rate_hz);
        for (index, segment) in request.segments.iter().enumerate() {
            let text = segment.spoken_text().trim();
            if text.is_empty() {
                continue;
            }
            match engine
                .synthesize(text, request.vocals, request.target_lang)
                .await
            {
                Ok(clip) => assembler.push(index, clip),
                Err(source) => assembler.skip(SegmentError::Synthesis { index, source }),
            }
        }
        Ok(assembler.finish())
    }
}
