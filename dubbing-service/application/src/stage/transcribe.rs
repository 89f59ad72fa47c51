use std::sync::Arc;

use async_trait::async_trait;
use dubbing_domain::{JobContext, Transcript};

use crate::speakers::assign_speakers;
use crate::{DubbingError, EngineCache, PipelineStage};

/// Recognizes speech on the vocal stem, refines word timing for the detected
/// language, then labels segments with diarized speakers.
pub struct TranscribeStage {
    engines: Arc<EngineCache>,
}

impl TranscribeStage {
    pub fn new(engines: Arc<EngineCache>) -> Self {
        Self { engines }
    }
}

#[async_trait]
impl PipelineStage for TranscribeStage {
    fn name(&self) -> &'static str {
        "transcribe"
    }

    async fn execute(&self, context: &mut JobContext) -> Result<(), DubbingError> {
        let vocals = context
            .stems
            .as_ref()
            .map(|stems| stems.vocals.clone())
            .ok_or_else(|| DubbingError::Internal("transcribe ran before separation".to_string()))?;

        let recognizer = self.engines.recognizer().await.map_err(transcription)?;
        let recognition = recognizer.transcribe(&vocals).await.map_err(transcription)?;
        let language = recognition.language;
        let mut segments = recognition.segments;

        if !segments.is_empty() {
            let aligner = self.engines.aligner(&language).await.map_err(transcription)?;
            segments = aligner.align(segments, &vocals).await.map_err(transcription)?;

            let diarizer = self.engines.diarizer().await.map_err(transcription)?;
            let turns = diarizer.diarize(&vocals).await.map_err(transcription)?;
            assign_speakers(&mut segments, &turns);
        }

        tracing::info!(
            job_id = %context.job.id,
            language = %language,
            segments = segments.len(),
            "transcription completed"
        );
        context.stats.segments = segments.len();
        context.transcript = Some(Transcript { language, segments });
        Ok(())
    }
}

fn transcription(err: dubbing_domain::DomainError) -> DubbingError {
    DubbingError::Transcription(err.to_string())
}
