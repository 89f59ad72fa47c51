use std::sync::Arc;

use async_trait::async_trait;
use dubbing_domain::{JobContext, Translator};

use crate::{DubbingError, PipelineStage, SegmentError};

/// Translates every segment. A failed segment keeps its source text so the
/// job always continues.
pub struct TranslateStage {
    translator: Arc<dyn Translator>,
}

impl TranslateStage {
    pub fn new(translator: Arc<dyn Translator>) -> Self {
        Self { translator }
    }
}

#[async_trait]
impl PipelineStage for TranslateStage {
    fn name(&self) -> &'static str {
        "translate"
    }

    async fn execute(&self, context: &mut JobContext) -> Result<(), DubbingError> {
        let target_lang = context.job.target_lang.clone();
        let transcript = context
            .transcript
            .as_mut()
            .ok_or_else(|| DubbingError::Internal("translate ran before transcribe".to_string()))?;

        let mut untranslated = 0;
        for (index, segment) in transcript.segments.iter_mut().enumerate() {
            if segment.text.trim().is_empty() {
                segment.translated_text = Some(segment.text.clone());
                continue;
            }
            let translated = match self.translator.translate(&segment.text, &target_lang).await {
                Ok(text) => text,
                Err(source) => {
                    let failure = SegmentError::Translation { index, source };
                    tracing::warn!(error = %failure, "keeping source text");
                    untranslated += 1;
                    segment.text.clone()
                }
            };
            segment.translated_text = Some(translated);
        }

        context.stats.untranslated_segments = untranslated;
        Ok(())
    }
}
