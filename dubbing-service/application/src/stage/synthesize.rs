use std::sync::Arc;

use async_trait::async_trait;
use dubbing_domain::{AudioCodec, JobContext};

use crate::{DubbingError, PipelineStage, SynthesisRequest, SynthesisRouter};

pub struct SynthesizeStage {
    router: SynthesisRouter,
    codec: Arc<dyn AudioCodec>,
}

impl SynthesizeStage {
    pub fn new(router: SynthesisRouter, codec: Arc<dyn AudioCodec>) -> Self {
        Self { router, codec }
    }
}

#[async_trait]
impl PipelineStage for SynthesizeStage {
    fn name(&self) -> &'static str {
        "synthesize"
    }

    async fn execute(&self, context: &mut JobContext) -> Result<(), DubbingError> {
        let transcript = context
            .transcript
            .as_ref()
            .ok_or_else(|| DubbingError::Internal("synthesize ran before transcribe".to_string()))?;
        let stems = context
            .stems
            .as_ref()
            .ok_or_else(|| DubbingError::Internal("synthesize ran before separation".to_string()))?;

        let synthesizer = self.router.route(&context.job.target_lang);
        let mode = synthesizer.mode();
        let outcome = synthesizer
            .synthesize(SynthesisRequest {
                segments: &transcript.segments,
                target_lang: &context.job.target_lang,
                vocals: &stems.vocals,
                scratch_dir: &context.paths.scratch_dir,
            })
            .await?;

        tracing::info!(
            job_id = %context.job.id,
            mode = mode.as_str(),
            spoken = outcome.pieces.len(),
            skipped = outcome.skipped,
            duration_secs = outcome.track.duration_secs(),
            "dubbed track synthesized"
        );

        self.codec
            .write_wav(&outcome.track, &context.paths.dubbed_audio)
            .await
            .map_err(|err| DubbingError::Synthesis(format!("writing dubbed track: {err}")))?;

        context.synthesis_mode = Some(mode);
        context.stats.skipped_segments = outcome.skipped;
        Ok(())
    }
}
