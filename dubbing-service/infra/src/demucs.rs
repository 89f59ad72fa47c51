use std::path::Path;

use async_trait::async_trait;
use dubbing_domain::{DomainError, SourceSeparator};

use crate::process::stderr_tail;
use crate::ProcessRunner;

#[derive(Debug, Clone)]
pub struct DemucsSettings {
    pub program: String,
    pub model: String,
    /// Chunk length in seconds; bounds accelerator memory.
    pub segment_secs: u32,
}

impl Default for DemucsSettings {
    fn default() -> Self {
        Self {
            program: "demucs".to_string(),
            model: "htdemucs".to_string(),
            segment_secs: 7,
        }
    }
}

pub fn separation_args(settings: &DemucsSettings, audio: &Path, output_dir: &Path) -> Vec<String> {
    vec![
        "--two-stems=vocals".to_string(),
        "-n".to_string(),
        settings.model.clone(),
        "--segment".to_string(),
        settings.segment_secs.to_string(),
        "-o".to_string(),
        output_dir.to_string_lossy().into_owned(),
        audio.to_string_lossy().into_owned(),
    ]
}

/// Two-stem separation through the `demucs` CLI. Stems land under
/// `<output_dir>/<model>/<track>/`.
pub struct DemucsSeparator {
    runner: ProcessRunner,
    settings: DemucsSettings,
}

impl DemucsSeparator {
    pub fn new(runner: ProcessRunner, settings: DemucsSettings) -> Self {
        Self { runner, settings }
    }
}

#[async_trait]
impl SourceSeparator for DemucsSeparator {
    async fn separate(&self, audio: &Path, output_dir: &Path) -> Result<(), DomainError> {
        tokio::fs::create_dir_all(output_dir).await?;
        let args = separation_args(&self.settings, audio, output_dir);
        let output = self
            .runner
            .run_unchecked(&self.settings.program, &args, None)
            .await?;
        if output.status.success() {
            return Ok(());
        }
        Err(DomainError::external_service_error(
            "demucs",
            &format!(
                "exited with {}: {}",
                output.status,
                stderr_tail(&output.stderr)
            ),
        ))
    }
}
