use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dubbing_domain::{JobContext, SourceSeparator, StemSet};

use crate::{DubbingError, PipelineStage};

const VOCALS_STEM: &str = "vocals.wav";
const BACKGROUND_STEM: &str = "no_vocals.wav";

/// Splits the extracted audio into vocal and background stems.
///
/// The separator's own exit status is not trusted; the stage succeeds only if
/// both stem files can be found under the output directory.
pub struct SeparateStage {
    separator: Arc<dyn SourceSeparator>,
}

impl SeparateStage {
    pub fn new(separator: Arc<dyn SourceSeparator>) -> Self {
        Self { separator }
    }
}

#[async_trait]
impl PipelineStage for SeparateStage {
    fn name(&self) -> &'static str {
        "separate"
    }

    async fn execute(&self, context: &mut JobContext) -> Result<(), DubbingError> {
        let output_dir = context.paths.separation_dir.clone();
        let run = self
            .separator
            .separate(&context.paths.extracted_audio, &output_dir)
            .await;

        let search_dir = output_dir.clone();
        let stems = tokio::task::spawn_blocking(move || locate_stems(&search_dir))
            .await
            .map_err(|err| DubbingError::Internal(format!("stem search panicked: {err}")))?;

        match (stems, run) {
            (Some(stems), Ok(())) => {
                context.stems = Some(stems);
                Ok(())
            }
            (Some(stems), Err(err)) => {
                tracing::warn!(
                    job_id = %context.job.id,
                    error = %err,
                    "separator reported failure but produced stems"
                );
                context.stems = Some(stems);
                Ok(())
            }
            (None, Err(err)) => Err(DubbingError::Separation(err.to_string())),
            (None, Ok(())) => Err(DubbingError::Separation(format!(
                "no {VOCALS_STEM}/{BACKGROUND_STEM} under {}",
                output_dir.display()
            ))),
        }
    }
}

/// Walks `root` for the vocal and background stems, whatever subdirectories
/// the separator nested them under.
pub fn locate_stems(root: &Path) -> Option<StemSet> {
    let mut vocals = None;
    let mut background = None;
    if let Err(err) = walk(root, &mut |path| {
        match path.file_name().and_then(|name| name.to_str()) {
            Some(VOCALS_STEM) if vocals.is_none() => vocals = Some(path.to_path_buf()),
            Some(BACKGROUND_STEM) if background.is_none() => {
                background = Some(path.to_path_buf())
            }
            _ => {}
        }
    }) {
        tracing::debug!(path = %root.display(), error = %err, "stem search incomplete");
    }
    Some(StemSet {
        vocals: vocals?,
        background: background?,
    })
}

fn walk(dir: &Path, visit: &mut dyn FnMut(&Path)) -> io::Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .collect();
    entries.sort();
    for path in entries {
        if path.is_dir() {
            walk(&path, visit)?;
        } else {
            visit(&path);
        }
    }
    Ok(())
}
