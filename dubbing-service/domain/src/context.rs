use std::path::{Path, PathBuf};

use crate::{Job, StemSet, SynthesisMode, Transcript};

/// Fixed file layout inside a job's private directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    pub root: PathBuf,
    pub source_video: PathBuf,
    pub extracted_audio: PathBuf,
    pub separation_dir: PathBuf,
    pub scratch_dir: PathBuf,
    pub dubbed_audio: PathBuf,
    pub final_video: PathBuf,
}

impl JobPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            source_video: root.join("input.mp4"),
            extracted_audio: root.join("audio.wav"),
            separation_dir: root.join("separated"),
            scratch_dir: root.join("segments"),
            dubbed_audio: root.join("dubbed.wav"),
            final_video: root.join("final.mp4"),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Per-segment outcome counters gathered while the pipeline runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobStats {
    pub segments: usize,
    pub untranslated_segments: usize,
    pub skipped_segments: usize,
}

/// Mutable state threaded through the dubbing stages.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub job: Job,
    pub paths: JobPaths,
    pub stems: Option<StemSet>,
    pub transcript: Option<Transcript>,
    pub synthesis_mode: Option<SynthesisMode>,
    pub result_url: Option<String>,
    pub stats: JobStats,
}

impl JobContext {
    pub fn new(job: Job, paths: JobPaths) -> Self {
        Self {
            job,
            paths,
            stems: None,
            transcript: None,
            synthesis_mode: None,
            result_url: None,
            stats: JobStats::default(),
        }
    }
}
