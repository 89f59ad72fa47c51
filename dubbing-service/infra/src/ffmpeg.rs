use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dubbing_domain::{AudioClip, AudioCodec, AudioExtractor, DomainError, MixRequest, Mixer};

use crate::{wav, ProcessRunner};

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Arguments that decode a video's audio track to 44.1 kHz stereo 16-bit PCM.
pub fn extraction_args(video: &Path, destination: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        path_arg(video),
        "-vn".to_string(),
        "-acodec".to_string(),
        "pcm_s16le".to_string(),
        "-ar".to_string(),
        "44100".to_string(),
        "-ac".to_string(),
        "2".to_string(),
        path_arg(destination),
    ]
}

/// Arguments that decode any audio container to mono PCM at its native rate.
pub fn decode_args(source: &Path, destination: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        path_arg(source),
        "-vn".to_string(),
        "-acodec".to_string(),
        "pcm_s16le".to_string(),
        "-ac".to_string(),
        "1".to_string(),
        path_arg(destination),
    ]
}

/// Arguments that replace a video's audio with speech over attenuated background.
/// The video stream is copied, audio is re-encoded to AAC, and the output ends
/// with the speech track.
pub fn mix_args(request: &MixRequest) -> Vec<String> {
    let filter = format!(
        "[2:a]volume={}[bg];[1:a][bg]amix=inputs=2:duration=first[aout]",
        request.background_gain
    );
    vec![
        "-y".to_string(),
        "-i".to_string(),
        path_arg(&request.video),
        "-i".to_string(),
        path_arg(&request.speech),
        "-i".to_string(),
        path_arg(&request.background),
        "-filter_complex".to_string(),
        filter,
        "-map".to_string(),
        "0:v".to_string(),
        "-map".to_string(),
        "[aout]".to_string(),
        "-c:v".to_string(),
        "copy".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        path_arg(&request.output),
    ]
}

pub struct FfmpegAudioExtractor {
    runner: ProcessRunner,
    program: String,
}

impl FfmpegAudioExtractor {
    pub fn new(runner: ProcessRunner, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }
}

#[async_trait]
impl AudioExtractor for FfmpegAudioExtractor {
    async fn extract(&self, video: &Path, destination: &Path) -> Result<(), DomainError> {
        self.runner
            .run(&self.program, &extraction_args(video, destination), None)
            .await?;
        Ok(())
    }
}

pub struct FfmpegMixer {
    runner: ProcessRunner,
    program: String,
}

impl FfmpegMixer {
    pub fn new(runner: ProcessRunner, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }
}

#[async_trait]
impl Mixer for FfmpegMixer {
    async fn mix(&self, request: &MixRequest) -> Result<(), DomainError> {
        self.runner
            .run(&self.program, &mix_args(request), None)
            .await?;
        Ok(())
    }
}

/// Decodes through ffmpeg and reads or writes WAV with `hound`.
pub struct FfmpegAudioCodec {
    runner: ProcessRunner,
    program: String,
}

impl FfmpegAudioCodec {
    pub fn new(runner: ProcessRunner, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }
}

fn decoded_path(source: &Path) -> PathBuf {
    let mut name = source
        .file_stem()
        .map(|stem| stem.to_os_string())
        .unwrap_or_default();
    name.push(".decoded.wav");
    source.with_file_name(name)
}

#[async_trait]
impl AudioCodec for FfmpegAudioCodec {
    async fn decode(&self, source: &Path) -> Result<AudioClip, DomainError> {
        let target = decoded_path(source);
        self.runner
            .run(&self.program, &decode_args(source, &target), None)
            .await?;

        let read_target = target.clone();
        let clip = tokio::task::spawn_blocking(move || wav::read_wav(&read_target))
            .await
            .map_err(|err| DomainError::internal_error(&format!("decode task failed: {err}")))?;
        if let Err(err) = tokio::fs::remove_file(&target).await {
            tracing::debug!(path = %target.display(), error = %err, "decoded file not removed");
        }
        clip
    }

    async fn write_wav(&self, clip: &AudioClip, destination: &Path) -> Result<(), DomainError> {
        let clip = clip.clone();
        let destination = destination.to_path_buf();
        tokio::task::spawn_blocking(move || wav::write_wav(&destination, &clip))
            .await
            .map_err(|err| DomainError::internal_error(&format!("encode task failed: {err}")))?
    }
}
