use std::io::Read;
use std::path::Path;

use dubbing_domain::{AudioClip, DomainError};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

pub fn read_wav(path: &Path) -> Result<AudioClip, DomainError> {
    read_wav_prefix(path, None)
}

/// Reads at most `max_seconds` of audio, downmixed to mono.
pub fn read_wav_prefix(path: &Path, max_seconds: Option<f32>) -> Result<AudioClip, DomainError> {
    let reader = WavReader::open(path).map_err(|err| {
        DomainError::internal_error(&format!("cannot open {}: {err}", path.display()))
    })?;
    decode(reader, max_seconds)
}

pub fn read_wav_from<R: Read>(source: R) -> Result<AudioClip, DomainError> {
    let reader = WavReader::new(source)
        .map_err(|err| DomainError::internal_error(&format!("invalid wav data: {err}")))?;
    decode(reader, None)
}

fn decode<R: Read>(reader: WavReader<R>, max_seconds: Option<f32>) -> Result<AudioClip, DomainError> {
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));
    let max_samples = max_seconds
        .map(|secs| (secs.max(0.0) * spec.sample_rate as f32) as usize * channels)
        .unwrap_or(usize::MAX);

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .take(max_samples)
            .collect::<Result<_, _>>()
            .map_err(wav_error)?,
        SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .take(max_samples)
                .map(|sample| sample.map(|value| value as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(wav_error)?
        }
    };

    Ok(AudioClip::new(spec.sample_rate, downmix(&interleaved, channels)))
}

fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Writes a mono 16-bit PCM file. An empty clip yields a valid, silent file.
pub fn write_wav(path: &Path, clip: &AudioClip) -> Result<(), DomainError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: clip.sample_rate_hz,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).map_err(wav_error)?;
    for sample in &clip.samples {
        let value = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16;
        writer.write_sample(value).map_err(wav_error)?;
    }
    writer.finalize().map_err(wav_error)
}

fn wav_error(err: hound::Error) -> DomainError {
    DomainError::internal_error(&format!("wav codec: {err}"))
}
