use std::path::Path;

use async_trait::async_trait;
use dubbing_domain::{DomainError, PitchTracker, PitchWindow};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::wav;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YinSettings {
    pub frame_length: usize,
    pub hop_length: usize,
    /// Cumulative-mean-normalized difference below which a lag counts as voiced.
    pub threshold: f32,
    /// Frames quieter than this RMS are treated as silence.
    pub silence_rms: f32,
}

impl Default for YinSettings {
    fn default() -> Self {
        Self {
            frame_length: 2_048,
            hop_length: 512,
            threshold: 0.1,
            silence_rms: 1e-3,
        }
    }
}

/// YIN fundamental-frequency tracker over a WAV file.
#[derive(Debug, Clone, Default)]
pub struct YinPitchTracker {
    settings: YinSettings,
}

impl YinPitchTracker {
    pub fn new(settings: YinSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl PitchTracker for YinPitchTracker {
    async fn mean_pitch_hz(
        &self,
        audio: &Path,
        window: PitchWindow,
    ) -> Result<Option<f32>, DomainError> {
        let path = audio.to_path_buf();
        let settings = self.settings;
        tokio::task::spawn_blocking(move || {
            let clip = wav::read_wav_prefix(&path, Some(window.max_seconds))?;
            Ok(mean_voiced_pitch(
                &clip.samples,
                clip.sample_rate_hz,
                window.fmin_hz,
                window.fmax_hz,
                &settings,
            ))
        })
        .await
        .map_err(|err| DomainError::internal_error(&format!("pitch task failed: {err}")))?
    }
}

/// Mean f0 across voiced frames inside `[fmin_hz, fmax_hz]`, or `None` when
/// no frame is voiced.
pub fn mean_voiced_pitch(
    samples: &[f32],
    sample_rate_hz: u32,
    fmin_hz: f32,
    fmax_hz: f32,
    settings: &YinSettings,
) -> Option<f32> {
    if sample_rate_hz == 0 || fmin_hz <= 0.0 || fmax_hz <= fmin_hz {
        return None;
    }
    let rate = sample_rate_hz as f32;
    let min_lag = ((rate / fmax_hz).floor() as usize).max(2);
    let max_lag = (rate / fmin_hz).ceil() as usize;
    let frame_length = settings.frame_length.max(2 * max_lag + 2);
    let hop = settings.hop_length.max(1);
    if samples.len() < frame_length {
        return None;
    }

    let analyzer = FrameAnalyzer::new(frame_length, max_lag);
    let mut total = 0.0_f64;
    let mut voiced = 0_usize;
    let mut start = 0;
    while start + frame_length <= samples.len() {
        let frame = &samples[start..start + frame_length];
        start += hop;
        if rms(frame) < settings.silence_rms {
            continue;
        }
        let cmnd = analyzer.normalized_difference(frame);
        let Some(lag) = pick_lag(&cmnd, min_lag, max_lag, settings.threshold) else {
            continue;
        };
        let f0 = rate / lag;
        if (fmin_hz..=fmax_hz).contains(&f0) {
            total += f64::from(f0);
            voiced += 1;
        }
    }

    (voiced > 0).then(|| (total / voiced as f64) as f32)
}

fn rms(frame: &[f32]) -> f32 {
    let energy: f32 = frame.iter().map(|s| s * s).sum();
    (energy / frame.len() as f32).sqrt()
}

struct FrameAnalyzer {
    frame_length: usize,
    window: usize,
    max_lag: usize,
    fft_len: usize,
    forward: std::sync::Arc<dyn rustfft::Fft<f32>>,
    inverse: std::sync::Arc<dyn rustfft::Fft<f32>>,
}

impl FrameAnalyzer {
    fn new(frame_length: usize, max_lag: usize) -> Self {
        let window = frame_length - max_lag;
        let fft_len = (frame_length + window).next_power_of_two();
        let mut planner = FftPlanner::new();
        Self {
            frame_length,
            window,
            max_lag,
            fft_len,
            forward: planner.plan_fft_forward(fft_len),
            inverse: planner.plan_fft_inverse(fft_len),
        }
    }

    /// Cumulative mean normalized difference d'(tau) for tau in `0..=max_lag`.
    fn normalized_difference(&self, frame: &[f32]) -> Vec<f32> {
        let mut head = vec![Complex::new(0.0_f32, 0.0); self.fft_len];
        let mut full = vec![Complex::new(0.0_f32, 0.0); self.fft_len];
        for (slot, sample) in head.iter_mut().zip(&frame[..self.window]) {
            slot.re = *sample;
        }
        for (slot, sample) in full.iter_mut().zip(&frame[..self.frame_length]) {
            slot.re = *sample;
        }
        self.forward.process(&mut head);
        self.forward.process(&mut full);
        let mut correlation: Vec<Complex<f32>> = head
            .iter()
            .zip(&full)
            .map(|(a, b)| a.conj() * b)
            .collect();
        self.inverse.process(&mut correlation);
        let scale = self.fft_len as f32;

        let mut prefix_energy = Vec::with_capacity(self.frame_length + 1);
        prefix_energy.push(0.0_f32);
        for sample in frame {
            let last = prefix_energy[prefix_energy.len() - 1];
            prefix_energy.push(last + sample * sample);
        }
        let window_energy = |offset: usize| prefix_energy[offset + self.window] - prefix_energy[offset];
        let base_energy = window_energy(0);

        let mut cmnd = vec![1.0_f32; self.max_lag + 1];
        let mut running = 0.0_f32;
        for tau in 1..=self.max_lag {
            let cross = correlation[tau].re / scale;
            let difference = (base_energy + window_energy(tau) - 2.0 * cross).max(0.0);
            running += difference;
            cmnd[tau] = if running > 0.0 {
                difference * tau as f32 / running
            } else {
                1.0
            };
        }
        cmnd
    }
}

/// First dip under `threshold`, followed down to its local minimum and
/// refined with parabolic interpolation.
fn pick_lag(cmnd: &[f32], min_lag: usize, max_lag: usize, threshold: f32) -> Option<f32> {
    let last = max_lag.min(cmnd.len() - 1);
    let mut tau = min_lag;
    while tau <= last {
        if cmnd[tau] < threshold {
            while tau < last && cmnd[tau + 1] < cmnd[tau] {
                tau += 1;
            }
            return Some(refine(cmnd, tau));
        }
        tau += 1;
    }
    None
}

fn refine(cmnd: &[f32], tau: usize) -> f32 {
    if tau == 0 || tau + 1 >= cmnd.len() {
        return tau as f32;
    }
    let (left, mid, right) = (cmnd[tau - 1], cmnd[tau], cmnd[tau + 1]);
    let denominator = left - 2.0 * mid + right;
    if denominator.abs() < f32::EPSILON {
        return tau as f32;
    }
    let shift = 0.5 * (left - right) / denominator;
    tau as f32 + shift.clamp(-1.0, 1.0)
}
