use std::path::Path;
use std::sync::Arc;

use dubbing_domain::{PitchTracker, PitchWindow, VoiceGender};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenderSettings {
    pub threshold_hz: f32,
    pub analysis_seconds: f32,
    pub fmin_hz: f32,
    pub fmax_hz: f32,
}

impl Default for GenderSettings {
    fn default() -> Self {
        Self {
            threshold_hz: 165.0,
            analysis_seconds: 30.0,
            fmin_hz: 50.0,
            fmax_hz: 400.0,
        }
    }
}

/// Picks a voice gender from the mean pitch of the separated vocals.
pub struct GenderClassifier {
    tracker: Arc<dyn PitchTracker>,
    settings: GenderSettings,
}

impl GenderClassifier {
    pub fn new(tracker: Arc<dyn PitchTracker>, settings: GenderSettings) -> Self {
        Self { tracker, settings }
    }

    /// Never fails: analysis errors and unvoiced input both resolve to `Male`.
    pub async fn classify(&self, vocals: &Path) -> VoiceGender {
        let window = PitchWindow {
            max_seconds: self.settings.analysis_seconds,
            fmin_hz: self.settings.fmin_hz,
            fmax_hz: self.settings.fmax_hz,
        };
        let mean_pitch = match self.tracker.mean_pitch_hz(vocals, window).await {
            Ok(mean) => mean,
            Err(err) => {
                tracing::warn!(error = %err, "pitch analysis failed, defaulting voice gender");
                None
            }
        };
        let gender = classify_mean_pitch(mean_pitch, self.settings.threshold_hz);
        tracing::debug!(
            mean_pitch_hz = mean_pitch.unwrap_or(f32::NAN),
            gender = %gender,
            "voice gender classified"
        );
        gender
    }
}

pub fn classify_mean_pitch(mean_pitch_hz: Option<f32>, threshold_hz: f32) -> VoiceGender {
    match mean_pitch_hz {
        Some(pitch) if pitch.is_finite() && pitch > threshold_hz => VoiceGender::Female,
        _ => VoiceGender::Male,
    }
}
