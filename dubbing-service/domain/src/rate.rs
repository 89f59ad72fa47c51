use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatePolicy {
    pub max_requests: usize,
    pub window_secs: f64,
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self {
            max_requests: 3,
            window_secs: 86_400.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub admitted: bool,
    /// Admissions inside the window after this decision.
    pub used: usize,
}

/// Admission timestamps, in seconds since the epoch, for one client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateRecord {
    pub timestamps: Vec<f64>,
}

impl RateRecord {
    pub fn new(timestamps: Vec<f64>) -> Self {
        Self { timestamps }
    }

    /// Drops every timestamp older than `now - window_secs`.
    pub fn prune(&mut self, now: f64, window_secs: f64) {
        let cutoff = now - window_secs;
        self.timestamps.retain(|ts| *ts > cutoff);
    }

    /// Prunes, then records `now` if the client still has room in the window.
    pub fn try_admit(&mut self, now: f64, policy: &RatePolicy) -> RateDecision {
        self.prune(now, policy.window_secs);
        if self.timestamps.len() >= policy.max_requests {
            return RateDecision {
                admitted: false,
                used: self.timestamps.len(),
            };
        }
        self.timestamps.push(now);
        RateDecision {
            admitted: true,
            used: self.timestamps.len(),
        }
    }
}
