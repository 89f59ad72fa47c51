use std::sync::Arc;

use dubbing_domain::{Clock, RatePolicy, RateRecordStore};

use crate::DubbingError;

pub const ANONYMOUS_CLIENT: &str = "anonymous";

/// Sliding-window admission per client identifier.
pub struct RateLimiter {
    store: Arc<dyn RateRecordStore>,
    clock: Arc<dyn Clock>,
    policy: RatePolicy,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateRecordStore>, clock: Arc<dyn Clock>, policy: RatePolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    /// Empty and anonymous identifiers are never metered.
    pub fn is_unmetered(client_id: &str) -> bool {
        let client_id = client_id.trim();
        client_id.is_empty() || client_id == ANONYMOUS_CLIENT
    }

    /// Returns `Ok(())` when the job may proceed. Denials leave the record untouched.
    pub async fn admit(&self, client_id: &str) -> Result<(), DubbingError> {
        if Self::is_unmetered(client_id) {
            return Ok(());
        }

        let now = self.clock.now_secs();
        let decision = self
            .store
            .try_admit(client_id.trim(), now, &self.policy)
            .await
            .map_err(|err| DubbingError::Internal(format!("rate store unavailable: {err}")))?;

        tracing::debug!(
            client_id = client_id,
            admitted = decision.admitted,
            used = decision.used,
            limit = self.policy.max_requests,
            "rate limit decision"
        );

        if decision.admitted {
            Ok(())
        } else {
            Err(DubbingError::RateLimitExceeded {
                limit: self.policy.max_requests,
            })
        }
    }
}
