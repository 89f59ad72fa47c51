use async_trait::async_trait;
use dashmap::DashMap;
use dubbing_domain::{DomainError, RateDecision, RatePolicy, RateRecord, RateRecordStore};

/// Process-local store. The map entry lock makes check-and-record atomic per client.
#[derive(Debug, Default)]
pub struct InMemoryRateRecordStore {
    records: DashMap<String, RateRecord>,
}

impl InMemoryRateRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, client_id: &str) -> Option<RateRecord> {
        self.records.get(client_id).map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl RateRecordStore for InMemoryRateRecordStore {
    async fn try_admit(
        &self,
        client_id: &str,
        now: f64,
        policy: &RatePolicy,
    ) -> Result<RateDecision, DomainError> {
        let mut record = self.records.entry(client_id.to_string()).or_default();
        Ok(record.try_admit(now, policy))
    }
}

/// Prunes, checks and appends in one server-side step, storing the record as
/// a JSON array of timestamps that expires with the window.
const ADMIT_SCRIPT: &str = r#"
local raw = redis.call('GET', KEYS[1])
local now = tonumber(ARGV[1])
local window = tonumber(ARGV[2])
local limit = tonumber(ARGV[3])
local kept = {}
if raw then
  local ok, decoded = pcall(cjson.decode, raw)
  if ok and type(decoded) == 'table' then
    for _, ts in ipairs(decoded) do
      local value = tonumber(ts)
      if value and value > now - window then
        table.insert(kept, value)
      end
    end
  end
end
if #kept >= limit then
  return {0, #kept}
end
table.insert(kept, now)
redis.call('SET', KEYS[1], cjson.encode(kept), 'EX', math.ceil(window))
return {1, #kept}
"#;

/// Shared store for multi-replica deployments.
pub struct RedisRateRecordStore {
    client: redis::Client,
    key_prefix: String,
    script: redis::Script,
}

impl RedisRateRecordStore {
    pub fn new(redis_url: &str, key_prefix: impl Into<String>) -> Result<Self, DomainError> {
        let client = redis::Client::open(redis_url).map_err(|err| {
            DomainError::external_service_error("redis", &format!("invalid url: {err}"))
        })?;
        Ok(Self {
            client,
            key_prefix: key_prefix.into(),
            script: redis::Script::new(ADMIT_SCRIPT),
        })
    }

    fn key(&self, client_id: &str) -> String {
        format!("{}{}", self.key_prefix, client_id)
    }
}

#[async_trait]
impl RateRecordStore for RedisRateRecordStore {
    async fn try_admit(
        &self,
        client_id: &str,
        now: f64,
        policy: &RatePolicy,
    ) -> Result<RateDecision, DomainError> {
        let mut connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|err| DomainError::external_service_error("redis", &err.to_string()))?;
        let (admitted, used): (i64, i64) = self
            .script
            .key(self.key(client_id))
            .arg(now)
            .arg(policy.window_secs)
            .arg(policy.max_requests)
            .invoke_async(&mut connection)
            .await
            .map_err(|err| DomainError::external_service_error("redis", &err.to_string()))?;
        Ok(RateDecision {
            admitted: admitted == 1,
            used: usize::try_from(used).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn concurrent_requests_never_exceed_the_limit() {
        let store = Arc::new(InMemoryRateRecordStore::new());
        let policy = RatePolicy::default();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .try_admit("carol", 500.0, &policy)
                    .await
                    .expect("store")
                    .admitted
            }));
        }
        let mut admitted = 0;
        for handle in handles {
            if handle.await.expect("join") {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 3);
        assert_eq!(store.record("carol").expect("record").timestamps.len(), 3);
    }

    #[test]
    fn redis_keys_are_prefixed() {
        let store = RedisRateRecordStore::new("redis://127.0.0.1:6379", "dubbing:rate:")
            .expect("valid url");
        assert_eq!(store.key("alice"), "dubbing:rate:alice");
    }
}
