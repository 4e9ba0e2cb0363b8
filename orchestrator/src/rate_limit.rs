use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use common::config::AppConfig;
use common::error::AppError;

/// Atomic "increment and set expiry" over a shared counter, keyed by an
/// opaque string the caller builds from `(client_id, window)`. Implementors
/// need not share state across instances; the fixed-window policy above
/// this trait only requires atomicity within one.
#[async_trait]
pub trait RateLimiterStore: Send + Sync {
    async fn incr_and_expire(&self, key: &str, window_seconds: u64) -> Result<u64, AppError>;
}

/// Per-process fallback store: a mutex-guarded map from key to
/// `(count, window_start_unix_secs)`. No cross-instance fairness, but
/// correct within one process, which is what the fixed-window policy needs
/// once the shared backing store (§4.7's "pooled-connection store for a
/// shared cache service") degrades to this on construction failure.
///
/// No such shared store ships in this build: no cache-service client crate
/// is part of the dependency stack, so `RateLimiterStore` currently has one
/// implementation and the "sticky fallback" is permanent rather than a
/// runtime degrade path.
#[derive(Default)]
pub struct InMemoryLimiterStore {
    counters: Mutex<HashMap<String, (u64, u64)>>,
}

impl InMemoryLimiterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimiterStore for InMemoryLimiterStore {
    async fn incr_and_expire(&self, key: &str, window_seconds: u64) -> Result<u64, AppError> {
        let now = now_unix_secs();
        let mut counters = self
            .counters
            .lock()
            .map_err(|_| AppError::RateLimit("rate limiter store lock poisoned".into()))?;

        let entry = counters.entry(key.to_string()).or_insert((0, now));
        if now.saturating_sub(entry.1) > window_seconds {
            *entry = (0, now);
        }
        entry.0 = entry.0.saturating_add(1);
        Ok(entry.0)
    }
}

fn now_unix_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

const UNKNOWN_CLIENT: &str = "unknown";

/// Fixed-window admission control in front of the orchestrator. `window_key`
/// buckets time into `window_seconds`-wide slices so the backing store only
/// ever needs a plain counter per `(client_id, window_key)`.
pub struct RateLimiter {
    store: Box<dyn RateLimiterStore>,
    limit: u32,
    window_seconds: u64,
}

impl RateLimiter {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            store: Box::new(InMemoryLimiterStore::new()),
            limit: config.rate_limit_requests,
            window_seconds: config.rate_limit_window,
        }
    }

    /// Returns `Ok(true)` when the request is admitted. Backing-store errors
    /// fail open (§4.7): the request is admitted and the failure is logged.
    pub async fn admit(&self, client_id: Option<&str>) -> bool {
        let client_id = client_id.unwrap_or(UNKNOWN_CLIENT);
        let window_key = now_unix_secs() / self.window_seconds.max(1);
        let key = format!("{client_id}:{window_key}");

        match self.store.incr_and_expire(&key, self.window_seconds).await {
            Ok(count) => count <= u64::from(self.limit),
            Err(err) => {
                tracing::warn!(error = %err, client_id, "rate limiter store failed, failing open");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn admits_up_to_the_configured_limit() {
        let mut config = AppConfig::default();
        config.rate_limit_requests = 2;
        config.rate_limit_window = 60;
        let limiter = RateLimiter::from_config(&config);

        assert!(limiter.admit(Some("client-a")).await);
        assert!(limiter.admit(Some("client-a")).await);
        assert!(!limiter.admit(Some("client-a")).await);
    }

    #[tokio::test]
    async fn separate_clients_have_independent_windows() {
        let mut config = AppConfig::default();
        config.rate_limit_requests = 1;
        config.rate_limit_window = 60;
        let limiter = RateLimiter::from_config(&config);

        assert!(limiter.admit(Some("client-a")).await);
        assert!(limiter.admit(Some("client-b")).await);
    }

    #[tokio::test]
    async fn unknown_client_id_shares_one_bucket() {
        let mut config = AppConfig::default();
        config.rate_limit_requests = 1;
        config.rate_limit_window = 60;
        let limiter = RateLimiter::from_config(&config);

        assert!(limiter.admit(None).await);
        assert!(!limiter.admit(None).await);
    }
}
