//! Per-endpoint health: Healthy → Unhealthy → Healthy.
//!
//! State transitions:
//! - `Healthy` → `Unhealthy`: consecutive failures reach [`UNHEALTHY_AFTER_FAILURES`]
//! - `Unhealthy` → `Healthy`: the endpoint is re-examined after the cooldown
//! - any → `Healthy`:         a request to the endpoint succeeds
//!
//! There are no timers. Recovery is evaluated lazily by the rotation
//! selector when it next considers the endpoint.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Consecutive failures after which an endpoint is taken out of rotation.
pub const UNHEALTHY_AFTER_FAILURES: u32 = 2;

/// Coarse health state of one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Healthy,
    Unhealthy { failed_at: Instant },
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Unhealthy { failed_at } => {
                write!(f, "unhealthy ({}s ago)", failed_at.elapsed().as_secs())
            }
        }
    }
}

/// Health record for one endpoint.
///
/// Invariant: `is_healthy == false` implies `failed_at.is_some()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointHealth {
    pub url: String,
    pub consecutive_failures: u32,
    pub is_healthy: bool,
    pub failed_at: Option<Instant>,
}

impl EndpointHealth {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            consecutive_failures: 0,
            is_healthy: true,
            failed_at: None,
        }
    }

    pub fn state(&self) -> HealthState {
        match (self.is_healthy, self.failed_at) {
            (false, Some(failed_at)) => HealthState::Unhealthy { failed_at },
            _ => HealthState::Healthy,
        }
    }

    fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.is_healthy = true;
        self.failed_at = None;
    }
}

/// Health records for every endpoint a client has touched.
///
/// Records are created lazily in the fresh-healthy state.
#[derive(Debug)]
pub struct HealthTracker {
    cooldown: Duration,
    records: Mutex<HashMap<String, EndpointHealth>>,
}

impl HealthTracker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            records: Mutex::new(HashMap::new()),
        }
    }

    fn records(&self) -> MutexGuard<'_, HashMap<String, EndpointHealth>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a successful request: back to fresh-healthy regardless of state.
    pub fn record_success(&self, url: &str) {
        let mut records = self.records();
        let record = records
            .entry(url.to_string())
            .or_insert_with(|| EndpointHealth::new(url));
        if !record.is_healthy {
            tracing::info!(url, "endpoint recovered after successful request");
        }
        record.reset();
    }

    /// Record a failed request. Returns `true` if this failure took the
    /// endpoint out of rotation.
    pub fn record_failure(&self, url: &str) -> bool {
        self.record_failure_at(url, Instant::now())
    }

    pub fn record_failure_at(&self, url: &str, now: Instant) -> bool {
        let mut records = self.records();
        let record = records
            .entry(url.to_string())
            .or_insert_with(|| EndpointHealth::new(url));
        record.consecutive_failures = record.consecutive_failures.saturating_add(1);
        if record.consecutive_failures < UNHEALTHY_AFTER_FAILURES {
            return false;
        }
        let was_healthy = record.is_healthy;
        record.is_healthy = false;
        record.failed_at = Some(now);
        if was_healthy {
            tracing::warn!(
                url,
                failures = record.consecutive_failures,
                "endpoint marked unhealthy"
            );
        }
        was_healthy
    }

    /// Lazy recovery check: if the endpoint is unhealthy and the cooldown
    /// has elapsed by `now`, reset it to healthy. Returns whether the
    /// endpoint is healthy after the check.
    pub fn check_recovery(&self, url: &str, now: Instant) -> bool {
        let mut records = self.records();
        let Some(record) = records.get_mut(url) else {
            return true;
        };
        if record.is_healthy {
            return true;
        }
        let cooled_down = record
            .failed_at
            .map_or(true, |failed_at| now.saturating_duration_since(failed_at) >= self.cooldown);
        if cooled_down {
            tracing::info!(url, "endpoint cooldown elapsed, returning to rotation");
            record.reset();
        }
        cooled_down
    }

    pub fn is_healthy(&self, url: &str) -> bool {
        self.records().get(url).map_or(true, |r| r.is_healthy)
    }

    /// Current record for `url` (fresh-healthy if never touched).
    pub fn get(&self, url: &str) -> EndpointHealth {
        self.records()
            .get(url)
            .cloned()
            .unwrap_or_else(|| EndpointHealth::new(url))
    }

    /// Records for `urls`, in the given order.
    pub fn snapshot(&self, urls: &[String]) -> Vec<EndpointHealth> {
        let records = self.records();
        urls.iter()
            .map(|url| {
                records
                    .get(url)
                    .cloned()
                    .unwrap_or_else(|| EndpointHealth::new(url.as_str()))
            })
            .collect()
    }

    /// Forget all failures.
    pub fn reset(&self) {
        self.records().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://a.example";

    fn tracker() -> HealthTracker {
        HealthTracker::new(Duration::from_secs(60))
    }

    #[test]
    fn starts_healthy() {
        let t = tracker();
        let rec = t.get(URL);
        assert!(rec.is_healthy);
        assert_eq!(rec.consecutive_failures, 0);
        assert_eq!(rec.failed_at, None);
        assert_eq!(rec.state(), HealthState::Healthy);
    }

    #[test]
    fn unhealthy_on_second_consecutive_failure() {
        let t = tracker();
        assert!(!t.record_failure(URL));
        assert!(t.is_healthy(URL));
        assert!(t.record_failure(URL));
        let rec = t.get(URL);
        assert!(!rec.is_healthy);
        assert!(rec.failed_at.is_some());
        assert_eq!(rec.consecutive_failures, 2);
        // Already unhealthy: further failures do not report a new transition.
        assert!(!t.record_failure(URL));
    }

    #[test]
    fn success_resets_everything() {
        let t = tracker();
        t.record_failure(URL);
        t.record_failure(URL);
        t.record_success(URL);
        let rec = t.get(URL);
        assert!(rec.is_healthy);
        assert_eq!(rec.consecutive_failures, 0);
        assert_eq!(rec.failed_at, None);
    }

    #[test]
    fn recovery_waits_for_cooldown() {
        let t = tracker();
        let failed_at = Instant::now();
        t.record_failure_at(URL, failed_at);
        t.record_failure_at(URL, failed_at);

        assert!(!t.check_recovery(URL, failed_at + Duration::from_secs(59)));
        assert!(!t.is_healthy(URL));

        assert!(t.check_recovery(URL, failed_at + Duration::from_secs(60)));
        let rec = t.get(URL);
        assert!(rec.is_healthy);
        assert_eq!(rec.consecutive_failures, 0);
    }

    #[test]
    fn snapshot_preserves_order_and_fills_fresh_records() {
        let t = tracker();
        t.record_failure("https://b");
        let snap = t.snapshot(&["https://a".to_string(), "https://b".to_string()]);
        assert_eq!(snap[0].url, "https://a");
        assert_eq!(snap[0].consecutive_failures, 0);
        assert_eq!(snap[1].consecutive_failures, 1);
    }
}
