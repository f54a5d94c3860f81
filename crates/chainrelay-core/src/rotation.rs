//! Round-robin endpoint selection over a health tracker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crate::health::HealthTracker;

/// Circular cursor over an endpoint list.
///
/// The cursor advances by exactly one per selection whatever the health
/// outcome, so repeated calls spread across the pool. Concurrent callers
/// share the cursor; fairness between them is best-effort.
#[derive(Debug, Default)]
pub struct Rotation {
    cursor: AtomicUsize,
}

impl Rotation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the next endpoint to try.
    ///
    /// Starting at the cursor, each candidate gets the lazy recovery check
    /// and the first healthy one is returned. If the whole list is unhealthy
    /// the first endpoint is returned anyway: serving a request against a
    /// cooling-down endpoint is better than refusing it outright.
    /// Returns `None` only for an empty list.
    pub fn next_healthy_endpoint<'a>(
        &self,
        endpoints: &'a [String],
        health: &HealthTracker,
    ) -> Option<&'a str> {
        self.next_healthy_endpoint_at(endpoints, health, Instant::now())
    }

    pub fn next_healthy_endpoint_at<'a>(
        &self,
        endpoints: &'a [String],
        health: &HealthTracker,
        now: Instant,
    ) -> Option<&'a str> {
        if endpoints.is_empty() {
            return None;
        }
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % endpoints.len();
        for i in 0..endpoints.len() {
            let url = &endpoints[(start + i) % endpoints.len()];
            if health.check_recovery(url, now) {
                return Some(url);
            }
        }
        tracing::debug!(
            endpoints = endpoints.len(),
            "no healthy endpoint, degrading to first in pool"
        );
        endpoints.first().map(String::as_str)
    }

    /// Rewind the cursor to the start of the list.
    pub fn reset(&self) {
        self.cursor.store(0, Ordering::Relaxed);
    }
}
