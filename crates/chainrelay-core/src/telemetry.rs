//! Optional telemetry callbacks.
//!
//! Hooks observe the call algorithm; they never steer it. Each hook runs
//! synchronously under `catch_unwind`, and a panicking hook is logged and
//! otherwise ignored.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::classify::FailureKind;
use crate::error::TransportError;

/// Escalation level tried after the public pool is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FallbackTier {
    /// Dedicated per-chain fallback endpoint.
    Dedicated,
    /// Endpoint supplied by remote settings at call time.
    Config,
    /// Built-in network default endpoint.
    NetworkDefault,
}

impl std::fmt::Display for FallbackTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dedicated => write!(f, "dedicated"),
            Self::Config => write!(f, "config"),
            Self::NetworkDefault => write!(f, "network-default"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SuccessEvent<'a> {
    pub chain_id: u64,
    pub endpoint: &'a str,
    pub method: &'a str,
    pub latency_ms: u64,
}

#[derive(Debug)]
pub struct ErrorEvent<'a> {
    pub chain_id: u64,
    pub endpoint: &'a str,
    pub method: &'a str,
    pub kind: FailureKind,
    pub error: &'a TransportError,
}

#[derive(Debug, Clone)]
pub struct RateLimitEvent<'a> {
    pub chain_id: u64,
    pub endpoint: &'a str,
}

#[derive(Debug, Clone)]
pub struct FallbackEvent<'a> {
    pub chain_id: u64,
    pub tier: FallbackTier,
    pub endpoint: &'a str,
}

/// Fire-and-forget observers of call outcomes. All methods default to no-ops.
pub trait TelemetryHooks: Send + Sync {
    fn on_success(&self, _event: &SuccessEvent<'_>) {}
    fn on_error(&self, _event: &ErrorEvent<'_>) {}
    fn on_rate_limit(&self, _event: &RateLimitEvent<'_>) {}
    fn on_fallback(&self, _event: &FallbackEvent<'_>) {}
}

/// Guarded dispatcher around optional hooks.
#[derive(Clone, Default)]
pub(crate) struct Telemetry {
    hooks: Option<Arc<dyn TelemetryHooks>>,
}

impl Telemetry {
    pub(crate) fn new(hooks: Option<Arc<dyn TelemetryHooks>>) -> Self {
        Self { hooks }
    }

    fn emit(&self, hook: &'static str, f: impl FnOnce(&dyn TelemetryHooks)) {
        let Some(hooks) = &self.hooks else {
            return;
        };
        if panic::catch_unwind(AssertUnwindSafe(|| f(hooks.as_ref()))).is_err() {
            tracing::warn!(hook, "telemetry hook panicked; ignoring");
        }
    }

    pub(crate) fn success(&self, event: SuccessEvent<'_>) {
        self.emit("on_success", |h| h.on_success(&event));
    }

    pub(crate) fn error(&self, event: ErrorEvent<'_>) {
        self.emit("on_error", |h| h.on_error(&event));
    }

    pub(crate) fn rate_limit(&self, event: RateLimitEvent<'_>) {
        self.emit("on_rate_limit", |h| h.on_rate_limit(&event));
    }

    pub(crate) fn fallback(&self, event: FallbackEvent<'_>) {
        self.emit("on_fallback", |h| h.on_fallback(&event));
    }
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry")
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        successes: AtomicUsize,
    }

    impl TelemetryHooks for Counting {
        fn on_success(&self, _event: &SuccessEvent<'_>) {
            self.successes.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Panicking;

    impl TelemetryHooks for Panicking {
        fn on_rate_limit(&self, _event: &RateLimitEvent<'_>) {
            panic!("hook bug");
        }
    }

    #[test]
    fn dispatches_to_hooks() {
        let hooks = Arc::new(Counting::default());
        let telemetry = Telemetry::new(Some(hooks.clone()));
        telemetry.success(SuccessEvent {
            chain_id: 1,
            endpoint: "https://a",
            method: "eth_chainId",
            latency_ms: 3,
        });
        assert_eq!(hooks.successes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_hook_is_contained() {
        let telemetry = Telemetry::new(Some(Arc::new(Panicking)));
        telemetry.rate_limit(RateLimitEvent {
            chain_id: 1,
            endpoint: "https://a",
        });
    }

    #[test]
    fn missing_hooks_are_fine() {
        Telemetry::default().fallback(FallbackEvent {
            chain_id: 1,
            tier: FallbackTier::Dedicated,
            endpoint: "https://a",
        });
    }
}
