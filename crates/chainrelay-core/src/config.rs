//! Client configuration.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::RetryConfig;
use crate::telemetry::TelemetryHooks;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_RETRIES_PER_ENDPOINT: u32 = 1;
pub const DEFAULT_UNHEALTHY_COOLDOWN: Duration = Duration::from_secs(60);

/// Configuration for one `RpcClient`.
#[derive(Clone)]
pub struct ClientConfig {
    pub chain_id: u64,
    /// Replaces the catalog's public pool when set and non-empty.
    pub endpoints: Option<Vec<String>>,
    /// Try the dedicated per-chain fallback once the public pool is exhausted.
    pub use_dedicated_fallback: bool,
    /// Upper bound on each individual HTTP attempt.
    pub request_timeout: Duration,
    /// Attempts per endpoint before rotating (1 = no in-place retry).
    pub max_retries_per_endpoint: u32,
    /// How long an unhealthy endpoint sits out before it is reconsidered.
    pub unhealthy_cooldown: Duration,
    pub retry_backoff: RetryConfig,
    /// Extra HTTP headers sent with every request.
    pub headers: Vec<(String, String)>,
    pub telemetry: Option<Arc<dyn TelemetryHooks>>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            endpoints: None,
            use_dedicated_fallback: true,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retries_per_endpoint: DEFAULT_MAX_RETRIES_PER_ENDPOINT,
            unhealthy_cooldown: DEFAULT_UNHEALTHY_COOLDOWN,
            retry_backoff: RetryConfig::default(),
            headers: Vec::new(),
            telemetry: None,
        }
    }
}

impl ClientConfig {
    pub fn for_chain(chain_id: u64) -> Self {
        Self {
            chain_id,
            ..Default::default()
        }
    }

    pub fn with_endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.endpoints = Some(endpoints.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_dedicated_fallback(mut self, enabled: bool) -> Self {
        self.use_dedicated_fallback = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_retries_per_endpoint(mut self, attempts: u32) -> Self {
        self.max_retries_per_endpoint = attempts;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.unhealthy_cooldown = cooldown;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: RetryConfig) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_telemetry(mut self, hooks: Arc<dyn TelemetryHooks>) -> Self {
        self.telemetry = Some(hooks);
        self
    }

    /// Custom endpoints, if any were configured.
    pub fn custom_endpoints(&self) -> Option<&[String]> {
        self.endpoints
            .as_deref()
            .filter(|endpoints| !endpoints.is_empty())
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("chain_id", &self.chain_id)
            .field("endpoints", &self.endpoints)
            .field("use_dedicated_fallback", &self.use_dedicated_fallback)
            .field("request_timeout", &self.request_timeout)
            .field("max_retries_per_endpoint", &self.max_retries_per_endpoint)
            .field("unhealthy_cooldown", &self.unhealthy_cooldown)
            .field("retry_backoff", &self.retry_backoff)
            .field("headers", &self.headers.len())
            .field("telemetry", &self.telemetry.is_some())
            .finish()
    }
}

/// File-loadable subset of [`ClientConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSettings {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries_per_endpoint: u32,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    #[serde(default = "bool_true")]
    pub use_dedicated_fallback: bool,
    /// Custom public pool; empty = use the built-in catalog.
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_timeout_ms() -> u64 { DEFAULT_REQUEST_TIMEOUT.as_millis() as u64 }
fn default_max_retries() -> u32 { DEFAULT_MAX_RETRIES_PER_ENDPOINT }
fn default_cooldown_ms() -> u64 { DEFAULT_UNHEALTHY_COOLDOWN.as_millis() as u64 }
fn bool_true() -> bool { true }

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_retries_per_endpoint: default_max_retries(),
            cooldown_ms: default_cooldown_ms(),
            use_dedicated_fallback: true,
            endpoints: Vec::new(),
            headers: BTreeMap::new(),
        }
    }
}

impl ClientSettings {
    pub fn into_config(self, chain_id: u64) -> ClientConfig {
        ClientConfig {
            chain_id,
            endpoints: (!self.endpoints.is_empty()).then_some(self.endpoints),
            use_dedicated_fallback: self.use_dedicated_fallback,
            request_timeout: Duration::from_millis(self.timeout_ms),
            max_retries_per_endpoint: self.max_retries_per_endpoint,
            unhealthy_cooldown: Duration::from_millis(self.cooldown_ms),
            headers: self.headers.into_iter().collect(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.request_timeout, Duration::from_secs(10));
        assert_eq!(cfg.max_retries_per_endpoint, 1);
        assert_eq!(cfg.unhealthy_cooldown, Duration::from_secs(60));
        assert!(cfg.use_dedicated_fallback);
        assert!(cfg.custom_endpoints().is_none());
    }

    #[test]
    fn empty_custom_list_means_catalog() {
        let cfg = ClientConfig::for_chain(10).with_endpoints(Vec::<String>::new());
        assert!(cfg.custom_endpoints().is_none());
        let cfg = cfg.with_endpoints(["https://x"]);
        assert_eq!(cfg.custom_endpoints(), Some(&["https://x".to_string()][..]));
    }

    #[test]
    fn settings_fill_defaults() {
        let settings: ClientSettings =
            serde_json::from_str(r#"{"timeout_ms": 2500, "headers": {"x-api-key": "k"}}"#).unwrap();
        assert_eq!(settings.max_retries_per_endpoint, 1);
        assert!(settings.use_dedicated_fallback);

        let cfg = settings.into_config(137);
        assert_eq!(cfg.chain_id, 137);
        assert_eq!(cfg.request_timeout, Duration::from_millis(2500));
        assert_eq!(cfg.unhealthy_cooldown, Duration::from_secs(60));
        assert_eq!(cfg.headers, vec![("x-api-key".to_string(), "k".to_string())]);
        assert!(cfg.endpoints.is_none());
    }
}
