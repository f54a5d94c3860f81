//! The resilient per-chain JSON-RPC client.
//!
//! Call algorithm:
//! ```text
//! public pool (round-robin, health-gated, per-endpoint retries)
//!   → dedicated fallback → config fallback → network default
//!   → AllEndpointsFailed
//! ```
//! A deterministic error (revert, invalid params) ends the call at the
//! endpoint that produced it; rate limits rotate immediately; everything
//! else is retried in place, then rotated.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::batch::{build_batch, order_batch_responses};
use crate::classify::FailureKind;
use crate::config::ClientConfig;
use crate::error::{AllEndpointsFailedError, EndpointFailure, RpcError, TransportError};
use crate::fallback::FallbackCandidates;
use crate::health::{EndpointHealth, HealthTracker};
use crate::request::{JsonRpcRequest, RpcCall};
use crate::retry::RetryPolicy;
use crate::rotation::Rotation;
use crate::source::{ChainRegistry, EndpointSource, RemoteSettings};
use crate::telemetry::{
    ErrorEvent, FallbackEvent, RateLimitEvent, SuccessEvent, Telemetry,
};
use crate::transport::{Connector, RpcTransport};

/// Result of `call_with_metadata`: the value plus where and how fast it came back.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcCallResult<T> {
    pub result: T,
    pub endpoint: String,
    pub latency_ms: u64,
}

/// Collaborators every client needs. Cheap to clone.
#[derive(Clone)]
pub struct ClientContext {
    pub endpoints: Arc<dyn EndpointSource>,
    pub chains: Arc<dyn ChainRegistry>,
    pub remote_settings: Option<Arc<dyn RemoteSettings>>,
    pub connector: Arc<dyn Connector>,
}

impl ClientContext {
    pub fn new(
        endpoints: Arc<dyn EndpointSource>,
        chains: Arc<dyn ChainRegistry>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            endpoints,
            chains,
            remote_settings: None,
            connector,
        }
    }

    pub fn with_remote_settings(mut self, settings: Arc<dyn RemoteSettings>) -> Self {
        self.remote_settings = Some(settings);
        self
    }
}

impl std::fmt::Debug for ClientContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientContext")
            .field("remote_settings", &self.remote_settings.is_some())
            .finish_non_exhaustive()
    }
}

/// What one attempt sends.
enum Payload<'a> {
    Single { method: &'a str, params: &'a [Value] },
    Batch(&'a [RpcCall]),
}

impl Payload<'_> {
    fn method(&self) -> &str {
        match self {
            Self::Single { method, .. } => method,
            Self::Batch(_) => "batch",
        }
    }
}

/// A successful attempt.
struct Completed {
    value: Value,
    endpoint: String,
    latency_ms: u64,
}

/// How an endpoint slot ended without success.
enum SlotOutcome {
    /// Give up on this endpoint and move on.
    Exhausted(TransportError),
    /// Deterministic failure: abort the whole call.
    Abort(TransportError),
}

/// Last error per attempted endpoint, in first-attempt order.
#[derive(Default)]
struct Failures {
    errors: Vec<EndpointFailure>,
}

impl Failures {
    fn record(&mut self, endpoint: &str, error: TransportError) {
        match self.errors.iter_mut().find(|f| f.endpoint == endpoint) {
            Some(existing) => existing.error = error,
            None => self.errors.push(EndpointFailure {
                endpoint: endpoint.to_string(),
                error,
            }),
        }
    }
}

/// Resilient JSON-RPC client for one chain.
///
/// Owns the health records and rotation cursor for its public pool. Share
/// one instance per chain (see [`crate::ClientRegistry`]) so that every
/// call site sees the same circuit-breaker view.
pub struct RpcClient {
    chain_id: u64,
    config: ClientConfig,
    endpoints: Vec<String>,
    dedicated_fallback: Option<String>,
    context: ClientContext,
    transports: Mutex<HashMap<String, Arc<dyn RpcTransport>>>,
    health: HealthTracker,
    rotation: Rotation,
    next_id: AtomicU64,
    retry: RetryPolicy,
    telemetry: Telemetry,
}

impl RpcClient {
    /// Build a client for `config.chain_id`.
    ///
    /// The public pool is the configured custom list if present, otherwise
    /// the catalog's list for the chain. An empty pool is allowed; calls
    /// then go straight to the fallback chain.
    pub fn new(config: ClientConfig, context: ClientContext) -> Self {
        let chain_id = config.chain_id;
        let endpoints = match config.custom_endpoints() {
            Some(custom) => custom.to_vec(),
            None => context.endpoints.endpoints_for(chain_id),
        };
        let dedicated_fallback = if config.use_dedicated_fallback {
            context.endpoints.dedicated_fallback_for(chain_id)
        } else {
            None
        };
        tracing::debug!(
            chain_id,
            endpoints = endpoints.len(),
            dedicated = dedicated_fallback.is_some(),
            "rpc client created"
        );
        Self {
            chain_id,
            health: HealthTracker::new(config.unhealthy_cooldown),
            retry: RetryPolicy::new(config.retry_backoff.clone()),
            telemetry: Telemetry::new(config.telemetry.clone()),
            config,
            endpoints,
            dedicated_fallback,
            context,
            transports: Mutex::new(HashMap::new()),
            rotation: Rotation::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The public endpoint pool, in rotation order.
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Health records for the public pool, in pool order.
    pub fn health_snapshot(&self) -> Vec<EndpointHealth> {
        self.health.snapshot(&self.endpoints)
    }

    pub fn health(&self) -> &HealthTracker {
        &self.health
    }

    /// Forget all failures and rewind the rotation cursor.
    pub fn reset_health(&self) {
        self.health.reset();
        self.rotation.reset();
    }

    /// Call `method` and decode the result into `T`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, RpcError> {
        Ok(self.call_with_metadata(method, params).await?.result)
    }

    /// Like [`call`](Self::call) but also reports the serving endpoint and latency.
    pub async fn call_with_metadata<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<RpcCallResult<T>, RpcError> {
        let attempts = self.config.max_retries_per_endpoint.max(1);
        let done = self
            .execute(Payload::Single { method, params: &params }, attempts)
            .await?;
        Ok(RpcCallResult {
            result: serde_json::from_value(done.value).map_err(RpcError::Decode)?,
            endpoint: done.endpoint,
            latency_ms: done.latency_ms,
        })
    }

    /// Send `calls` as one JSON-RPC batch; results come back in input order.
    ///
    /// Endpoints get a single attempt each (no in-place retry).
    pub async fn batch_call(&self, calls: Vec<RpcCall>) -> Result<Vec<Value>, RpcError> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }
        let done = self.execute(Payload::Batch(&calls), 1).await?;
        match done.value {
            Value::Array(results) => Ok(results),
            other => Ok(vec![other]),
        }
    }

    async fn execute(&self, payload: Payload<'_>, attempts: u32) -> Result<Completed, RpcError> {
        let mut failures = Failures::default();
        let mut tried: HashSet<String> = HashSet::new();

        for _ in 0..self.endpoints.len() {
            let Some(endpoint) = self
                .rotation
                .next_healthy_endpoint(&self.endpoints, &self.health)
            else {
                break;
            };
            if !tried.insert(endpoint.to_string()) {
                continue;
            }
            match self.run_slot(endpoint, &payload, attempts).await {
                Ok(done) => return Ok(done),
                Err(SlotOutcome::Abort(error)) => return Err(into_caller_error(error)),
                Err(SlotOutcome::Exhausted(error)) => failures.record(endpoint, error),
            }
        }

        if !self.endpoints.is_empty() {
            tracing::info!(
                chain_id = self.chain_id,
                method = payload.method(),
                "public endpoints exhausted, trying fallbacks"
            );
        }
        self.run_fallbacks(&payload, &tried, failures).await
    }

    /// Up to `attempts` tries against one public endpoint.
    async fn run_slot(
        &self,
        endpoint: &str,
        payload: &Payload<'_>,
        attempts: u32,
    ) -> Result<Completed, SlotOutcome> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let error = match self.attempt(endpoint, payload).await {
                Ok(done) => {
                    self.health.record_success(endpoint);
                    return Ok(done);
                }
                Err(error) => error,
            };

            let kind = FailureKind::classify(&error);
            match kind {
                FailureKind::Deterministic(code) => {
                    tracing::debug!(url = endpoint, code, error = %error, "deterministic error, aborting call");
                    return Err(SlotOutcome::Abort(error));
                }
                FailureKind::RateLimited => {
                    self.health.record_failure(endpoint);
                    tracing::warn!(url = endpoint, chain_id = self.chain_id, "rate limited, rotating");
                    self.telemetry.rate_limit(RateLimitEvent {
                        chain_id: self.chain_id,
                        endpoint,
                    });
                    return Err(SlotOutcome::Exhausted(error));
                }
                _ if attempt < attempts => {
                    let delay = self.retry.next_delay(attempt);
                    tracing::debug!(
                        url = endpoint,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying request"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                _ => {
                    self.health.record_failure(endpoint);
                    tracing::debug!(url = endpoint, attempt, error = %error, "endpoint exhausted");
                    return Err(SlotOutcome::Exhausted(error));
                }
            }
        }
    }

    async fn run_fallbacks(
        &self,
        payload: &Payload<'_>,
        tried: &HashSet<String>,
        mut failures: Failures,
    ) -> Result<Completed, RpcError> {
        let candidates = FallbackCandidates {
            dedicated: self.dedicated_fallback.clone(),
            config: self
                .context
                .remote_settings
                .as_ref()
                .and_then(|s| s.config_rpc_endpoint(self.chain_id)),
            network_default: self.context.chains.default_rpc_url(self.chain_id),
        };

        for target in candidates.plan(&self.endpoints, tried) {
            tracing::info!(
                chain_id = self.chain_id,
                tier = %target.tier,
                url = %target.url,
                "trying fallback endpoint"
            );
            self.telemetry.fallback(FallbackEvent {
                chain_id: self.chain_id,
                tier: target.tier,
                endpoint: &target.url,
            });
            match self.attempt(&target.url, payload).await {
                Ok(done) => return Ok(done),
                Err(error) => failures.record(&target.url, error),
            }
        }

        tracing::warn!(
            chain_id = self.chain_id,
            method = payload.method(),
            attempted = failures.errors.len(),
            "all endpoints failed"
        );
        Err(AllEndpointsFailedError {
            chain_id: self.chain_id,
            errors: failures.errors,
        }
        .into())
    }

    /// One timed request. Emits success/error telemetry; touches no health state.
    async fn attempt(&self, endpoint: &str, payload: &Payload<'_>) -> Result<Completed, TransportError> {
        let started = Instant::now();
        let outcome = self.send_payload(endpoint, payload).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(value) => {
                tracing::debug!(url = endpoint, method = payload.method(), latency_ms, "rpc ok");
                self.telemetry.success(SuccessEvent {
                    chain_id: self.chain_id,
                    endpoint,
                    method: payload.method(),
                    latency_ms,
                });
                Ok(Completed {
                    value,
                    endpoint: endpoint.to_string(),
                    latency_ms,
                })
            }
            Err(error) => {
                self.telemetry.error(ErrorEvent {
                    chain_id: self.chain_id,
                    endpoint,
                    method: payload.method(),
                    kind: FailureKind::classify(&error),
                    error: &error,
                });
                Err(error)
            }
        }
    }

    async fn send_payload(&self, endpoint: &str, payload: &Payload<'_>) -> Result<Value, TransportError> {
        let transport = self.transport(endpoint)?;
        let timeout = self.config.request_timeout;
        let timed_out = || TransportError::Timeout {
            ms: timeout.as_millis() as u64,
        };

        match payload {
            Payload::Single { method, params } => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let req = JsonRpcRequest::new(id, *method, params.to_vec());
                let resp = tokio::time::timeout(timeout, transport.send(req))
                    .await
                    .map_err(|_| timed_out())??;
                resp.into_result().map_err(TransportError::Rpc)
            }
            Payload::Batch(calls) => {
                let reqs = build_batch(calls);
                let responses = tokio::time::timeout(timeout, transport.send_batch(reqs))
                    .await
                    .map_err(|_| timed_out())??;
                order_batch_responses(responses, calls.len()).map(Value::Array)
            }
        }
    }

    fn transport(&self, url: &str) -> Result<Arc<dyn RpcTransport>, TransportError> {
        let mut transports = self.transports.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(transport) = transports.get(url) {
            return Ok(transport.clone());
        }
        let transport = self.context.connector.connect(url, &self.config.headers)?;
        transports.insert(url.to_string(), transport.clone());
        Ok(transport)
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("chain_id", &self.chain_id)
            .field("endpoints", &self.endpoints)
            .field("dedicated_fallback", &self.dedicated_fallback)
            .finish_non_exhaustive()
    }
}

/// Map a failed attempt to what the caller sees.
pub(crate) fn into_caller_error(error: TransportError) -> RpcError {
    match error {
        TransportError::Rpc(err) => RpcError::Rpc(err),
        other => RpcError::Transport(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryConfig;
    use crate::source::StaticEndpoints;
    use crate::testing::{MockNetwork, Reply};
    use serde_json::json;
    use std::time::Duration;

    const A: &str = "https://a.example";
    const B: &str = "https://b.example";

    fn client(net: &MockNetwork, config: ClientConfig) -> RpcClient {
        let table = Arc::new(StaticEndpoints::new().with_public(1, [A, B]));
        let context = ClientContext::new(table.clone(), table, Arc::new(net.clone()));
        RpcClient::new(config.with_retry_backoff(RetryConfig::none()), context)
    }

    #[tokio::test]
    async fn success_on_first_endpoint() {
        let net = MockNetwork::new();
        net.always(A, Reply::result(json!("0x10")));
        let c = client(&net, ClientConfig::for_chain(1));

        let res: RpcCallResult<String> = c.call_with_metadata("eth_blockNumber", vec![]).await.unwrap();
        assert_eq!(res.result, "0x10");
        assert_eq!(res.endpoint, A);
        assert_eq!(net.contacted(), [A]);
    }

    #[tokio::test]
    async fn request_ids_increase_across_calls() {
        let net = MockNetwork::new();
        net.always(A, Reply::result(json!("0x1")));
        net.always(B, Reply::result(json!("0x1")));
        let c = client(&net, ClientConfig::for_chain(1));
        for _ in 0..3 {
            let _: String = c.call("eth_chainId", vec![]).await.unwrap();
        }
        assert_eq!(net.request_ids(), [1, 2, 3]);
    }

    #[tokio::test]
    async fn retryable_error_retries_same_endpoint() {
        let net = MockNetwork::new();
        net.reply(A, Reply::rpc_error(-32603, "internal error"));
        net.reply(A, Reply::result(json!("0x2")));
        let c = client(&net, ClientConfig::for_chain(1).with_max_retries_per_endpoint(2));

        let value: String = c.call("eth_blockNumber", vec![]).await.unwrap();
        assert_eq!(value, "0x2");
        assert_eq!(net.contacted(), [A, A]);
        assert!(c.health().get(A).is_healthy);
    }

    #[tokio::test]
    async fn exhausted_endpoint_counts_one_failure_and_rotates() {
        let net = MockNetwork::new();
        net.always(A, Reply::status(502));
        net.always(B, Reply::result(json!("0x3")));
        let c = client(&net, ClientConfig::for_chain(1).with_max_retries_per_endpoint(2));

        let value: String = c.call("eth_blockNumber", vec![]).await.unwrap();
        assert_eq!(value, "0x3");
        assert_eq!(net.contacted(), [A, A, B]);
        assert_eq!(c.health().get(A).consecutive_failures, 1);
    }

    #[tokio::test]
    async fn timeout_is_retryable() {
        let net = MockNetwork::new();
        net.reply(A, Reply::hang());
        net.always(B, Reply::result(json!("0x4")));
        let c = client(
            &net,
            ClientConfig::for_chain(1).with_timeout(Duration::from_millis(20)),
        );
        let res: RpcCallResult<String> = c.call_with_metadata("eth_blockNumber", vec![]).await.unwrap();
        assert_eq!(res.endpoint, B);
    }

    #[tokio::test]
    async fn decode_error_is_reported() {
        let net = MockNetwork::new();
        net.always(A, Reply::result(json!("not a number")));
        let c = client(&net, ClientConfig::for_chain(1));
        let err = c.call::<u64>("eth_blockNumber", vec![]).await.unwrap_err();
        assert!(matches!(err, RpcError::Decode(_)));
    }

    #[tokio::test]
    async fn empty_batch_skips_network() {
        let net = MockNetwork::new();
        let c = client(&net, ClientConfig::for_chain(1));
        assert!(c.batch_call(vec![]).await.unwrap().is_empty());
        assert!(net.contacted().is_empty());
    }

    #[tokio::test]
    async fn reset_health_restores_pool() {
        let net = MockNetwork::new();
        net.always(A, Reply::network("refused"));
        net.always(B, Reply::network("refused"));
        let c = client(&net, ClientConfig::for_chain(1));
        for _ in 0..2 {
            let _ = c.call::<String>("eth_chainId", vec![]).await;
        }
        assert!(c.health_snapshot().iter().all(|h| !h.is_healthy));

        c.reset_health();
        assert!(c.health_snapshot().iter().all(|h| h.is_healthy && h.consecutive_failures == 0));
    }
}
