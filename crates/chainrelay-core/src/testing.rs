//! Scripted in-memory network for tests.
//!
//! [`MockNetwork`] is a [`Connector`] whose transports answer from per-URL
//! scripts and record every request they receive.
//!
//! ```rust
//! use chainrelay_core::testing::{MockNetwork, Reply};
//! use serde_json::json;
//!
//! let net = MockNetwork::new();
//! net.reply("https://a", Reply::rate_limited());      // first request only
//! net.always("https://a", Reply::result(json!("0x1"))); // every request after
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;
use crate::request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::transport::{Connector, RpcTransport};

/// Canned outcome for one request.
#[derive(Debug, Clone)]
pub enum Reply {
    Result(Value),
    RpcError(JsonRpcError),
    Status(u16),
    RateLimited,
    Network(String),
    /// Never answers; only a client-side timeout ends the request.
    Hang,
    Batch(Vec<JsonRpcResponse>),
}

impl Reply {
    pub fn result(value: Value) -> Self {
        Self::Result(value)
    }

    pub fn rpc_error(code: i64, message: &str) -> Self {
        Self::RpcError(JsonRpcError::new(code, message))
    }

    pub fn status(status: u16) -> Self {
        Self::Status(status)
    }

    pub fn rate_limited() -> Self {
        Self::RateLimited
    }

    pub fn network(message: &str) -> Self {
        Self::Network(message.to_string())
    }

    pub fn hang() -> Self {
        Self::Hang
    }

    pub fn batch(responses: Vec<JsonRpcResponse>) -> Self {
        Self::Batch(responses)
    }
}

/// One request received by the mock network.
#[derive(Debug, Clone)]
pub struct Hit {
    pub url: String,
    pub requests: Vec<JsonRpcRequest>,
    pub batch: bool,
}

#[derive(Default)]
struct Inner {
    queued: HashMap<String, VecDeque<Reply>>,
    defaults: HashMap<String, Reply>,
    hits: Vec<Hit>,
}

/// Shared handle; clones observe the same scripts and log.
#[derive(Clone, Default)]
pub struct MockNetwork {
    inner: Arc<Mutex<Inner>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a one-shot reply for `url`; queued replies are used before the default.
    pub fn reply(&self, url: &str, reply: Reply) {
        self.inner()
            .queued
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Reply used for `url` whenever its queue is empty.
    pub fn always(&self, url: &str, reply: Reply) {
        self.inner().defaults.insert(url.to_string(), reply);
    }

    /// URLs contacted, one entry per HTTP request, in order.
    pub fn contacted(&self) -> Vec<String> {
        self.inner().hits.iter().map(|h| h.url.clone()).collect()
    }

    /// Number of HTTP requests sent to `url`.
    pub fn hits(&self, url: &str) -> usize {
        self.inner().hits.iter().filter(|h| h.url == url).count()
    }

    /// Ids of single (non-batch) requests, in order.
    pub fn request_ids(&self) -> Vec<u64> {
        self.inner()
            .hits
            .iter()
            .filter(|h| !h.batch)
            .filter_map(|h| h.requests.first().and_then(|r| r.id.as_u64()))
            .collect()
    }

    /// Full request log.
    pub fn log(&self) -> Vec<Hit> {
        self.inner().hits.clone()
    }

    /// The most recent single request, if any.
    pub fn last_request(&self) -> Option<JsonRpcRequest> {
        self.inner()
            .hits
            .iter()
            .rev()
            .find(|h| !h.batch)
            .and_then(|h| h.requests.first().cloned())
    }

    fn next_reply(&self, url: &str, requests: Vec<JsonRpcRequest>, batch: bool) -> Reply {
        let mut inner = self.inner();
        inner.hits.push(Hit {
            url: url.to_string(),
            requests,
            batch,
        });
        if let Some(reply) = inner.queued.get_mut(url).and_then(VecDeque::pop_front) {
            return reply;
        }
        inner
            .defaults
            .get(url)
            .cloned()
            .unwrap_or_else(|| Reply::Network(format!("no mock reply scripted for {url}")))
    }
}

impl Connector for MockNetwork {
    fn connect(
        &self,
        url: &str,
        _headers: &[(String, String)],
    ) -> Result<Arc<dyn RpcTransport>, TransportError> {
        Ok(Arc::new(MockTransport {
            url: url.to_string(),
            net: self.clone(),
        }))
    }
}

struct MockTransport {
    url: String,
    net: MockNetwork,
}

impl MockTransport {
    async fn fail(&self, reply: Reply) -> TransportError {
        match reply {
            Reply::Status(429) | Reply::RateLimited => TransportError::RateLimited {
                provider: self.url.clone(),
            },
            Reply::Status(status) => TransportError::HttpStatus {
                status,
                body: String::new(),
            },
            Reply::Network(msg) => TransportError::Http(msg),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3_600)).await;
                TransportError::Other("mock hang elapsed".into())
            }
            other => TransportError::Other(format!("reply {other:?} does not fit this request")),
        }
    }
}

#[async_trait]
impl RpcTransport for MockTransport {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let id = req.id.as_u64().unwrap_or(0);
        match self.net.next_reply(&self.url, vec![req], false) {
            Reply::Result(value) => Ok(JsonRpcResponse::success(id, value)),
            Reply::RpcError(err) => Ok(JsonRpcResponse::failure(id, err)),
            other => Err(self.fail(other).await),
        }
    }

    async fn send_batch(
        &self,
        reqs: Vec<JsonRpcRequest>,
    ) -> Result<Vec<JsonRpcResponse>, TransportError> {
        let ids: Vec<u64> = reqs.iter().map(|r| r.id.as_u64().unwrap_or(0)).collect();
        match self.net.next_reply(&self.url, reqs, true) {
            Reply::Batch(responses) => Ok(responses),
            Reply::Result(value) => Ok(ids
                .into_iter()
                .map(|id| JsonRpcResponse::success(id, value.clone()))
                .collect()),
            Reply::RpcError(err) => Ok(ids
                .into_iter()
                .map(|id| JsonRpcResponse::failure(id, err.clone()))
                .collect()),
            other => Err(self.fail(other).await),
        }
    }

    fn url(&self) -> &str {
        &self.url
    }
}
