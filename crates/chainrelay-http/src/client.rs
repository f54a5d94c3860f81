//! HTTP JSON-RPC transport backed by `reqwest`.
//!
//! One POST per call, nothing more: retries, rotation and health tracking
//! belong to `chainrelay_core::RpcClient`. HTTP 429 is reported as
//! [`TransportError::RateLimited`] so the caller can rotate immediately.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use chainrelay_core::error::TransportError;
use chainrelay_core::request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use chainrelay_core::transport::{Connector, RpcTransport};

/// Longest response body echoed back inside an error.
const MAX_ERROR_BODY: usize = 512;

/// JSON-RPC over HTTP POST to a single URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    url: String,
    http: reqwest::Client,
    headers: HeaderMap,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport sharing `http`'s connection pool.
    pub fn new(
        url: impl Into<String>,
        http: reqwest::Client,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        Ok(Self {
            url: url.into(),
            http,
            headers: header_map(headers)?,
            timeout,
        })
    }

    async fn post<B: Serialize + ?Sized>(&self, body: &B) -> Result<String, TransportError> {
        let resp = self
            .http
            .post(&self.url)
            .headers(self.headers.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| self.request_error(e))?;
        if !status.is_success() {
            return Err(status_error(&self.url, status, text));
        }
        Ok(text)
    }

    fn request_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                ms: self.timeout.as_millis() as u64,
            }
        } else {
            TransportError::Http(err.to_string())
        }
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        tracing::trace!(url = %self.url, method = %req.method, id = %req.id, "POST");
        let body = self.post(&req).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// True HTTP batch: send all requests as a JSON array in one HTTP call.
    async fn send_batch(
        &self,
        reqs: Vec<JsonRpcRequest>,
    ) -> Result<Vec<JsonRpcResponse>, TransportError> {
        if reqs.is_empty() {
            return Ok(vec![]);
        }
        tracing::trace!(url = %self.url, items = reqs.len(), "POST batch");
        let body = self.post(&reqs).await?;
        decode_batch_body(&body)
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// Builds [`HttpTransport`]s that share one `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpConnector {
    /// Connector whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, timeout })
    }
}

impl Connector for HttpConnector {
    fn connect(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<Arc<dyn RpcTransport>, TransportError> {
        let transport = HttpTransport::new(url, self.http.clone(), headers, self.timeout)?;
        Ok(Arc::new(transport))
    }
}

fn header_map(headers: &[(String, String)]) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::Other(format!("invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::Other(format!("invalid value for header {name}: {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

fn status_error(url: &str, status: StatusCode, mut body: String) -> TransportError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return TransportError::RateLimited {
            provider: url.to_string(),
        };
    }
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    TransportError::HttpStatus {
        status: status.as_u16(),
        body,
    }
}

/// Decode a batch reply. Some gateways answer a whole batch with a single
/// error object (typically when throttling); that becomes an RPC error.
fn decode_batch_body(body: &str) -> Result<Vec<JsonRpcResponse>, TransportError> {
    match serde_json::from_str::<Value>(body)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(TransportError::from))
            .collect(),
        Value::Object(mut obj) => match obj.remove("error") {
            Some(err) => Err(TransportError::Rpc(serde_json::from_value::<JsonRpcError>(err)?)),
            None => Err(TransportError::Other(
                "expected a JSON array in reply to a batch request".into(),
            )),
        },
        other => Err(TransportError::Other(format!(
            "unexpected batch reply: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainrelay_core::request::RpcId;

    #[test]
    fn too_many_requests_is_rate_limited() {
        let err = status_error("https://a", StatusCode::TOO_MANY_REQUESTS, "slow".into());
        assert!(matches!(err, TransportError::RateLimited { provider } if provider == "https://a"));
    }

    #[test]
    fn other_statuses_keep_truncated_body() {
        let err = status_error("https://a", StatusCode::BAD_GATEWAY, "x".repeat(2_000));
        match err {
            TransportError::HttpStatus { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body.len(), MAX_ERROR_BODY);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn batch_array_decodes() {
        let body = r#"[{"jsonrpc":"2.0","id":2,"result":"0x2"},{"jsonrpc":"2.0","id":1,"result":"0x1"}]"#;
        let responses = decode_batch_body(body).unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].id, RpcId::Number(2));
    }

    #[test]
    fn batch_error_object_becomes_rpc_error() {
        let body = r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32005,"message":"rate limit exceeded"}}"#;
        let err = decode_batch_body(body).unwrap_err();
        assert!(matches!(err, TransportError::Rpc(e) if e.code == -32005));
    }

    #[test]
    fn batch_garbage_is_deserialization_error() {
        assert!(matches!(
            decode_batch_body("<html>"),
            Err(TransportError::Deserialization(_))
        ));
    }

    #[test]
    fn invalid_headers_are_rejected() {
        let bad = [("bad header".to_string(), "v".to_string())];
        assert!(header_map(&bad).is_err());
        let good = [("x-api-key".to_string(), "secret".to_string())];
        assert_eq!(header_map(&good).unwrap().len(), 1);
    }

    #[test]
    fn connector_builds_transport_for_url() {
        let connector = HttpConnector::new(Duration::from_secs(5)).unwrap();
        let transport = connector.connect("https://rpc.example", &[]).unwrap();
        assert_eq!(transport.url(), "https://rpc.example");
    }
}
