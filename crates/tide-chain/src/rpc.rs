//! JSON-RPC 2.0 transport.

use crate::error::{ChainError, ChainResult};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::trace;

/// Default timeout for fullnode requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Plain JSON-RPC client over HTTPS. Request ids increment per call so node
/// logs stay correlatable.
pub struct JsonRpcClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>) -> ChainResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ChainError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Issue one call and deserialize the `result` member. A populated
    /// `error` member surfaces as [`ChainError::Rpc`].
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> ChainResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        trace!(method, id, "RPC call");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChainError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChainError::HttpClient(format!("HTTP {status}: {body}")));
        }

        let body: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| ChainError::Parse(format!("Failed to parse RPC response: {e}")))?;

        if let Some(err) = body.error {
            return Err(ChainError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        body.result.ok_or_else(|| {
            ChainError::Parse(format!("RPC response for {method} has neither result nor error"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_envelope_shape() {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 7,
            method: "sui_getObject",
            params: json!(["0x1120", {"showContent": true}]),
        };

        let encoded = serde_json::to_value(&request).unwrap();
        assert_eq!(
            encoded,
            json!({
                "jsonrpc": "2.0",
                "id": 7,
                "method": "sui_getObject",
                "params": ["0x1120", {"showContent": true}],
            })
        );
    }

    #[test]
    fn response_error_member_parses() {
        let body = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"bad params"}}"#;
        let parsed: RpcResponse<Value> = serde_json::from_str(body).unwrap();

        assert!(parsed.result.is_none());
        let err = parsed.error.unwrap();
        assert_eq!(err.code, -32602);
        assert_eq!(err.message, "bad params");
    }
}
