// wallet-core/src/network/http.rs
//
// reqwest-backed transports (feature `http`)

use crate::network::transport::{RestClient, RpcClient, TransportError, TransportResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_decode() {
        TransportError::Malformed(err.to_string())
    } else {
        TransportError::Unreachable(err.to_string())
    }
}

/// 4xx = remote từ chối; 5xx coi như unreachable (server có thể chưa xử lý)
fn classify_status(status: reqwest::StatusCode, body: String) -> TransportError {
    if status.is_client_error() {
        TransportError::Rejected {
            code: status.as_u16() as i64,
            message: body,
        }
    } else {
        TransportError::Unreachable(format!("HTTP {}: {}", status, body))
    }
}

fn build_client(timeout: Duration) -> TransportResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| TransportError::Unreachable(format!("failed to build HTTP client: {}", e)))
}

// =============================================================================
// JSON-RPC
// =============================================================================

/// JSON-RPC 2.0 over HTTP POST
pub struct HttpRpcClient {
    url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> TransportResult<Self> {
        Ok(Self {
            url: url.into(),
            client: build_client(timeout)?,
            next_id: AtomicU64::new(1),
        })
    }
}

#[async_trait]
impl RpcClient for HttpRpcClient {
    async fn call(&self, method: &str, params: Value) -> TransportResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        tracing::debug!(method, id, url = %self.url, "JSON-RPC request");

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(classify)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, text));
        }

        let mut payload: Value = response.json().await.map_err(classify)?;

        if let Some(err) = payload.get("error") {
            let code = err.get("code").and_then(Value::as_i64).unwrap_or(-1);
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            tracing::debug!(method, code, %message, "JSON-RPC error");
            return Err(TransportError::Rejected { code, message });
        }

        payload
            .get_mut("result")
            .map(Value::take)
            .ok_or_else(|| TransportError::Malformed(format!("{}: missing result", method)))
    }
}

// =============================================================================
// REST
// =============================================================================

/// REST client cho Esplora / CoinGecko / 1inch
pub struct HttpRestClient {
    base_url: String,
    client: reqwest::Client,
    bearer_token: Option<String>,
}

impl HttpRestClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> TransportResult<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: build_client(timeout)?,
            bearer_token: None,
        })
    }

    /// `Authorization: Bearer <token>` cho mọi request
    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token.filter(|t| !t.is_empty());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl RestClient for HttpRestClient {
    async fn get_json(&self, path: &str) -> TransportResult<Value> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(classify)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        response.json().await.map_err(classify)
    }

    async fn post_text(&self, path: &str, body: String) -> TransportResult<String> {
        let url = self.url(path);
        tracing::debug!(%url, "POST");

        let response = self
            .authorize(self.client.post(&url))
            .body(body)
            .send()
            .await
            .map_err(classify)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        response.text().await.map_err(classify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let rejected = classify_status(reqwest::StatusCode::BAD_REQUEST, "bad-txns".into());
        assert_eq!(
            rejected,
            TransportError::Rejected {
                code: 400,
                message: "bad-txns".into()
            }
        );

        let unavailable = classify_status(reqwest::StatusCode::SERVICE_UNAVAILABLE, String::new());
        assert!(matches!(unavailable, TransportError::Unreachable(_)));
    }

    #[test]
    fn test_rest_url_join() {
        let client = HttpRestClient::new("https://blockstream.info/api/", Duration::from_secs(5))
            .unwrap()
            .with_bearer_token(Some(String::new()));
        assert_eq!(
            client.url("/address/bc1q/utxo"),
            "https://blockstream.info/api/address/bc1q/utxo"
        );
        assert!(client.bearer_token.is_none());
    }
}
