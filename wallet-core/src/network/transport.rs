// wallet-core/src/network/transport.rs
//
// Transport contracts cho remote data sources.
//
// Core chỉ phụ thuộc vào request/response contract; retry, pooling, TLS
// thuộc về implementation (xem `network::http`). Tests dùng mock transport.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Lỗi transport đã được phân loại
///
/// - `Timeout` / `Unreachable`: không biết remote đã nhận request hay chưa
/// - `Rejected`: remote trả lời và từ chối (JSON-RPC error, HTTP 4xx)
/// - `Malformed`: remote trả lời nhưng không parse được
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("rejected ({code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// JSON-RPC 2.0 client (EVM nodes, Solana RPC)
#[async_trait]
pub trait RpcClient: Send + Sync {
    /// Gọi `method` với `params`, trả về field `result`
    async fn call(&self, method: &str, params: Value) -> TransportResult<Value>;
}

/// REST client gắn với một base URL (Esplora, price API, swap API)
#[async_trait]
pub trait RestClient: Send + Sync {
    /// GET `{base}{path}` → JSON body
    async fn get_json(&self, path: &str) -> TransportResult<Value>;

    /// POST plain-text body, trả về plain-text response
    async fn post_text(&self, path: &str, body: String) -> TransportResult<String>;
}

// =============================================================================
// HELPERS - parse JSON-RPC quantities
// =============================================================================

/// Parse `"0x1a"` → 26
pub fn parse_hex_u128(value: &Value) -> TransportResult<u128> {
    let s = value
        .as_str()
        .ok_or_else(|| TransportError::Malformed(format!("expected hex string, got {}", value)))?;
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| TransportError::Malformed(format!("invalid quantity '{}': {}", s, e)))
}

pub fn parse_hex_u64(value: &Value) -> TransportResult<u64> {
    let v = parse_hex_u128(value)?;
    u64::try_from(v).map_err(|_| TransportError::Malformed(format!("quantity {} overflows u64", v)))
}
