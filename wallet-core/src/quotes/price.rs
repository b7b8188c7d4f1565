// wallet-core/src/quotes/price.rs
//
// Price provider contract + CoinGecko `simple/price` implementation

use crate::error::{ChainError, WalletResult};
use crate::network::transport::{RestClient, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Giá USD thô từ provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceQuote {
    pub usd: f64,
    pub change_24h: f64,
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// symbols (uppercase) → giá. Symbol provider không biết thì bỏ qua.
    async fn fetch_prices(&self, symbols: &[String]) -> WalletResult<HashMap<String, PriceQuote>>;
}

/// CoinGecko asset id
pub fn coingecko_id(symbol: &str) -> Option<&'static str> {
    match symbol {
        "ETH" => Some("ethereum"),
        "BTC" => Some("bitcoin"),
        "SOL" => Some("solana"),
        "BNB" => Some("binancecoin"),
        "MATIC" => Some("matic-network"),
        "USDT" => Some("tether"),
        "USDC" => Some("usd-coin"),
        "DAI" => Some("dai"),
        _ => None,
    }
}

pub struct CoinGeckoSource {
    rest: Arc<dyn RestClient>,
}

impl CoinGeckoSource {
    pub fn new(rest: Arc<dyn RestClient>) -> Self {
        Self { rest }
    }

    pub fn price_path(ids: &[&str]) -> String {
        format!(
            "/simple/price?ids={}&vs_currencies=usd&include_24hr_change=true",
            ids.join(",")
        )
    }
}

#[async_trait]
impl PriceSource for CoinGeckoSource {
    async fn fetch_prices(&self, symbols: &[String]) -> WalletResult<HashMap<String, PriceQuote>> {
        let known: Vec<(&String, &'static str)> = symbols
            .iter()
            .filter_map(|s| coingecko_id(s).map(|id| (s, id)))
            .collect();
        if known.is_empty() {
            return Ok(HashMap::new());
        }

        let ids: Vec<&str> = known.iter().map(|(_, id)| *id).collect();
        let body = self
            .rest
            .get_json(&Self::price_path(&ids))
            .await
            .map_err(|e| ChainError::PriceUnavailable(e.to_string()))?;
        if !body.is_object() {
            let e = TransportError::Malformed(format!("simple/price: {}", body));
            return Err(ChainError::PriceUnavailable(e.to_string()).into());
        }

        let prices = known
            .into_iter()
            .filter_map(|(symbol, id)| {
                let entry = body.get(id)?;
                let usd = entry.get("usd").and_then(Value::as_f64)?;
                let change_24h = entry
                    .get("usd_24h_change")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0);
                Some((symbol.clone(), PriceQuote { usd, change_24h }))
            })
            .collect();
        Ok(prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WalletError;
    use crate::testing::MockRest;
    use serde_json::json;

    #[tokio::test]
    async fn test_fetch_prices() {
        let rest = Arc::new(MockRest::new());
        rest.respond(
            &CoinGeckoSource::price_path(&["ethereum", "bitcoin"]),
            json!({
                "ethereum": { "usd": 3012.5, "usd_24h_change": -1.25 },
                "bitcoin": { "usd": 64000.0 }
            }),
        );
        let source = CoinGeckoSource::new(rest.clone());

        let prices = source
            .fetch_prices(&["ETH".to_string(), "BTC".to_string(), "DOGE".to_string()])
            .await
            .unwrap();

        assert_eq!(prices.len(), 2);
        assert_eq!(prices["ETH"], PriceQuote { usd: 3012.5, change_24h: -1.25 });
        assert_eq!(prices["BTC"].change_24h, 0.0);
        assert_eq!(rest.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_symbols_skip_request() {
        let rest = Arc::new(MockRest::new());
        let source = CoinGeckoSource::new(rest.clone());
        assert!(source.fetch_prices(&["DOGE".to_string()]).await.unwrap().is_empty());
        assert_eq!(rest.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_provider_failure() {
        let rest = Arc::new(MockRest::new());
        rest.fail(
            &CoinGeckoSource::price_path(&["solana"]),
            TransportError::Rejected { code: 429, message: "rate limited".into() },
        );
        let err = CoinGeckoSource::new(rest)
            .fetch_prices(&["SOL".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::Chain(ChainError::PriceUnavailable(_))));
        assert!(err.is_retryable());
    }
}
