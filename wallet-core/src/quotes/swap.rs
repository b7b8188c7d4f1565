// wallet-core/src/quotes/swap.rs
//
// Swap provider contract + 1inch `quote` implementation
// Token table theo chain; native asset dùng địa chỉ placeholder 0xEeee...

use crate::error::{ChainError, WalletError, WalletResult};
use crate::network::models::Chain;
use crate::network::transport::{RestClient, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub const NATIVE_TOKEN: &str = "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE";

/// Token có thể swap trên một EVM chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapToken {
    pub symbol: &'static str,
    pub address: &'static str,
    pub decimals: u8,
}

const fn token(symbol: &'static str, address: &'static str, decimals: u8) -> SwapToken {
    SwapToken {
        symbol,
        address,
        decimals,
    }
}

const ETHEREUM_TOKENS: &[SwapToken] = &[
    token("ETH", NATIVE_TOKEN, 18),
    token("USDT", "0xdAC17F958D2ee523a2206206994597C13D831ec7", 6),
    token("USDC", "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", 6),
    token("DAI", "0x6B175474E89094C44Da98b954EedeAC495271d0F", 18),
];

const POLYGON_TOKENS: &[SwapToken] = &[
    token("MATIC", NATIVE_TOKEN, 18),
    token("USDT", "0xc2132D05D31c914a87C6611C10748AEb04B58e8F", 6),
    token("USDC", "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174", 6),
];

const BNB_TOKENS: &[SwapToken] = &[
    token("BNB", NATIVE_TOKEN, 18),
    token("USDT", "0x55d398326f99059fF775485246999027B3197955", 18),
    token("USDC", "0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d", 18),
];

/// Danh sách token của chain. Non-EVM → `UnsupportedChain`.
pub fn swap_tokens(chain: Chain) -> WalletResult<&'static [SwapToken]> {
    match chain {
        Chain::Ethereum => Ok(ETHEREUM_TOKENS),
        Chain::Polygon => Ok(POLYGON_TOKENS),
        Chain::Bnb => Ok(BNB_TOKENS),
        Chain::Bitcoin | Chain::Solana => Err(ChainError::UnsupportedChain(format!(
            "swaps are not available on {}",
            chain.display_name()
        ))
        .into()),
    }
}

pub fn find_token(chain: Chain, symbol: &str) -> WalletResult<SwapToken> {
    let symbol = symbol.trim().to_ascii_uppercase();
    swap_tokens(chain)?
        .iter()
        .find(|t| t.symbol == symbol)
        .copied()
        .ok_or_else(|| {
            WalletError::Validation(format!("{} cannot be swapped on {}", symbol, chain.display_name()))
        })
}

/// Kết quả thô từ aggregator (chưa áp slippage)
#[derive(Debug, Clone, PartialEq)]
pub struct RouteQuote {
    pub amount_out: u128,
    pub estimated_gas: u64,
    /// %, 0 nếu provider không trả về
    pub price_impact_pct: f64,
}

#[async_trait]
pub trait SwapSource: Send + Sync {
    async fn quote(
        &self,
        chain: Chain,
        from: &SwapToken,
        to: &SwapToken,
        amount: u128,
    ) -> WalletResult<RouteQuote>;
}

/// 1inch quote API; API key (nếu có) nằm trong `RestClient`
pub struct OneInchSource {
    rest: Arc<dyn RestClient>,
}

const DEFAULT_SWAP_GAS: u64 = 21_000;

impl OneInchSource {
    pub fn new(rest: Arc<dyn RestClient>) -> Self {
        Self { rest }
    }

    pub fn quote_path(chain_id: u64, from: &str, to: &str, amount: u128) -> String {
        format!(
            "/swap/v5.2/{}/quote?src={}&dst={}&amount={}",
            chain_id, from, to, amount
        )
    }
}

fn parse_route(body: &Value) -> Result<RouteQuote, TransportError> {
    let amount_out = body
        .get("toAmount")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<u128>().ok())
        .ok_or_else(|| TransportError::Malformed(format!("quote: missing toAmount in {}", body)))?;

    let estimated_gas = match body.get("estimatedGas").or_else(|| body.get("gas")) {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
    .unwrap_or(DEFAULT_SWAP_GAS);

    // estimatedPriceImpact là tỷ lệ (0.012 = 1.2%)
    let price_impact_pct = match body.get("estimatedPriceImpact") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
    .map(|ratio| ratio * 100.0)
    .unwrap_or(0.0);

    Ok(RouteQuote {
        amount_out,
        estimated_gas,
        price_impact_pct,
    })
}

#[async_trait]
impl SwapSource for OneInchSource {
    async fn quote(
        &self,
        chain: Chain,
        from: &SwapToken,
        to: &SwapToken,
        amount: u128,
    ) -> WalletResult<RouteQuote> {
        let chain_id = chain
            .evm_chain_id()
            .ok_or_else(|| ChainError::UnsupportedChain(chain.to_string()))?;

        self.rest
            .get_json(&Self::quote_path(chain_id, from.address, to.address, amount))
            .await
            .and_then(|body| parse_route(&body))
            .map_err(|e| {
                tracing::warn!(%chain, from = from.symbol, to = to.symbol, error = %e, "swap quote failed");
                ChainError::QuoteUnavailable(e.to_string()).into()
            })
    }
}
