// wallet-core/src/quotes/mod.rs

//! Quote/Price Aggregator
//!
//! Best-effort: khi provider lỗi, giá cuối cùng đã biết được trả về với
//! `PriceFreshness::Cached`. Không bao giờ bịa giá.

pub mod price;
pub mod swap;

pub use price::{CoinGeckoSource, PriceQuote, PriceSource};
pub use swap::{find_token, swap_tokens, OneInchSource, RouteQuote, SwapSource, SwapToken};

use crate::error::{ChainError, WalletError, WalletResult};
use crate::network::models::{Chain, FeeEstimate, PriceFreshness, SwapQuote, TokenPrice};
use crate::network::traits::ChainAdapter;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

pub const DEFAULT_SLIPPAGE_PCT: f64 = 0.5;
pub const MAX_SLIPPAGE_PCT: f64 = 50.0;

pub struct QuoteAggregator {
    prices: Arc<dyn PriceSource>,
    swaps: Arc<dyn SwapSource>,
    /// symbol → giá live gần nhất
    cache: Mutex<HashMap<String, TokenPrice>>,
    default_slippage: f64,
}

/// out × (1 − slippage%), tính theo basis points
pub fn minimum_received(amount_out: u128, slippage_pct: f64) -> u128 {
    let bps = (slippage_pct * 100.0).round().clamp(0.0, 10_000.0) as u128;
    amount_out / 10_000 * (10_000 - bps) + amount_out % 10_000 * (10_000 - bps) / 10_000
}

fn normalize(symbols: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let s = symbol.trim().to_ascii_uppercase();
        if !s.is_empty() && !out.contains(&s) {
            out.push(s);
        }
    }
    out
}

impl QuoteAggregator {
    pub fn new(prices: Arc<dyn PriceSource>, swaps: Arc<dyn SwapSource>) -> Self {
        Self {
            prices,
            swaps,
            cache: Mutex::new(HashMap::new()),
            default_slippage: DEFAULT_SLIPPAGE_PCT,
        }
    }

    pub fn with_default_slippage(mut self, slippage_pct: f64) -> Self {
        self.default_slippage = slippage_pct;
        self
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, TokenPrice>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // =========================================================================
    // PRICES
    // =========================================================================

    /// Giá cho các symbol. Symbol không có giá (live lẫn cache) bị bỏ qua.
    /// Lỗi chỉ khi provider lỗi VÀ không có symbol nào trong cache.
    pub async fn get_prices(&self, symbols: &[String]) -> WalletResult<Vec<TokenPrice>> {
        let symbols = normalize(symbols);
        if symbols.is_empty() {
            return Ok(Vec::new());
        }

        match self.prices.fetch_prices(&symbols).await {
            Ok(live) => {
                let now = Utc::now();
                let mut cache = self.cache();
                for (symbol, quote) in &live {
                    cache.insert(
                        symbol.clone(),
                        TokenPrice {
                            symbol: symbol.clone(),
                            usd: quote.usd,
                            change_24h: quote.change_24h,
                            freshness: PriceFreshness::Live,
                            updated_at: now,
                        },
                    );
                }
                debug!(requested = symbols.len(), live = live.len(), "Prices refreshed");

                Ok(symbols
                    .iter()
                    .filter_map(|s| {
                        let price = cache.get(s)?.clone();
                        Some(if live.contains_key(s) {
                            price
                        } else {
                            TokenPrice {
                                freshness: PriceFreshness::Cached,
                                ..price
                            }
                        })
                    })
                    .collect())
            }
            Err(e) => {
                let cache = self.cache();
                let cached: Vec<TokenPrice> = symbols
                    .iter()
                    .filter_map(|s| cache.get(s))
                    .map(|p| TokenPrice {
                        freshness: PriceFreshness::Cached,
                        ..p.clone()
                    })
                    .collect();
                if cached.is_empty() {
                    return Err(e);
                }
                warn!(error = %e, cached = cached.len(), "Price provider failed, using last known prices");
                Ok(cached)
            }
        }
    }

    pub async fn get_price(&self, symbol: &str) -> WalletResult<TokenPrice> {
        self.get_prices(&[symbol.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ChainError::PriceUnavailable(format!("no price for {}", symbol)).into())
    }

    /// Giá native asset của chain (dùng để quy đổi phí sang USD), kèm freshness
    pub async fn native_price(&self, chain: Chain) -> WalletResult<TokenPrice> {
        self.get_price(chain.symbol()).await
    }

    // =========================================================================
    // SWAPS
    // =========================================================================

    /// Quote swap `amount` (base units của `from`) trên chain của `adapter`.
    /// Gas price lấy từ adapter với `from_address`; USD của phí là best-effort.
    pub async fn swap_quote(
        &self,
        adapter: &dyn ChainAdapter,
        from_address: &str,
        from: &str,
        to: &str,
        amount: u128,
        slippage_pct: Option<f64>,
    ) -> WalletResult<SwapQuote> {
        let chain = adapter.chain();
        let from_token = find_token(chain, from)?;
        let to_token = find_token(chain, to)?;
        if from_token == to_token {
            return Err(WalletError::Validation(format!("cannot swap {} to itself", from_token.symbol)));
        }
        if amount == 0 {
            return Err(WalletError::Validation("swap amount must be positive".into()));
        }
        let slippage = slippage_pct.unwrap_or(self.default_slippage);
        if !(0.0..=MAX_SLIPPAGE_PCT).contains(&slippage) {
            return Err(WalletError::Validation(format!("slippage {}% out of range", slippage)));
        }

        let route = self.swaps.quote(chain, &from_token, &to_token, amount).await?;

        let network = adapter.estimate_network_fee(from_address, from_address, 0).await?;
        let fee = FeeEstimate::new(chain, network.unit_fee_rate, route.estimated_gas);
        let fee = match self.native_price(chain).await {
            Ok(price) => fee.with_price(&price),
            Err(e) => {
                warn!(%chain, error = %e, "Swap fee quoted without USD value");
                fee
            }
        };

        Ok(SwapQuote {
            chain,
            from_token: from_token.symbol.to_string(),
            to_token: to_token.symbol.to_string(),
            amount_in: amount,
            amount_out: route.amount_out,
            out_decimals: to_token.decimals,
            price_impact_pct: route.price_impact_pct,
            slippage_pct: slippage,
            minimum_received: minimum_received(route.amount_out, slippage),
            fee,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::transport::TransportError;
    use crate::chains::bitcoin::BitcoinAdapter;
    use crate::testing::{MockAdapter, MockRest};
    use serde_json::json;

    const SENDER: &str = "0x9858EfFD232B4033E47d90003D41EC34EcaEda94";

    fn aggregator(rest: Arc<MockRest>) -> QuoteAggregator {
        QuoteAggregator::new(
            Arc::new(CoinGeckoSource::new(rest.clone())),
            Arc::new(OneInchSource::new(rest)),
        )
    }

    fn eth_path() -> String {
        CoinGeckoSource::price_path(&["ethereum"])
    }

    #[test]
    fn test_minimum_received() {
        assert_eq!(minimum_received(1_000_000, 0.5), 995_000);
        assert_eq!(minimum_received(1_000_000, 0.0), 1_000_000);
        assert_eq!(minimum_received(1_000_000, 100.0), 0);
        assert_eq!(minimum_received(u128::MAX, 0.0), u128::MAX);
    }

    #[tokio::test]
    async fn test_live_then_cached() {
        let rest = Arc::new(MockRest::new());
        rest.respond(&eth_path(), json!({ "ethereum": { "usd": 3000.0, "usd_24h_change": 2.0 } }));
        let quotes = aggregator(rest.clone());

        let live = quotes.get_price("eth").await.unwrap();
        assert_eq!(live.usd, 3000.0);
        assert_eq!(live.freshness, PriceFreshness::Live);

        rest.fail(&eth_path(), TransportError::Timeout("10s".into()));
        let cached = quotes.get_price("ETH").await.unwrap();
        assert_eq!(cached.usd, 3000.0);
        assert_eq!(cached.freshness, PriceFreshness::Cached);
    }

    #[tokio::test]
    async fn test_no_price_no_cache() {
        let rest = Arc::new(MockRest::new());
        rest.fail(&eth_path(), TransportError::Unreachable("dns".into()));
        let err = aggregator(rest).native_price(Chain::Ethereum).await.unwrap_err();
        assert!(matches!(err, WalletError::Chain(ChainError::PriceUnavailable(_))));
    }

    #[tokio::test]
    async fn test_duplicate_symbols_single_request() {
        let rest = Arc::new(MockRest::new());
        rest.respond(&eth_path(), json!({ "ethereum": { "usd": 1.0 } }));
        let prices = aggregator(rest.clone())
            .get_prices(&["ETH".into(), "eth".into(), " ETH ".into()])
            .await
            .unwrap();
        assert_eq!(prices.len(), 1);
        assert_eq!(rest.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_swap_quote() {
        let rest = Arc::new(MockRest::new());
        let eth = find_token(Chain::Ethereum, "ETH").unwrap();
        let usdt = find_token(Chain::Ethereum, "USDT").unwrap();
        rest.respond(
            &OneInchSource::quote_path(1, eth.address, usdt.address, 500_000_000_000_000_000),
            json!({ "toAmount": "1500000000", "estimatedGas": "150000" }),
        );

        rest.respond(&eth_path(), json!({ "ethereum": { "usd": 2000.0 } }));
        let adapter = MockAdapter::ethereum();

        let quote = aggregator(rest)
            .swap_quote(&adapter, SENDER, "ETH", "USDT", 500_000_000_000_000_000, None)
            .await
            .unwrap();

        assert_eq!(quote.amount_out, 1_500_000_000);
        assert_eq!(quote.out_decimals, 6);
        assert_eq!(quote.slippage_pct, DEFAULT_SLIPPAGE_PCT);
        assert_eq!(quote.minimum_received, 1_492_500_000);
        // 150000 gas × 20 gwei = 0.003 ETH
        assert_eq!(quote.fee.fee_units, 150_000);
        assert_eq!(quote.fee.fee_native, 3_000_000_000_000_000);
        assert!((quote.fee.fee_usd.unwrap() - 6.0).abs() < 1e-9);
        assert_eq!(quote.fee.usd_freshness, Some(PriceFreshness::Live));
    }

    #[tokio::test]
    async fn test_swap_quote_without_price() {
        let rest = Arc::new(MockRest::new());
        let eth = find_token(Chain::Ethereum, "ETH").unwrap();
        let dai = find_token(Chain::Ethereum, "DAI").unwrap();
        rest.respond(
            &OneInchSource::quote_path(1, eth.address, dai.address, 1_000),
            json!({ "toAmount": "3000" }),
        );
        rest.fail(&eth_path(), TransportError::Unreachable("dns".into()));

        let quote = aggregator(rest)
            .swap_quote(&MockAdapter::ethereum(), SENDER, "ETH", "DAI", 1_000, None)
            .await
            .unwrap();
        assert_eq!(quote.fee.fee_units, 21_000);
        assert_eq!(quote.fee.fee_usd, None);
        assert_eq!(quote.fee.usd_freshness, None);
    }

    #[tokio::test]
    async fn test_swap_rejected_locally() {
        let rest = Arc::new(MockRest::new());
        let quotes = aggregator(rest.clone());
        let eth = MockAdapter::ethereum();
        let btc = BitcoinAdapter::new(bitcoin::Network::Bitcoin, rest.clone(), "https://blockstream.info");

        assert!(matches!(
            quotes.swap_quote(&btc, SENDER, "BTC", "USDT", 1, None).await,
            Err(WalletError::Chain(ChainError::UnsupportedChain(_)))
        ));
        assert!(quotes.swap_quote(&eth, SENDER, "ETH", "ETH", 1, None).await.is_err());
        assert!(quotes.swap_quote(&eth, SENDER, "ETH", "USDT", 0, None).await.is_err());
        assert!(quotes.swap_quote(&eth, SENDER, "ETH", "USDT", 1, Some(75.0)).await.is_err());
        assert_eq!(rest.total_calls(), 0);
        assert_eq!(eth.remote_calls(), 0);
    }
}
