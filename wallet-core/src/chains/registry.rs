// wallet-core/src/chains/registry.rs
//
// Chain Registry - một adapter cho mỗi `Chain`
// Fee estimate đi qua đây để gắn giá USD (best-effort).

use crate::error::{ChainError, WalletResult};
use crate::network::models::{Chain, FeeEstimate};
use crate::network::traits::ChainAdapter;
use crate::quotes::QuoteAggregator;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Default, Clone)]
pub struct ChainRegistry {
    adapters: HashMap<Chain, Arc<dyn ChainAdapter>>,
}

impl std::fmt::Debug for ChainRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainRegistry")
            .field("chains", &self.chains())
            .finish()
    }
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Đăng ký adapter cho `adapter.chain()`, thay adapter cũ nếu có
    pub fn register(&mut self, adapter: Arc<dyn ChainAdapter>) -> &mut Self {
        let chain = adapter.chain();
        if self.adapters.insert(chain, adapter).is_some() {
            debug!(%chain, "Replaced chain adapter");
        }
        self
    }

    pub fn get(&self, chain: Chain) -> WalletResult<Arc<dyn ChainAdapter>> {
        self.adapters
            .get(&chain)
            .cloned()
            .ok_or_else(|| ChainError::UnsupportedChain(format!("no adapter registered for {}", chain)).into())
    }

    pub fn contains(&self, chain: Chain) -> bool {
        self.adapters.contains_key(&chain)
    }

    /// Các chain đã đăng ký, theo thứ tự `Chain`
    pub fn chains(&self) -> Vec<Chain> {
        let mut chains: Vec<Chain> = self.adapters.keys().copied().collect();
        chains.sort();
        chains
    }

    /// Phí mạng + giá trị USD. Price lỗi → `fee_usd = None`, không bịa số.
    pub async fn estimate_fee(
        &self,
        chain: Chain,
        from: &str,
        to: &str,
        amount: u128,
        quotes: &QuoteAggregator,
    ) -> WalletResult<FeeEstimate> {
        let adapter = self.get(chain)?;
        let fee = adapter.estimate_network_fee(from, to, amount).await?;

        match quotes.native_price(chain).await {
            Ok(price) => Ok(fee.with_price(&price)),
            Err(e) => {
                warn!(%chain, error = %e, "Fee estimated without USD value");
                Ok(fee)
            }
        }
    }

    /// Adapter HTTP cho mọi chain trong config
    #[cfg(feature = "http")]
    pub fn from_config(config: &crate::config::CoreConfig) -> WalletResult<Self> {
        use crate::chains::bitcoin::BitcoinAdapter;
        use crate::chains::evm::EvmAdapter;
        use crate::chains::solana::SolanaAdapter;
        use crate::error::WalletError;
        use crate::network::http::{HttpRestClient, HttpRpcClient};

        let timeout = config.request_timeout();
        let transport = |e: crate::network::TransportError| WalletError::Config(e.to_string());

        let mut registry = Self::new();
        for chain in [Chain::Ethereum, Chain::Polygon, Chain::Bnb] {
            if let Some(evm) = config.evm(chain) {
                let rpc = HttpRpcClient::new(evm.rpc_url.clone(), timeout).map_err(transport)?;
                registry.register(Arc::new(EvmAdapter::new(chain, evm.clone(), Arc::new(rpc))?));
            }
        }

        let esplora = HttpRestClient::new(config.bitcoin.api_url.clone(), timeout).map_err(transport)?;
        registry.register(Arc::new(BitcoinAdapter::new(
            config.bitcoin.network.to_network(),
            Arc::new(esplora),
            config.bitcoin.explorer_url.clone(),
        )));

        let solana_rpc = HttpRpcClient::new(config.solana.rpc_url.clone(), timeout).map_err(transport)?;
        registry.register(Arc::new(SolanaAdapter::new(
            Arc::new(solana_rpc),
            config.solana.explorer_url.clone(),
        )));

        debug!(chains = ?registry.chains(), "Chain registry built from config");
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WalletError;
    use crate::quotes::{CoinGeckoSource, OneInchSource};
    use crate::network::models::PriceFreshness;
    use crate::network::transport::TransportError;
    use crate::testing::{fee_timeout, MockAdapter, MockRest};
    use serde_json::json;

    const FROM: &str = "0x9858EfFD232B4033E47d90003D41EC34EcaEda94";
    const TO: &str = "0x000000000000000000000000000000000000dEaD";

    fn quotes(rest: Arc<MockRest>) -> QuoteAggregator {
        QuoteAggregator::new(
            Arc::new(CoinGeckoSource::new(rest.clone())),
            Arc::new(OneInchSource::new(rest)),
        )
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ChainRegistry::new();
        registry
            .register(Arc::new(MockAdapter::ethereum()))
            .register(Arc::new(MockAdapter::for_chain(Chain::Polygon)));

        assert_eq!(registry.chains(), vec![Chain::Ethereum, Chain::Polygon]);
        assert_eq!(registry.get(Chain::Polygon).unwrap().chain(), Chain::Polygon);
        assert!(matches!(
            registry.get(Chain::Solana),
            Err(WalletError::Chain(ChainError::UnsupportedChain(_)))
        ));
    }

    #[tokio::test]
    async fn test_fee_with_usd() {
        let rest = Arc::new(MockRest::new());
        rest.respond(
            &CoinGeckoSource::price_path(&["ethereum"]),
            json!({ "ethereum": { "usd": 2000.0 } }),
        );
        let mut registry = ChainRegistry::new();
        registry.register(Arc::new(MockAdapter::ethereum()));

        // 20 gwei × 21000 = 0.00042 ETH
        let fee = registry
            .estimate_fee(Chain::Ethereum, FROM, TO, 1, &quotes(rest))
            .await
            .unwrap();
        assert_eq!(fee.fee_native, 420_000_000_000_000);
        assert!((fee.fee_usd.unwrap() - 0.84).abs() < 1e-9);
        assert_eq!(fee.usd_freshness, Some(PriceFreshness::Live));
    }

    #[tokio::test]
    async fn test_fee_with_stale_price_is_marked() {
        let rest = Arc::new(MockRest::new());
        let path = CoinGeckoSource::price_path(&["ethereum"]);
        rest.respond(&path, json!({ "ethereum": { "usd": 2000.0 } }));
        let quotes = quotes(rest.clone());
        let mut registry = ChainRegistry::new();
        registry.register(Arc::new(MockAdapter::ethereum()));

        let live = registry.estimate_fee(Chain::Ethereum, FROM, TO, 1, &quotes).await.unwrap();

        rest.fail(&path, TransportError::Timeout("10s".into()));
        let stale = registry.estimate_fee(Chain::Ethereum, FROM, TO, 1, &quotes).await.unwrap();

        assert_eq!(stale.fee_usd, live.fee_usd);
        assert_eq!(stale.usd_freshness, Some(PriceFreshness::Cached));
        assert_ne!(live, stale);
    }

    #[tokio::test]
    async fn test_fee_without_price() {
        let rest = Arc::new(MockRest::new());
        let mut registry = ChainRegistry::new();
        registry.register(Arc::new(MockAdapter::ethereum()));

        let fee = registry
            .estimate_fee(Chain::Ethereum, FROM, TO, 1, &quotes(rest))
            .await
            .unwrap();
        assert_eq!(fee.fee_usd, None);
        assert_eq!(fee.usd_freshness, None);
        assert_eq!(fee.fee_native, 420_000_000_000_000);
    }

    #[tokio::test]
    async fn test_fee_unavailable_propagates() {
        let adapter = Arc::new(MockAdapter::ethereum());
        adapter.set_fee(fee_timeout());
        let mut registry = ChainRegistry::new();
        registry.register(adapter);

        let err = registry
            .estimate_fee(Chain::Ethereum, FROM, TO, 1, &quotes(Arc::new(MockRest::new())))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::Chain(ChainError::FeeUnavailable(_))));
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_from_config_registers_every_chain() {
        let registry = ChainRegistry::from_config(&crate::config::CoreConfig::default()).unwrap();
        assert_eq!(registry.chains(), Chain::ALL.to_vec());
        assert_eq!(
            registry.get(Chain::Bitcoin).unwrap().explorer_tx_url("abc").unwrap(),
            "https://blockstream.info/tx/abc"
        );
    }
}
