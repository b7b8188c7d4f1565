// wallet-core/src/config.rs
//
// Cấu hình core: endpoints theo chain, price/swap API, KDF, slippage, timeout.
// Layer: default (mainnet presets) → file (JSON/TOML) → env `VAULT_*`.
//
// Env: prefix `VAULT_`, `__` phân tách cấp lồng nhau, ví dụ
// `VAULT_ETHEREUM__RPC_URL`, `VAULT_BITCOIN__NETWORK=testnet`, `VAULT_SWAP_API_KEY`.

use crate::chains::EvmChainConfig;
use crate::error::{WalletError, WalletResult};
use crate::network::models::Chain;
use crate::quotes::{DEFAULT_SLIPPAGE_PCT, MAX_SLIPPAGE_PCT};
use crate::vault::KdfParams;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ENV_PREFIX: &str = "VAULT";
/// Phân tách key lồng nhau trong tên env var
pub const ENV_SEPARATOR: &str = "__";

fn config_error(e: config::ConfigError) -> WalletError {
    WalletError::Config(e.to_string())
}

/// Source env `VAULT_*`. `vars = None` → đọc process env.
fn environment(vars: Option<config::Map<String, String>>) -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator(ENV_SEPARATOR)
        .ignore_empty(true)
        .try_parsing(true)
        .source(vars)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitcoinNetwork {
    Mainnet,
    Testnet,
}

impl BitcoinNetwork {
    pub fn to_network(self) -> bitcoin::Network {
        match self {
            BitcoinNetwork::Mainnet => bitcoin::Network::Bitcoin,
            BitcoinNetwork::Testnet => bitcoin::Network::Testnet,
        }
    }
}

/// Esplora REST API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitcoinConfig {
    pub network: BitcoinNetwork,
    pub api_url: String,
    pub explorer_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolanaConfig {
    pub rpc_url: String,
    pub explorer_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub ethereum: EvmChainConfig,
    pub polygon: EvmChainConfig,
    pub bnb: EvmChainConfig,
    pub bitcoin: BitcoinConfig,
    pub solana: SolanaConfig,
    pub price_api_url: String,
    pub swap_api_url: String,
    /// Bearer token cho swap API
    #[serde(skip_serializing)]
    pub swap_api_key: Option<String>,
    pub kdf: KdfParams,
    pub default_slippage_pct: f64,
    pub request_timeout_secs: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            ethereum: EvmChainConfig::ethereum(),
            polygon: EvmChainConfig::polygon(),
            bnb: EvmChainConfig::bsc(),
            bitcoin: BitcoinConfig {
                network: BitcoinNetwork::Mainnet,
                api_url: "https://blockstream.info/api".to_string(),
                explorer_url: "https://blockstream.info".to_string(),
            },
            solana: SolanaConfig {
                rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
                explorer_url: "https://solscan.io".to_string(),
            },
            price_api_url: "https://api.coingecko.com/api/v3".to_string(),
            swap_api_url: "https://api.1inch.dev".to_string(),
            swap_api_key: None,
            kdf: KdfParams::default(),
            default_slippage_pct: DEFAULT_SLIPPAGE_PCT,
            request_timeout_secs: 15,
        }
    }
}

impl CoreConfig {
    /// Default + env overrides
    pub fn from_env() -> WalletResult<Self> {
        Self::finish(Self::defaults()?.add_source(environment(None)))
    }

    /// File (định dạng theo extension) + env overrides; key thiếu lấy từ default
    pub fn from_file(path: impl AsRef<Path>) -> WalletResult<Self> {
        let file = File::from(path.as_ref()).required(true);
        Self::finish(Self::defaults()?.add_source(file).add_source(environment(None)))
    }

    /// JSON trên default, không đọc env
    pub fn from_json(raw: &str) -> WalletResult<Self> {
        Self::finish(Self::defaults()?.add_source(File::from_str(raw, FileFormat::Json)))
    }

    fn defaults() -> WalletResult<ConfigBuilder<DefaultState>> {
        let defaults = Config::try_from(&Self::default()).map_err(config_error)?;
        Ok(Config::builder().add_source(defaults))
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> WalletResult<Self> {
        let config: Self = builder
            .build()
            .map_err(config_error)?
            .try_deserialize()
            .map_err(config_error)?;
        config.validate()?;
        Ok(config)
    }

    pub fn evm(&self, chain: Chain) -> Option<&EvmChainConfig> {
        match chain {
            Chain::Ethereum => Some(&self.ethereum),
            Chain::Polygon => Some(&self.polygon),
            Chain::Bnb => Some(&self.bnb),
            Chain::Bitcoin | Chain::Solana => None,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> WalletResult<()> {
        let urls = [
            ("ethereum.rpc_url", &self.ethereum.rpc_url),
            ("polygon.rpc_url", &self.polygon.rpc_url),
            ("bnb.rpc_url", &self.bnb.rpc_url),
            ("bitcoin.api_url", &self.bitcoin.api_url),
            ("solana.rpc_url", &self.solana.rpc_url),
            ("price_api_url", &self.price_api_url),
            ("swap_api_url", &self.swap_api_url),
        ];
        for (name, url) in urls {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(WalletError::Config(format!("{} must be an http(s) URL, got '{}'", name, url)));
            }
        }

        for chain in [Chain::Ethereum, Chain::Polygon, Chain::Bnb] {
            if let Some(evm) = self.evm(chain) {
                if Some(evm.chain_id) != chain.evm_chain_id() {
                    return Err(WalletError::Config(format!(
                        "{} configured with chain id {}",
                        chain, evm.chain_id
                    )));
                }
            }
        }

        if self.request_timeout_secs == 0 {
            return Err(WalletError::Config("request_timeout_secs must be positive".into()));
        }
        if !(0.0..=MAX_SLIPPAGE_PCT).contains(&self.default_slippage_pct) {
            return Err(WalletError::Config(format!(
                "default_slippage_pct {} out of range",
                self.default_slippage_pct
            )));
        }
        self.kdf
            .validate()
            .map_err(|e| WalletError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = CoreConfig::default();
        config.validate().unwrap();
        assert_eq!(config.ethereum.chain_id, 1);
        assert_eq!(config.default_slippage_pct, 0.5);
        assert_eq!(config.bitcoin.network.to_network(), bitcoin::Network::Bitcoin);
        assert!(config.evm(Chain::Solana).is_none());
    }

    fn from_vars(vars: &[(&str, &str)]) -> WalletResult<CoreConfig> {
        let vars: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CoreConfig::finish(CoreConfig::defaults()?.add_source(environment(Some(vars))))
    }

    #[test]
    fn test_env_overrides() {
        let config = from_vars(&[
            ("VAULT_ETHEREUM__RPC_URL", "https://eth.example.org"),
            ("VAULT_SOLANA__RPC_URL", ""),
            ("VAULT_SWAP_API_KEY", "secret-key"),
            ("VAULT_BITCOIN__NETWORK", "testnet"),
            ("VAULT_REQUEST_TIMEOUT_SECS", "30"),
            ("OTHER_ETHEREUM__RPC_URL", "https://ignored.example.org"),
        ])
        .unwrap();

        assert_eq!(config.ethereum.rpc_url, "https://eth.example.org");
        assert_eq!(config.ethereum.chain_id, 1);
        // Giá trị rỗng bị bỏ qua
        assert_eq!(config.solana.rpc_url, CoreConfig::default().solana.rpc_url);
        assert_eq!(config.swap_api_key.as_deref(), Some("secret-key"));
        assert_eq!(config.bitcoin.network, BitcoinNetwork::Testnet);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_env_override_is_validated() {
        let err = from_vars(&[("VAULT_POLYGON__CHAIN_ID", "1")]).unwrap_err();
        assert!(matches!(err, WalletError::Config(_)));
    }

    #[test]
    fn test_file_then_env() {
        let path = std::env::temp_dir().join(format!("vault-core-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "default_slippage_pct": 2.0, "price_api_url": "https://prices.example.org" }"#)
            .unwrap();

        let config = CoreConfig::finish(
            CoreConfig::defaults()
                .unwrap()
                .add_source(File::from(path.as_path()))
                .add_source(environment(Some(
                    [("VAULT_PRICE_API_URL".to_string(), "https://override.example.org".to_string())]
                        .into_iter()
                        .collect(),
                ))),
        )
        .unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.default_slippage_pct, 2.0);
        assert_eq!(config.price_api_url, "https://override.example.org");
        assert!(CoreConfig::from_file("/nonexistent/vault-core.json").is_err());
    }

    #[test]
    fn test_from_json_layers_on_defaults() {
        let config = CoreConfig::from_json(
            r#"{
                "bitcoin": { "network": "testnet", "api_url": "https://blockstream.info/testnet/api" },
                "default_slippage_pct": 1.0,
                "kdf": { "m_cost": 19456, "t_cost": 2, "p_cost": 1 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.bitcoin.network, BitcoinNetwork::Testnet);
        // Key thiếu trong object lồng nhau lấy từ default
        assert_eq!(config.bitcoin.explorer_url, "https://blockstream.info");
        assert_eq!(config.default_slippage_pct, 1.0);
        assert_eq!(config.kdf.m_cost, 19_456);
        assert_eq!(config.ethereum, EvmChainConfig::ethereum());
    }

    #[test]
    fn test_validation_errors() {
        let mut config = CoreConfig::default();
        config.request_timeout_secs = 0;
        assert!(matches!(config.validate(), Err(WalletError::Config(_))));

        let mut config = CoreConfig::default();
        config.solana.rpc_url = String::new();
        assert!(config.validate().is_err());

        let mut config = CoreConfig::default();
        config.default_slippage_pct = -1.0;
        assert!(config.validate().is_err());

        let mut config = CoreConfig::default();
        config.polygon.chain_id = 1;
        assert!(config.validate().is_err());

        assert!(CoreConfig::from_json("{ not json").is_err());
    }

    #[test]
    fn test_api_key_not_serialized() {
        let mut config = CoreConfig::default();
        config.swap_api_key = Some("secret-key".into());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret-key"));
    }
}
