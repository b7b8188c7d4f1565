// wallet-core/src/chains/mod.rs
//
// Chain adapters: EVM (Ethereum, Polygon, BNB), Bitcoin (P2WPKH), Solana.
// Mỗi family implement `ChainAdapter`; `ChainRegistry` giữ một adapter cho mỗi chain.

pub mod bitcoin;
pub mod evm;
pub mod registry;
pub mod solana;

pub use registry::ChainRegistry;

use crate::chains::bitcoin::Utxo;
use crate::network::models::Chain;
use serde::{Deserialize, Serialize};

// =============================================================================
// CHAIN CONFIG
// =============================================================================

/// Cấu hình chung cho các EVM chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmChainConfig {
    pub chain_id: u64,
    pub rpc_url: String,
    pub explorer_url: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

// Preset cho các mạng hỗ trợ
impl EvmChainConfig {
    pub fn ethereum() -> Self {
        Self {
            chain_id: 1,
            rpc_url: "https://eth.llamarpc.com".to_string(),
            explorer_url: "https://etherscan.io".to_string(),
            name: "Ethereum Mainnet".to_string(),
            symbol: "ETH".to_string(),
            decimals: 18,
        }
    }

    pub fn polygon() -> Self {
        Self {
            chain_id: 137,
            rpc_url: "https://polygon-rpc.com".to_string(),
            explorer_url: "https://polygonscan.com".to_string(),
            name: "Polygon".to_string(),
            symbol: "MATIC".to_string(),
            decimals: 18,
        }
    }

    pub fn bsc() -> Self {
        Self {
            chain_id: 56,
            rpc_url: "https://binance.llamarpc.com".to_string(),
            explorer_url: "https://bscscan.com".to_string(),
            name: "BNB Smart Chain".to_string(),
            symbol: "BNB".to_string(),
            decimals: 18,
        }
    }

    /// Preset theo chain (None với non-EVM)
    pub fn for_chain(chain: Chain) -> Option<Self> {
        match chain {
            Chain::Ethereum => Some(Self::ethereum()),
            Chain::Polygon => Some(Self::polygon()),
            Chain::Bnb => Some(Self::bsc()),
            Chain::Bitcoin | Chain::Solana => None,
        }
    }
}

// =============================================================================
// TRANSFER PLAN & SIGNED TX
// =============================================================================

/// Dữ liệu remote đã thu thập, đủ để ký offline một native transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferPlan {
    Evm {
        chain_id: u64,
        nonce: u64,
        /// wei/gas
        gas_price: u128,
        gas_limit: u64,
        to: String,
        /// wei
        value: u128,
    },
    Bitcoin {
        /// UTXOs đã chọn (largest-first)
        utxos: Vec<Utxo>,
        to: String,
        /// satoshi
        amount: u64,
        /// sat/vB
        fee_rate: u64,
        change_address: String,
    },
    Solana {
        from: String,
        to: String,
        lamports: u64,
        /// base58
        recent_blockhash: String,
    },
}

impl TransferPlan {
    /// Family của plan phải khớp với key và adapter
    pub fn family(&self) -> crate::network::models::ChainFamily {
        use crate::network::models::ChainFamily;
        match self {
            TransferPlan::Evm { .. } => ChainFamily::Evm,
            TransferPlan::Bitcoin { .. } => ChainFamily::Utxo,
            TransferPlan::Solana { .. } => ChainFamily::Solana,
        }
    }
}

/// Transaction đã ký: raw bytes + hash tính local
#[derive(Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub chain: Chain,
    pub raw: Vec<u8>,
    /// EVM: 0x-keccak; Bitcoin: txid; Solana: base58 signature
    pub hash: String,
    /// Phí thực tế nếu biết khi ký (base units)
    pub fee: Option<u128>,
}

impl std::fmt::Debug for SignedTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedTransaction")
            .field("chain", &self.chain)
            .field("hash", &self.hash)
            .field("raw_len", &self.raw.len())
            .finish()
    }
}
