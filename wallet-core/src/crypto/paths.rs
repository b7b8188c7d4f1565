// wallet-core/src/crypto/paths.rs
//
// Derivation Paths Module - Multi-Chain HD Wallet Path Generator
// BIP-44 (Purpose), SLIP-44 (Coin Types), BIP-84 (Bitcoin Native SegWit), SLIP-0010

use crate::network::models::{Chain, ChainFamily};

// =============================================================================
// SLIP-44 COIN TYPES
// =============================================================================
/// SLIP-44 Registered Coin Types
/// Ref: https://github.com/satoshilabs/slips/blob/master/slip-0044.md
pub mod coin_type {
    pub const BITCOIN: u32 = 0;
    pub const ETHEREUM: u32 = 60; // EVM chains dùng chung coin_type 60
    pub const SOLANA: u32 = 501;
}

/// BIP-43 purpose fields
pub mod purpose {
    pub const BIP44: u32 = 44;
    pub const BIP84: u32 = 84;
}

// =============================================================================
// DERIVATION PATHS
// =============================================================================
/// Pre-built Derivation Paths
///
/// # Conventions
/// - BIP-44: `m/44'/60'/0'/0/index` (EVM, secp256k1)
/// - BIP-84: `m/84'/0'/0'/0/index` (Bitcoin P2WPKH, secp256k1)
/// - SLIP-0010: `m/44'/501'/index'/0'` (Solana ed25519, all hardened)
pub struct DerivationPaths;

impl DerivationPaths {
    // =========================================================================
    // EVM CHAINS (secp256k1) - BIP-44, coin_type = 60
    // Ethereum, Polygon, BNB dùng chung → cùng address trên mọi EVM chain
    // =========================================================================
    pub const EVM_0: &'static str = "m/44'/60'/0'/0/0";

    #[inline]
    pub fn evm(index: u32) -> String {
        Self::bip44(purpose::BIP44, coin_type::ETHEREUM, 0, 0, index)
    }

    // =========================================================================
    // BITCOIN (secp256k1) - BIP-84 Native SegWit (bc1q...)
    // =========================================================================
    pub const BTC_NATIVE_SEGWIT_0: &'static str = "m/84'/0'/0'/0/0";

    #[inline]
    pub fn btc_native_segwit(index: u32) -> String {
        Self::bip44(purpose::BIP84, coin_type::BITCOIN, 0, 0, index)
    }

    // =========================================================================
    // SOLANA (ed25519) - SLIP-0010 (all levels hardened)
    // Index nằm ở account level (Phantom / Solflare convention)
    // =========================================================================
    pub const SOLANA_0: &'static str = "m/44'/501'/0'/0'";

    #[inline]
    pub fn solana(account: u32) -> String {
        Self::ed25519_path(coin_type::SOLANA, account, &[0])
    }

    // =========================================================================
    // PER-CHAIN DISPATCH
    // =========================================================================

    /// Path cho (chain, index). Chỉ phụ thuộc vào input, không có runtime state.
    pub fn for_chain(chain: Chain, index: u32) -> String {
        match chain.family() {
            ChainFamily::Evm => Self::evm(index),
            ChainFamily::Utxo => Self::btc_native_segwit(index),
            ChainFamily::Solana => Self::solana(index),
        }
    }

    // =========================================================================
    // CUSTOM PATH BUILDER
    // =========================================================================
    /// BIP-44 style path (secp256k1)
    ///
    /// # Arguments
    /// * `purpose` - 44 (BIP-44), 84 (BIP-84 SegWit)
    /// * `coin_type` - SLIP-44 coin type
    /// * `account` - Account index (thường 0)
    /// * `change` - 0 = external (nhận tiền), 1 = internal (change)
    /// * `index` - Address index
    #[inline]
    pub fn bip44(purpose: u32, coin_type: u32, account: u32, change: u32, index: u32) -> String {
        format!(
            "m/{}'/{}'/{}'/{}/{}",
            purpose, coin_type, account, change, index
        )
    }

    /// Path chuẩn SLIP-0010 cho Ed25519 (luôn hardened)
    ///
    /// - Solana: `ed25519_path(501, 0, &[0])` -> m/44'/501'/0'/0'
    pub fn ed25519_path(coin_type: u32, account: u32, sub_paths: &[u32]) -> String {
        let mut path = format!("m/44'/{}'/{}'", coin_type, account);
        for &idx in sub_paths {
            path.push_str(&format!("/{}'", idx));
        }
        path
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evm_paths() {
        assert_eq!(DerivationPaths::evm(0), DerivationPaths::EVM_0);
        assert_eq!(DerivationPaths::evm(5), "m/44'/60'/0'/0/5");
    }

    #[test]
    fn test_bitcoin_paths() {
        assert_eq!(
            DerivationPaths::btc_native_segwit(0),
            DerivationPaths::BTC_NATIVE_SEGWIT_0
        );
        assert_eq!(DerivationPaths::btc_native_segwit(1), "m/84'/0'/0'/0/1");
    }

    #[test]
    fn test_solana_paths() {
        assert_eq!(DerivationPaths::solana(0), DerivationPaths::SOLANA_0);
        assert_eq!(DerivationPaths::solana(2), "m/44'/501'/2'/0'");
    }

    #[test]
    fn test_for_chain() {
        assert_eq!(DerivationPaths::for_chain(Chain::Ethereum, 3), "m/44'/60'/0'/0/3");
        // EVM chains chia sẻ path
        assert_eq!(
            DerivationPaths::for_chain(Chain::Polygon, 3),
            DerivationPaths::for_chain(Chain::Bnb, 3)
        );
        assert_eq!(DerivationPaths::for_chain(Chain::Bitcoin, 0), "m/84'/0'/0'/0/0");
        assert_eq!(DerivationPaths::for_chain(Chain::Solana, 7), "m/44'/501'/7'/0'");
    }
}
