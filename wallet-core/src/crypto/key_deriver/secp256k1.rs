// wallet-core/src/crypto/key_deriver/secp256k1.rs
//
// secp256k1 Key Derivation - BIP-32
//
// Dùng cho: Ethereum/EVM (BIP-44), Bitcoin (BIP-84)
// Reference: https://github.com/bitcoin/bips/blob/master/bip-0032.mediawiki

use crate::error::{CryptoError, WalletError, WalletResult};
use bip32::{DerivationPath, XPrv};
use std::str::FromStr;
use zeroize::Zeroizing;

fn derivation_failed(context: &str, e: impl std::fmt::Display) -> WalletError {
    WalletError::Crypto(CryptoError::DerivationFailed(format!("{}: {}", context, e)))
}

/// secp256k1 Key Deriver - BIP-32 Standard
///
/// Private keys wrap trong `Zeroizing<[u8; 32]>`; intermediate `XPrv`
/// tự zeroize khi drop (bip32 crate).
pub struct Secp256k1Deriver;

impl Secp256k1Deriver {
    /// Derive single private key từ seed + path
    pub fn derive(seed: &[u8], path: &str) -> WalletResult<Zeroizing<[u8; 32]>> {
        let derivation_path = DerivationPath::from_str(path)
            .map_err(|e| derivation_failed(&format!("Invalid path '{}'", path), e))?;

        let child = Self::walk(seed, derivation_path)?;

        let key_bytes: [u8; 32] = child.private_key().to_bytes().into();
        Ok(Zeroizing::new(key_bytes))
    }

    fn walk(seed: &[u8], path: DerivationPath) -> WalletResult<XPrv> {
        let mut xprv =
            XPrv::new(seed).map_err(|e| derivation_failed("Failed to create master key", e))?;
        for child_num in path {
            xprv = xprv
                .derive_child(child_num)
                .map_err(|e| derivation_failed("Child derivation failed", e))?;
        }
        Ok(xprv)
    }
}

// =============================================================================
// TESTS
// =============================================================================
