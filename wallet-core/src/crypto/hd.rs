// wallet-core/src/crypto/hd.rs
//
// HD Derivation Engine - (mnemonic, chain, index) → KeyMaterial → address
//
// Hoàn toàn deterministic: cùng input → cùng bytes, không có runtime state.
// KeyMaterial chỉ sống trong một thao tác signing, không Clone, không cache.

use crate::chains::bitcoin::BitcoinAddress;
use crate::chains::evm::EvmAddress;
use crate::chains::solana::SolanaAddress;
use crate::crypto::key_deriver::{CurveType, KeyDeriver};
use crate::crypto::mnemonic::WalletMnemonic;
use crate::crypto::paths::DerivationPaths;
use crate::error::{CryptoError, WalletError, WalletResult};
use crate::network::models::{Chain, ChainFamily};
use zeroize::Zeroizing;

/// Index lớn nhất (non-hardened BIP-32 / hardened SLIP-0010 đều < 2^31)
pub const MAX_INDEX: u32 = 0x7FFF_FFFF;

/// Curve gốc của mỗi chain family
pub const fn curve_for(chain: Chain) -> CurveType {
    match chain.family() {
        ChainFamily::Evm | ChainFamily::Utxo => CurveType::Secp256k1,
        ChainFamily::Solana => CurveType::Ed25519,
    }
}

/// Private key của một account + derivation path
///
/// Không `Clone`, Debug không in key, zeroize khi drop.
pub struct KeyMaterial {
    private_key: Zeroizing<[u8; 32]>,
    chain: Chain,
    index: u32,
    path: String,
}

impl KeyMaterial {
    #[inline]
    pub fn chain(&self) -> Chain {
        self.chain
    }

    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn curve(&self) -> CurveType {
        curve_for(self.chain)
    }

    /// Raw secret - chỉ cho signer/address code trong crate
    #[inline]
    pub(crate) fn secret(&self) -> &[u8; 32] {
        &self.private_key
    }

    /// Key thô cho tests (không qua mnemonic)
    #[cfg(test)]
    pub(crate) fn from_raw(chain: Chain, private_key: [u8; 32]) -> Self {
        Self {
            private_key: Zeroizing::new(private_key),
            chain,
            index: 0,
            path: "m".to_string(),
        }
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("chain", &self.chain)
            .field("path", &self.path)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

fn check_index(index: u32) -> WalletResult<()> {
    if index > MAX_INDEX {
        return Err(WalletError::Validation(format!(
            "Derivation index {} exceeds {}",
            index, MAX_INDEX
        )));
    }
    Ok(())
}

/// Derive key cho (chain, index)
pub fn derive_key(mnemonic: &WalletMnemonic, chain: Chain, index: u32) -> WalletResult<KeyMaterial> {
    check_index(index)?;

    let seed = mnemonic.to_seed(None)?;
    let path = DerivationPaths::for_chain(chain, index);
    let derived = KeyDeriver::derive(&seed[..], &path, curve_for(chain))?;

    tracing::debug!(%chain, %path, "derived key material");

    Ok(KeyMaterial {
        private_key: derived.private_key,
        chain,
        index,
        path,
    })
}

/// Address mainnet của key theo thuật toán gốc của chain
///
/// - EVM: Keccak-256 + EIP-55
/// - Bitcoin: P2WPKH bech32
/// - Solana: base58(ed25519 pubkey)
pub fn derive_address(key: &KeyMaterial, chain: Chain) -> WalletResult<String> {
    if key.chain.family() != chain.family() {
        return Err(WalletError::Crypto(CryptoError::InvalidKeyFormat(format!(
            "key derived for {} cannot produce a {} address",
            key.chain, chain
        ))));
    }

    match chain.family() {
        ChainFamily::Evm => EvmAddress::derive_from_slice(key.secret()),
        ChainFamily::Utxo => {
            BitcoinAddress::p2wpkh_from_secret(key.secret(), bitcoin::Network::Bitcoin)
                .map(|a| a.to_string())
        }
        ChainFamily::Solana => Ok(SolanaAddress::from_secret(key.secret())),
    }
}

// =============================================================================
// TESTS
// =============================================================================
