// wallet-core/src/crypto/mod.rs

//! Core Cryptography Module
//!
//! - **Mnemonic**: BIP-39 phrase generation/validation via [`WalletMnemonic`].
//! - **Key Derivation**: secp256k1 (BIP-32) và Ed25519 (SLIP-0010) via [`KeyDeriver`].
//! - **Derivation Paths**: BIP-44 / BIP-84 / SLIP-0010 per chain via [`DerivationPaths`].
//! - **HD Engine**: `(mnemonic, chain, index)` → [`KeyMaterial`] → address.

pub mod hd;
pub mod key_deriver;
pub mod mnemonic;
pub mod paths;

pub use hd::{derive_address, derive_key, KeyMaterial};
pub use key_deriver::{CurveType, DerivedKey, KeyDeriver};
pub use mnemonic::{WalletMnemonic, WordCount};
pub use paths::DerivationPaths;
