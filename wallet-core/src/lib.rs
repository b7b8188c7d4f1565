// wallet-core/src/lib.rs

//! Vault Wallet Core
//!
//! Non-custodial, multi-chain wallet engine:
//!
//! - **Mnemonic**: BIP-39 generation/validation ([`crypto::mnemonic`]).
//! - **Vault**: Argon2id + XChaCha20-Poly1305 encryption at rest ([`vault`]).
//! - **HD Derivation**: BIP-44/84 (secp256k1) và SLIP-0010 (Ed25519) ([`crypto::hd`]).
//! - **Chains**: EVM (Ethereum, Polygon, BNB), Bitcoin (P2WPKH), Solana qua [`ChainAdapter`].
//! - **Pipeline**: validate → fee → sign → broadcast ([`pipeline`]).
//! - **Quotes**: giá USD và swap quote, best-effort ([`quotes`]).
//!
//! Host application dùng [`WalletCore`].

pub mod api;
pub mod chains;
pub mod config;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod network;
pub mod pipeline;
pub mod quotes;
pub mod state;
pub mod vault;

#[cfg(test)]
pub(crate) mod testing;

pub use api::WalletCore;
pub use chains::ChainRegistry;
pub use config::CoreConfig;
pub use crypto::{KeyMaterial, WalletMnemonic};
pub use error::{WalletError, WalletResult};
pub use network::{Chain, ChainAdapter, ChainFamily};
pub use pipeline::{FeeAssessment, FeePolicy, TransferDraft, TransferReceipt};
pub use state::{ChainAccount, UsdTotal, WalletState};
pub use vault::{KeyValueStore, MemoryStore, UserVerifier, Vault};
