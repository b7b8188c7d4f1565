// wallet-core/src/chains/evm/mod.rs

//! Ethereum Virtual Machine (EVM) Chain Support
//!
//! Ethereum, Polygon và BNB Chain dùng chung address/signing scheme.
//!
//! # Key Features
//! - **Address Derivation**: EIP-55 checksummed address generation via [`EvmAddress`].
//! - **Signing**: EIP-155 legacy transfers via [`EvmSigner`].
//! - **Adapter**: `eth_*` JSON-RPC queries và broadcast via [`EvmAdapter`].

pub mod address;
pub mod provider;
pub mod signer;

// Re-exports for cleaner API access
pub use address::EvmAddress;
pub use provider::EvmAdapter;
pub use signer::{EvmSigner, SignedEvmTransaction};
