// wallet-core/src/chains/solana/mod.rs

//! Solana Chain Support
//!
//! - **Address**: base58 Ed25519 public key (SLIP-0010 `m/44'/501'/i'/0'`) via [`SolanaAddress`].
//! - **Transaction**: legacy System Program transfer, signed với `ed25519-dalek`.
//! - **Adapter**: JSON-RPC queries và broadcast via [`SolanaAdapter`].

pub mod address;
pub mod provider;
pub mod transaction;

pub use address::SolanaAddress;
pub use provider::SolanaAdapter;
pub use transaction::SignedSolanaTransaction;
