// wallet-core/src/chains/bitcoin/mod.rs

//! Bitcoin (UTXO) Chain Support
//!
//! - **Address**: BIP-84 native SegWit P2WPKH via [`BitcoinAddress`].
//! - **Transaction**: largest-first coin selection + BIP-143 signing.
//! - **Adapter**: Esplora REST queries và broadcast via [`BitcoinAdapter`].

pub mod address;
pub mod provider;
pub mod transaction;

pub use address::BitcoinAddress;
pub use provider::BitcoinAdapter;
pub use transaction::{CoinSelection, SignedBitcoinTransaction, Utxo, UtxoStatus};
