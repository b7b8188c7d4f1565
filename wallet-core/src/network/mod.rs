// wallet-core/src/network/mod.rs
//
// Network Module - Multi-Chain Provider Architecture
//
// Cung cấp:
// - Models định nghĩa cấu trúc dữ liệu chain-agnostic
// - `ChainAdapter` trait: capability set chung cho mọi chain
// - Transport contracts (JSON-RPC, REST) + reqwest implementation

#[cfg(feature = "http")]
pub mod http;
pub mod models;
pub mod traits;
pub mod transport;

// Re-export cho convenience
pub use models::*;
pub use traits::*;
pub use transport::{RestClient, RpcClient, TransportError, TransportResult};
