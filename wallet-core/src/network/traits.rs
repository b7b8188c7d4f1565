// wallet-core/src/network/traits.rs
//
// Chain Adapter Trait - Chain-Agnostic Interface
//
// Mọi chain family (EVM, UTXO, Solana) PHẢI implement đầy đủ capability set này.
// Dispatch qua `Chain` enum + trait object, không switch theo string.

use crate::chains::{SignedTransaction, TransferPlan};
use crate::crypto::hd::{self, KeyMaterial};
use crate::error::WalletResult;
use crate::network::models::{AddressValidation, Balance, Chain, FeeEstimate, TransactionStatus};
use async_trait::async_trait;

/// ChainAdapter - Interface chính cho mọi blockchain
///
/// # Design Principles
/// - **Local vs Remote**: `validate_address`, `derive_address`, `sign` là local,
///   đồng bộ, không await. Các hàm còn lại đi qua transport.
/// - **No Substitution**: Lỗi remote được trả về, KHÔNG thay bằng số 0 hay default.
/// - **Sign-then-forget**: `sign` mượn `KeyMaterial`, không giữ lại.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    /// Chain mà adapter này phục vụ
    fn chain(&self) -> Chain;

    // =========================================================================
    // ADDRESS (local)
    // =========================================================================

    /// Kiểm tra cú pháp address theo chuẩn của chain
    fn validate_address(&self, address: &str) -> AddressValidation;

    /// Address từ key đã derive. Mặc định: encoding mainnet của chain.
    fn derive_address(&self, key: &KeyMaterial) -> WalletResult<String> {
        hd::derive_address(key, self.chain())
    }

    // =========================================================================
    // QUERIES (remote)
    // =========================================================================

    /// Số dư native. Transport lỗi → `BalanceUnavailable`.
    async fn get_balance(&self, address: &str) -> WalletResult<Balance>;

    /// Phí mạng (native units, chưa có USD). Transport lỗi → `FeeUnavailable`.
    async fn estimate_network_fee(
        &self,
        from: &str,
        to: &str,
        amount: u128,
    ) -> WalletResult<FeeEstimate>;

    // =========================================================================
    // BUILD & SIGN
    // =========================================================================

    /// Lấy dữ liệu remote cần để build tx (nonce, UTXOs, blockhash...)
    async fn prepare_transfer(&self, from: &str, to: &str, amount: u128)
        -> WalletResult<TransferPlan>;

    /// Ký offline. Trả về raw bytes + hash tính local.
    fn sign(&self, plan: &TransferPlan, key: &KeyMaterial) -> WalletResult<SignedTransaction>;

    // =========================================================================
    // SUBMIT & TRACK (remote)
    // =========================================================================

    /// Broadcast. Remote từ chối → `Broadcast`; timeout → `BroadcastOutcomeUnknown`.
    async fn broadcast(&self, signed: &SignedTransaction) -> WalletResult<String>;

    /// Poll trạng thái. Transport lỗi → `StatusUnknown`.
    async fn get_status(&self, hash: &str) -> WalletResult<TransactionStatus>;

    /// Explorer link cho một tx hash
    fn explorer_tx_url(&self, hash: &str) -> Option<String> {
        let _ = hash;
        None
    }
}
