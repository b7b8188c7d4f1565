// wallet-core/src/pipeline.rs
//
// Transaction Pipeline - native transfer từ một account
//
//   Draft → Validated → FeeEstimated → Signed → Broadcast → {Confirmed | Failed}
//
// - Validate hoàn toàn local: chưa có remote call / crypto nào trước khi qua guard
// - KeyMaterial derive bên trong `Vault::with_mnemonic`, drop ngay sau khi ký
// - Không chờ confirmation; không bao giờ broadcast lại khi outcome không rõ
// - State lock chỉ giữ trong các đoạn đồng bộ, không qua `.await`

use crate::chains::{ChainRegistry, SignedTransaction};
use crate::crypto::hd;
use crate::error::{ChainError, CryptoError, WalletError, WalletResult};
use crate::network::models::{format_units, Chain, FeeEstimate, Transaction, TransactionStatus, TransactionType};
use crate::network::traits::ChainAdapter;
use crate::quotes::QuoteAggregator;
use crate::state::{ChainAccount, WalletState};
use crate::vault::Vault;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

// =============================================================================
// TYPES
// =============================================================================

/// Yêu cầu chuyển tiền do user nhập
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferDraft {
    pub account_id: String,
    pub to: String,
    /// Base units (wei, satoshi, lamports)
    pub amount: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransferStage {
    Draft,
    Validated,
    FeeEstimated,
    Signed,
    Broadcast,
    Confirmed,
    Failed,
}

impl From<TransactionStatus> for TransferStage {
    fn from(status: TransactionStatus) -> Self {
        match status {
            TransactionStatus::Pending => TransferStage::Broadcast,
            TransactionStatus::Confirmed => TransferStage::Confirmed,
            TransactionStatus::Failed => TransferStage::Failed,
        }
    }
}

/// Phí lỗi có chặn transfer hay không
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeePolicy {
    #[default]
    Require,
    AcceptUnknown,
}

/// Kết quả bước fee. `Unavailable` KHÔNG có nghĩa là phí bằng 0.
#[derive(Debug, Clone, PartialEq)]
pub enum FeeAssessment {
    Estimated(FeeEstimate),
    Unavailable { reason: String },
}

impl FeeAssessment {
    pub fn estimate(&self) -> Option<&FeeEstimate> {
        match self {
            FeeAssessment::Estimated(fee) => Some(fee),
            FeeAssessment::Unavailable { .. } => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, FeeAssessment::Unavailable { .. })
    }
}

/// Draft đã qua guard local
#[derive(Debug, Clone)]
pub struct ValidatedTransfer {
    pub account: ChainAccount,
    pub derivation_index: u32,
    /// Address đã normalize bởi adapter
    pub to: String,
    pub amount: u128,
}

impl ValidatedTransfer {
    pub fn chain(&self) -> Chain {
        self.account.chain
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastOutcome {
    /// Remote đã nhận, hash do remote trả về
    Accepted,
    /// Không biết remote có nhận hay không; hash là hash tính local
    Unknown,
}

#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub transaction: Transaction,
    pub fee: FeeAssessment,
    pub outcome: BroadcastOutcome,
    pub stage: TransferStage,
    pub explorer_url: Option<String>,
}

// =============================================================================
// PIPELINE
// =============================================================================

pub struct TransferPipeline<'a> {
    registry: &'a ChainRegistry,
    quotes: &'a QuoteAggregator,
    vault: &'a Vault,
    state: &'a Mutex<WalletState>,
}

fn lock(state: &Mutex<WalletState>) -> MutexGuard<'_, WalletState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<'a> TransferPipeline<'a> {
    pub fn new(
        registry: &'a ChainRegistry,
        quotes: &'a QuoteAggregator,
        vault: &'a Vault,
        state: &'a Mutex<WalletState>,
    ) -> Self {
        Self {
            registry,
            quotes,
            vault,
            state,
        }
    }

    /// Draft → Validated. Không remote call, không crypto.
    pub fn validate(&self, draft: &TransferDraft) -> WalletResult<ValidatedTransfer> {
        let account = lock(self.state).account(&draft.account_id)?.clone();
        let derivation_index = account.signing_index()?;
        let adapter = self.registry.get(account.chain)?;

        let validation = adapter.validate_address(&draft.to);
        let to = match validation.normalized {
            Some(normalized) if validation.is_valid => normalized,
            _ => {
                return Err(ChainError::InvalidAddress {
                    chain: account.chain.to_string(),
                    address: draft.to.clone(),
                }
                .into())
            }
        };

        if draft.amount == 0 {
            return Err(WalletError::Validation("amount must be greater than zero".into()));
        }
        // Advisory: balance cache có thể cũ, remote vẫn có thể từ chối
        if draft.amount > account.balance {
            let decimals = account.chain.decimals();
            return Err(ChainError::InsufficientBalance {
                requested: format_units(draft.amount, decimals),
                available: format_units(account.balance, decimals),
            }
            .into());
        }

        debug!(chain = %account.chain, to = %to, amount = draft.amount, stage = ?TransferStage::Validated, "Transfer validated");
        Ok(ValidatedTransfer {
            account,
            derivation_index,
            to,
            amount: draft.amount,
        })
    }

    /// Validated → FeeEstimated
    pub async fn assess_fee(
        &self,
        transfer: &ValidatedTransfer,
        policy: FeePolicy,
    ) -> WalletResult<FeeAssessment> {
        let result = self
            .registry
            .estimate_fee(
                transfer.chain(),
                &transfer.account.address,
                &transfer.to,
                transfer.amount,
                self.quotes,
            )
            .await;

        match (result, policy) {
            (Ok(fee), _) => Ok(FeeAssessment::Estimated(fee)),
            (Err(WalletError::Chain(ChainError::FeeUnavailable(reason))), FeePolicy::AcceptUnknown) => {
                warn!(chain = %transfer.chain(), %reason, "Proceeding without fee estimate");
                Ok(FeeAssessment::Unavailable { reason })
            }
            (Err(e), _) => Err(e),
        }
    }

    /// FeeEstimated → Signed. Key chỉ tồn tại trong closure của vault.
    pub async fn sign(&self, transfer: &ValidatedTransfer) -> WalletResult<SignedTransaction> {
        let adapter = self.registry.get(transfer.chain())?;
        let plan = adapter
            .prepare_transfer(&transfer.account.address, &transfer.to, transfer.amount)
            .await?;

        let signed = self.vault.with_mnemonic(|mnemonic| {
            let key = hd::derive_key(mnemonic, transfer.chain(), transfer.derivation_index)?;
            let address = adapter.derive_address(&key)?;
            if address != transfer.account.address {
                return Err(CryptoError::InvalidKeyFormat(format!(
                    "derived address does not match account {}",
                    transfer.account.id
                ))
                .into());
            }
            adapter.sign(&plan, &key)
        })?;

        debug!(chain = %signed.chain, hash = %signed.hash, "Transfer signed");
        Ok(signed)
    }

    /// Signed → Broadcast. Ghi `pending` vào state khi remote nhận hoặc khi
    /// outcome không rõ; remote từ chối → không ghi gì.
    pub async fn broadcast(
        &self,
        transfer: &ValidatedTransfer,
        signed: &SignedTransaction,
        fee: FeeAssessment,
    ) -> WalletResult<TransferReceipt> {
        let adapter = self.registry.get(transfer.chain())?;

        let (hash, outcome) = match adapter.broadcast(signed).await {
            Ok(hash) => (hash, BroadcastOutcome::Accepted),
            Err(WalletError::Chain(ChainError::BroadcastOutcomeUnknown(reason))) => {
                warn!(chain = %signed.chain, hash = %signed.hash, %reason, "Broadcast outcome unknown, tracking local hash");
                (signed.hash.clone(), BroadcastOutcome::Unknown)
            }
            Err(e) => return Err(e),
        };

        let estimate = fee.estimate();
        let transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            hash: hash.clone(),
            from: transfer.account.address.clone(),
            to: transfer.to.clone(),
            amount: transfer.amount,
            symbol: transfer.chain().symbol().to_string(),
            chain: transfer.chain(),
            tx_type: TransactionType::Send,
            status: TransactionStatus::Pending,
            timestamp: Utc::now(),
            fee: signed.fee.or_else(|| estimate.map(|f| f.fee_native)),
            fee_usd: estimate.and_then(|f| f.fee_usd),
        };

        lock(self.state).record_transaction(transaction.clone());
        info!(chain = %transaction.chain, %hash, ?outcome, "Transfer recorded as pending");

        Ok(TransferReceipt {
            explorer_url: adapter.explorer_tx_url(&hash),
            transaction,
            fee,
            outcome,
            stage: TransferStage::Broadcast,
        })
    }

    /// Toàn bộ pipeline cho một draft
    pub async fn execute(&self, draft: &TransferDraft, policy: FeePolicy) -> WalletResult<TransferReceipt> {
        let transfer = self.validate(draft)?;
        let fee = self.assess_fee(&transfer, policy).await?;
        let signed = self.sign(&transfer).await?;
        self.broadcast(&transfer, &signed, fee).await
    }

    /// Poll status của một transaction và áp dụng (pending → terminal).
    /// `StatusUnknown` → transaction vẫn pending, lỗi được trả về.
    pub async fn refresh_status(&self, transaction_id: &str) -> WalletResult<TransactionStatus> {
        let tx = lock(self.state).transaction(transaction_id)?.clone();
        if tx.status.is_terminal() {
            return Ok(tx.status);
        }

        let adapter: Arc<dyn ChainAdapter> = self.registry.get(tx.chain)?;
        let status = adapter.get_status(&tx.hash).await?;

        if lock(self.state).update_status(transaction_id, status)? {
            info!(chain = %tx.chain, hash = %tx.hash, ?status, "Transaction status updated");
        }
        Ok(status)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::WalletMnemonic;
    use crate::quotes::{CoinGeckoSource, OneInchSource};
    use crate::testing::{fee_timeout, MockAdapter, MockRest};
    use crate::vault::{KdfParams, MemoryStore};

    const PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    const FROM: &str = "0x9858EfFD232B4033E47d90003D41EC34EcaEda94";
    const TO: &str = "0x000000000000000000000000000000000000dEaD";
    const ONE_ETH: u128 = 1_000_000_000_000_000_000;

    struct Fixture {
        adapter: Arc<MockAdapter>,
        rest: Arc<MockRest>,
        registry: ChainRegistry,
        quotes: QuoteAggregator,
        vault: Vault,
        state: Mutex<WalletState>,
        account_id: String,
    }

    impl Fixture {
        fn new() -> Self {
            let adapter = Arc::new(MockAdapter::ethereum());
            let rest = Arc::new(MockRest::new());
            let mut registry = ChainRegistry::new();
            registry.register(adapter.clone());

            let quotes = QuoteAggregator::new(
                Arc::new(CoinGeckoSource::new(rest.clone())),
                Arc::new(OneInchSource::new(rest.clone())),
            );

            let vault = Vault::new(Arc::new(MemoryStore::new()), KdfParams::light());
            vault
                .initialize("1234", &WalletMnemonic::from_phrase(PHRASE).unwrap())
                .unwrap();

            let mut state = WalletState::new();
            let account_id = state
                .add_derived("Main", Chain::Ethereum, 0, FROM.to_string())
                .unwrap()
                .id
                .clone();
            state
                .apply_balance(&account_id, &crate::network::models::Balance::native(Chain::Ethereum, ONE_ETH))
                .unwrap();

            Self {
                adapter,
                rest,
                registry,
                quotes,
                vault,
                state: Mutex::new(state),
                account_id,
            }
        }

        fn pipeline(&self) -> TransferPipeline<'_> {
            TransferPipeline::new(&self.registry, &self.quotes, &self.vault, &self.state)
        }

        fn draft(&self, to: &str, amount: u128) -> TransferDraft {
            TransferDraft {
                account_id: self.account_id.clone(),
                to: to.to_string(),
                amount,
            }
        }

        fn recorded(&self) -> Vec<Transaction> {
            self.state.lock().unwrap().transactions().to_vec()
        }

        fn remote_calls(&self) -> usize {
            self.adapter.remote_calls() + self.rest.total_calls()
        }
    }

    #[tokio::test]
    async fn test_amount_over_balance_makes_no_remote_calls() {
        let f = Fixture::new();
        let err = f
            .pipeline()
            .execute(&f.draft(TO, ONE_ETH + 1), FeePolicy::Require)
            .await
            .unwrap_err();

        assert!(matches!(err, WalletError::Chain(ChainError::InsufficientBalance { .. })));
        assert_eq!(f.remote_calls(), 0);
        assert_eq!(f.adapter.signs(), 0);
        assert!(f.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_recipient_rejected_locally() {
        let f = Fixture::new();
        for to in ["bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu", "0x1234", ""] {
            let err = f.pipeline().execute(&f.draft(to, 1), FeePolicy::Require).await.unwrap_err();
            assert!(matches!(err, WalletError::Chain(ChainError::InvalidAddress { .. })));
        }
        let err = f.pipeline().execute(&f.draft(TO, 0), FeePolicy::Require).await.unwrap_err();
        assert!(matches!(err, WalletError::Validation(_)));
        assert_eq!(f.remote_calls(), 0);
    }

    #[tokio::test]
    async fn test_watch_only_cannot_send() {
        let f = Fixture::new();
        let id = f
            .state
            .lock()
            .unwrap()
            .add_watch_only("Cold", Chain::Ethereum, TO.to_string())
            .unwrap()
            .id
            .clone();
        let draft = TransferDraft {
            account_id: id,
            to: FROM.to_string(),
            amount: 1,
        };
        let err = f.pipeline().execute(&draft, FeePolicy::AcceptUnknown).await.unwrap_err();
        assert!(matches!(err, WalletError::Chain(ChainError::WatchOnly(_))));
        assert_eq!(f.remote_calls(), 0);
    }

    #[tokio::test]
    async fn test_successful_broadcast_records_pending() {
        let f = Fixture::new();
        f.adapter.set_broadcast(Ok("0xfeedbeef".to_string()));

        let receipt = f
            .pipeline()
            .execute(&f.draft(TO, ONE_ETH / 2), FeePolicy::Require)
            .await
            .unwrap();

        assert_eq!(receipt.outcome, BroadcastOutcome::Accepted);
        assert_eq!(receipt.stage, TransferStage::Broadcast);
        assert_eq!(receipt.transaction.hash, "0xfeedbeef");
        assert_eq!(receipt.transaction.status, TransactionStatus::Pending);
        assert_eq!(receipt.explorer_url.as_deref(), Some("https://etherscan.io/tx/0xfeedbeef"));
        // Không có giá → không có USD
        assert!(receipt.fee.estimate().unwrap().fee_usd.is_none());

        let recorded = f.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].hash, "0xfeedbeef");
        assert_eq!(recorded[0].from, FROM);
        assert_eq!(recorded[0].amount, ONE_ETH / 2);
        assert_eq!(f.adapter.broadcasts(), 1);
    }

    #[tokio::test]
    async fn test_fee_timeout_accept_unknown() {
        let f = Fixture::new();
        f.adapter.set_fee(fee_timeout());

        let receipt = f
            .pipeline()
            .execute(&f.draft(TO, 1_000), FeePolicy::AcceptUnknown)
            .await
            .unwrap();

        assert!(receipt.fee.is_unavailable());
        assert!(receipt.fee.estimate().is_none());
        assert!(receipt.transaction.fee_usd.is_none());
        assert_eq!(f.recorded().len(), 1);
    }

    #[tokio::test]
    async fn test_fee_timeout_required() {
        let f = Fixture::new();
        f.adapter.set_fee(fee_timeout());

        let err = f
            .pipeline()
            .execute(&f.draft(TO, 1_000), FeePolicy::Require)
            .await
            .unwrap_err();

        assert!(matches!(err, WalletError::Chain(ChainError::FeeUnavailable(_))));
        assert_eq!(f.adapter.signs(), 0);
        assert_eq!(f.adapter.broadcasts(), 0);
    }

    #[tokio::test]
    async fn test_broadcast_rejected_records_nothing() {
        let f = Fixture::new();
        f.adapter
            .set_broadcast(Err(ChainError::Broadcast("nonce too low".into()).into()));

        let err = f
            .pipeline()
            .execute(&f.draft(TO, 1_000), FeePolicy::Require)
            .await
            .unwrap_err();

        assert_eq!(err, WalletError::Chain(ChainError::Broadcast("nonce too low".into())));
        assert!(f.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_outcome_records_local_hash_once() {
        let f = Fixture::new();
        f.adapter
            .set_broadcast(Err(ChainError::BroadcastOutcomeUnknown("timeout".into()).into()));

        let receipt = f
            .pipeline()
            .execute(&f.draft(TO, 1_000), FeePolicy::Require)
            .await
            .unwrap();

        assert_eq!(receipt.outcome, BroadcastOutcome::Unknown);
        assert!(receipt.transaction.hash.starts_with("0x"));
        assert_eq!(receipt.transaction.hash.len(), 66);
        assert_eq!(receipt.transaction.status, TransactionStatus::Pending);
        assert_eq!(f.adapter.broadcasts(), 1);
        assert_eq!(f.recorded().len(), 1);
    }

    #[tokio::test]
    async fn test_locked_vault_blocks_signing() {
        let f = Fixture::new();
        f.vault.lock();

        let err = f
            .pipeline()
            .execute(&f.draft(TO, 1_000), FeePolicy::Require)
            .await
            .unwrap_err();

        assert_eq!(err, WalletError::Vault(crate::error::VaultError::Locked));
        assert_eq!(f.adapter.broadcasts(), 0);
    }

    #[tokio::test]
    async fn test_account_key_mismatch_refuses_to_sign() {
        let f = Fixture::new();
        // Account index 1 nhưng address của index 0
        let id = {
            let mut state = f.state.lock().unwrap();
            let mut forged = state.account(&f.account_id).unwrap().clone();
            state.remove(&f.account_id).unwrap();
            forged.derivation_index = Some(1);
            let id = state.add_derived("Forged", Chain::Ethereum, 1, forged.address).unwrap().id.clone();
            state
                .apply_balance(&id, &crate::network::models::Balance::native(Chain::Ethereum, ONE_ETH))
                .unwrap();
            id
        };
        let draft = TransferDraft {
            account_id: id,
            to: TO.to_string(),
            amount: 1,
        };

        let err = f.pipeline().execute(&draft, FeePolicy::Require).await.unwrap_err();
        assert!(matches!(err, WalletError::Crypto(CryptoError::InvalidKeyFormat(_))));
        assert_eq!(f.adapter.signs(), 0);
        assert_eq!(f.adapter.broadcasts(), 0);
    }

    #[tokio::test]
    async fn test_refresh_status() {
        let f = Fixture::new();
        let receipt = f
            .pipeline()
            .execute(&f.draft(TO, 1_000), FeePolicy::Require)
            .await
            .unwrap();
        let id = receipt.transaction.id.clone();

        f.adapter
            .set_status(Err(ChainError::StatusUnknown("503".into()).into()));
        assert!(f.pipeline().refresh_status(&id).await.is_err());
        assert_eq!(f.recorded()[0].status, TransactionStatus::Pending);

        f.adapter.set_status(Ok(TransactionStatus::Confirmed));
        assert_eq!(f.pipeline().refresh_status(&id).await.unwrap(), TransactionStatus::Confirmed);
        assert_eq!(f.recorded()[0].status, TransactionStatus::Confirmed);

        // Terminal: không poll nữa
        let calls = f.adapter.remote_calls();
        f.adapter.set_status(Ok(TransactionStatus::Failed));
        assert_eq!(f.pipeline().refresh_status(&id).await.unwrap(), TransactionStatus::Confirmed);
        assert_eq!(f.adapter.remote_calls(), calls);
        assert_eq!(TransferStage::from(TransactionStatus::Confirmed), TransferStage::Confirmed);
    }
}
