// wallet-core/src/chains/solana/provider.rs
//
// Solana Chain Adapter - JSON-RPC qua `RpcClient`
// getBalance, getLatestBlockhash, getFeeForMessage, sendTransaction, getSignatureStatuses

use crate::chains::solana::transaction::{sign_transfer, transfer_message};
use crate::chains::solana::SolanaAddress;
use crate::chains::{SignedTransaction, TransferPlan};
use crate::crypto::hd::KeyMaterial;
use crate::error::{ChainError, CryptoError, WalletError, WalletResult};
use crate::network::models::{AddressValidation, Balance, Chain, ChainFamily, FeeEstimate, TransactionStatus};
use crate::network::traits::ChainAdapter;
use crate::network::transport::{RpcClient, TransportError, TransportResult};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct SolanaAdapter {
    rpc: Arc<dyn RpcClient>,
    explorer_url: String,
}

fn malformed(what: &str, value: &Value) -> TransportError {
    TransportError::Malformed(format!("{}: unexpected {}", what, value))
}

impl SolanaAdapter {
    pub fn new(rpc: Arc<dyn RpcClient>, explorer_url: impl Into<String>) -> Self {
        Self {
            rpc,
            explorer_url: explorer_url.into(),
        }
    }

    fn require_address(&self, address: &str) -> WalletResult<()> {
        if SolanaAddress::validate(address).is_valid {
            Ok(())
        } else {
            Err(ChainError::InvalidAddress {
                chain: Chain::Solana.to_string(),
                address: address.to_string(),
            }
            .into())
        }
    }

    async fn latest_blockhash(&self) -> TransportResult<String> {
        let result = self
            .rpc
            .call("getLatestBlockhash", json!([{ "commitment": "finalized" }]))
            .await?;
        result
            .pointer("/value/blockhash")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| malformed("getLatestBlockhash", &result))
    }

    /// Phí (lamports) cho một message đã serialize
    async fn fee_for_message(&self, message: &[u8]) -> TransportResult<u64> {
        let result = self
            .rpc
            .call(
                "getFeeForMessage",
                json!([BASE64.encode(message), { "commitment": "processed" }]),
            )
            .await?;
        result
            .get("value")
            .and_then(Value::as_u64)
            .ok_or_else(|| malformed("getFeeForMessage", &result))
    }
}

#[async_trait]
impl ChainAdapter for SolanaAdapter {
    fn chain(&self) -> Chain {
        Chain::Solana
    }

    fn validate_address(&self, address: &str) -> AddressValidation {
        SolanaAddress::validate(address)
    }

    async fn get_balance(&self, address: &str) -> WalletResult<Balance> {
        self.require_address(address)?;

        let lamports = self
            .rpc
            .call("getBalance", json!([address, { "commitment": "confirmed" }]))
            .await
            .and_then(|result| {
                result
                    .get("value")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| malformed("getBalance", &result))
            })
            .map_err(|e| {
                tracing::warn!(%address, error = %e, "solana balance query failed");
                ChainError::BalanceUnavailable(e.to_string())
            })?;

        Ok(Balance::native(Chain::Solana, lamports as u128))
    }

    async fn estimate_network_fee(
        &self,
        from: &str,
        to: &str,
        amount: u128,
    ) -> WalletResult<FeeEstimate> {
        self.require_address(from)?;
        self.require_address(to)?;
        let lamports = u64::try_from(amount)
            .map_err(|_| WalletError::Validation(format!("{} lamports overflows u64", amount)))?;

        let blockhash = self
            .latest_blockhash()
            .await
            .map_err(|e| ChainError::FeeUnavailable(e.to_string()))?;
        let message = transfer_message(from, to, lamports, &blockhash)?;
        let fee = self
            .fee_for_message(&message)
            .await
            .map_err(|e| ChainError::FeeUnavailable(e.to_string()))?;

        // 1 signature
        Ok(FeeEstimate::new(Chain::Solana, fee as u128, 1))
    }

    async fn prepare_transfer(
        &self,
        from: &str,
        to: &str,
        amount: u128,
    ) -> WalletResult<TransferPlan> {
        self.require_address(from)?;
        self.require_address(to)?;
        let lamports = u64::try_from(amount)
            .map_err(|_| WalletError::Validation(format!("{} lamports overflows u64", amount)))?;

        let recent_blockhash = self
            .latest_blockhash()
            .await
            .map_err(|e| ChainError::FeeUnavailable(format!("getLatestBlockhash: {}", e)))?;

        Ok(TransferPlan::Solana {
            from: from.to_string(),
            to: to.to_string(),
            lamports,
            recent_blockhash,
        })
    }

    fn sign(&self, plan: &TransferPlan, key: &KeyMaterial) -> WalletResult<SignedTransaction> {
        let TransferPlan::Solana {
            from,
            to,
            lamports,
            recent_blockhash,
        } = plan
        else {
            return Err(CryptoError::SigningFailed(format!(
                "solana adapter cannot sign a {:?} plan",
                plan.family()
            ))
            .into());
        };
        if key.chain().family() != ChainFamily::Solana {
            return Err(CryptoError::InvalidKeyFormat(format!(
                "key for {} cannot sign solana transactions",
                key.chain()
            ))
            .into());
        }

        let signed = sign_transfer(key.secret(), from, to, *lamports, recent_blockhash)?;
        Ok(SignedTransaction {
            chain: Chain::Solana,
            raw: signed.raw,
            hash: signed.signature,
            fee: None,
        })
    }

    async fn broadcast(&self, signed: &SignedTransaction) -> WalletResult<String> {
        let request = json!([BASE64.encode(&signed.raw), { "encoding": "base64" }]);
        match self.rpc.call("sendTransaction", request).await {
            Ok(Value::String(signature)) => {
                tracing::info!(%signature, "solana transaction broadcast");
                Ok(signature)
            }
            Ok(other) => Err(ChainError::BroadcastOutcomeUnknown(format!(
                "unexpected sendTransaction result: {}",
                other
            ))
            .into()),
            Err(TransportError::Rejected { message, .. }) => {
                tracing::warn!(%message, "solana broadcast rejected");
                Err(ChainError::Broadcast(message).into())
            }
            Err(e) => {
                tracing::warn!(signature = %signed.hash, error = %e, "solana broadcast outcome unknown");
                Err(ChainError::BroadcastOutcomeUnknown(e.to_string()).into())
            }
        }
    }

    /// Chỉ `finalized` mới là Confirmed
    async fn get_status(&self, hash: &str) -> WalletResult<TransactionStatus> {
        let result = self
            .rpc
            .call(
                "getSignatureStatuses",
                json!([[hash], { "searchTransactionHistory": true }]),
            )
            .await
            .map_err(|e| ChainError::StatusUnknown(e.to_string()))?;

        let status = result.pointer("/value/0").cloned().unwrap_or(Value::Null);
        if status.is_null() {
            return Ok(TransactionStatus::Pending);
        }
        if status.get("err").is_some_and(|e| !e.is_null()) {
            return Ok(TransactionStatus::Failed);
        }
        match status.get("confirmationStatus").and_then(Value::as_str) {
            Some("finalized") => Ok(TransactionStatus::Confirmed),
            _ => Ok(TransactionStatus::Pending),
        }
    }

    fn explorer_tx_url(&self, hash: &str) -> Option<String> {
        Some(format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), hash))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRpc;

    const BLOCKHASH: &str = "EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N";

    fn adapter(rpc: Arc<MockRpc>) -> SolanaAdapter {
        SolanaAdapter::new(rpc, "https://explorer.solana.com")
    }

    fn account(byte: u8) -> ([u8; 32], String) {
        let secret = [byte; 32];
        (secret, SolanaAddress::from_secret(&secret))
    }

    #[tokio::test]
    async fn test_get_balance() {
        let (_, address) = account(1);
        let rpc = Arc::new(MockRpc::new());
        rpc.respond(
            "getBalance",
            json!({ "context": { "slot": 1 }, "value": 2_500_000_000u64 }),
        );

        let balance = adapter(rpc).get_balance(&address).await.unwrap();
        assert_eq!(balance.raw, 2_500_000_000);
        assert_eq!(balance.formatted, "2.5");
        assert_eq!(balance.symbol, "SOL");
    }

    #[tokio::test]
    async fn test_malformed_balance_is_unavailable() {
        let (_, address) = account(1);
        let rpc = Arc::new(MockRpc::new());
        rpc.respond("getBalance", json!({ "value": "lots" }));
        assert!(matches!(
            adapter(rpc).get_balance(&address).await.unwrap_err(),
            WalletError::Chain(ChainError::BalanceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_estimate_fee() {
        let (_, from) = account(1);
        let (_, to) = account(2);
        let rpc = Arc::new(MockRpc::new());
        rpc.respond(
            "getLatestBlockhash",
            json!({ "value": { "blockhash": BLOCKHASH, "lastValidBlockHeight": 100 } }),
        );
        rpc.respond("getFeeForMessage", json!({ "value": 5000 }));

        let fee = adapter(rpc.clone())
            .estimate_network_fee(&from, &to, 1_000)
            .await
            .unwrap();
        assert_eq!(fee.fee_native, 5_000);
        assert_eq!(fee.fee_units, 1);
        assert_eq!(fee.fee_formatted, "0.000005");
        assert_eq!(rpc.calls("getFeeForMessage"), 1);
    }

    #[tokio::test]
    async fn test_fee_null_is_unavailable() {
        let (_, from) = account(1);
        let (_, to) = account(2);
        let rpc = Arc::new(MockRpc::new());
        rpc.respond("getLatestBlockhash", json!({ "value": { "blockhash": BLOCKHASH } }));
        rpc.respond("getFeeForMessage", json!({ "value": null }));

        assert!(matches!(
            adapter(rpc).estimate_network_fee(&from, &to, 1).await.unwrap_err(),
            WalletError::Chain(ChainError::FeeUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_prepare_sign_broadcast() {
        let (secret, from) = account(3);
        let (_, to) = account(4);
        let rpc = Arc::new(MockRpc::new());
        rpc.respond("getLatestBlockhash", json!({ "value": { "blockhash": BLOCKHASH } }));

        let adapter = adapter(rpc.clone());
        let plan = adapter.prepare_transfer(&from, &to, 1_000_000).await.unwrap();
        let key = KeyMaterial::from_raw(Chain::Solana, secret);
        let signed = adapter.sign(&plan, &key).unwrap();

        rpc.respond("sendTransaction", json!(signed.hash.clone()));
        assert_eq!(adapter.broadcast(&signed).await.unwrap(), signed.hash);
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let cases = [
            (json!({ "value": [null] }), TransactionStatus::Pending),
            (
                json!({ "value": [{ "err": null, "confirmationStatus": "confirmed" }] }),
                TransactionStatus::Pending,
            ),
            (
                json!({ "value": [{ "err": null, "confirmationStatus": "finalized" }] }),
                TransactionStatus::Confirmed,
            ),
            (
                json!({ "value": [{ "err": { "InstructionError": [0, "Custom"] }, "confirmationStatus": "finalized" }] }),
                TransactionStatus::Failed,
            ),
        ];
        for (response, expected) in cases {
            let rpc = Arc::new(MockRpc::new());
            rpc.respond("getSignatureStatuses", response);
            assert_eq!(adapter(rpc).get_status("sig").await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_broadcast_timeout_is_unknown() {
        let rpc = Arc::new(MockRpc::new());
        rpc.fail("sendTransaction", TransportError::Timeout("30s".into()));
        let signed = SignedTransaction {
            chain: Chain::Solana,
            raw: vec![1; 100],
            hash: "sig".into(),
            fee: None,
        };
        assert!(matches!(
            adapter(rpc).broadcast(&signed).await.unwrap_err(),
            WalletError::Chain(ChainError::BroadcastOutcomeUnknown(_))
        ));
    }

    #[test]
    fn test_rejects_evm_address() {
        let adapter = adapter(Arc::new(MockRpc::new()));
        assert!(!adapter
            .validate_address("0x9858EfFD232B4033E47d90003D41EC34EcaEda94")
            .is_valid);
    }
}
