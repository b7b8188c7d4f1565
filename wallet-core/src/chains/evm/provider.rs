// wallet-core/src/chains/evm/provider.rs
//
// EVM Chain Adapter - JSON-RPC (eth_*) qua `RpcClient`
// Một instance cho mỗi EVM chain (Ethereum, Polygon, BNB).

use crate::chains::evm::{EvmAddress, EvmSigner};
use crate::chains::{EvmChainConfig, SignedTransaction, TransferPlan};
use crate::crypto::hd::KeyMaterial;
use crate::error::{ChainError, CryptoError, WalletError, WalletResult};
use crate::network::models::{
    AddressValidation, Balance, Chain, ChainFamily, FeeEstimate, TransactionStatus,
};
use crate::network::traits::ChainAdapter;
use crate::network::transport::{parse_hex_u128, parse_hex_u64, RpcClient, TransportError};
use alloy::primitives::U256;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// Gas của một native transfer không có calldata
pub const NATIVE_TRANSFER_GAS: u64 = 21_000;

pub struct EvmAdapter {
    chain: Chain,
    config: EvmChainConfig,
    rpc: Arc<dyn RpcClient>,
}

impl EvmAdapter {
    pub fn new(chain: Chain, config: EvmChainConfig, rpc: Arc<dyn RpcClient>) -> WalletResult<Self> {
        if chain.family() != ChainFamily::Evm {
            return Err(ChainError::UnsupportedChain(format!("{} is not an EVM chain", chain)).into());
        }
        Ok(Self { chain, config, rpc })
    }

    fn require_address(&self, address: &str) -> WalletResult<()> {
        if EvmAddress::is_valid(address) {
            Ok(())
        } else {
            Err(ChainError::InvalidAddress {
                chain: self.chain.to_string(),
                address: address.to_string(),
            }
            .into())
        }
    }

    fn hex_quantity(value: u128) -> String {
        format!("0x{:x}", value)
    }

    async fn gas_price(&self) -> Result<u128, TransportError> {
        let result = self.rpc.call("eth_gasPrice", json!([])).await?;
        parse_hex_u128(&result)
    }

    async fn estimate_gas(&self, from: &str, to: &str, amount: u128) -> Result<u64, TransportError> {
        let request = json!([{
            "from": from,
            "to": to,
            "value": Self::hex_quantity(amount),
        }]);
        let result = self.rpc.call("eth_estimateGas", request).await?;
        parse_hex_u64(&result)
    }

    async fn pending_nonce(&self, address: &str) -> Result<u64, TransportError> {
        let result = self
            .rpc
            .call("eth_getTransactionCount", json!([address, "pending"]))
            .await?;
        parse_hex_u64(&result)
    }
}

#[async_trait]
impl ChainAdapter for EvmAdapter {
    fn chain(&self) -> Chain {
        self.chain
    }

    fn validate_address(&self, address: &str) -> AddressValidation {
        EvmAddress::validate(address)
    }

    async fn get_balance(&self, address: &str) -> WalletResult<Balance> {
        self.require_address(address)?;

        let result = self
            .rpc
            .call("eth_getBalance", json!([address, "latest"]))
            .await
            .and_then(|v| parse_hex_u128(&v))
            .map_err(|e| {
                tracing::warn!(chain = %self.chain, %address, error = %e, "balance query failed");
                ChainError::BalanceUnavailable(e.to_string())
            })?;

        Ok(Balance::native(self.chain, result))
    }

    async fn estimate_network_fee(
        &self,
        from: &str,
        to: &str,
        amount: u128,
    ) -> WalletResult<FeeEstimate> {
        self.require_address(from)?;
        self.require_address(to)?;

        let gas_price = self
            .gas_price()
            .await
            .map_err(|e| ChainError::FeeUnavailable(format!("eth_gasPrice: {}", e)))?;
        let gas = self
            .estimate_gas(from, to, amount)
            .await
            .map_err(|e| ChainError::FeeUnavailable(format!("eth_estimateGas: {}", e)))?;

        Ok(FeeEstimate::new(self.chain, gas_price, gas))
    }

    async fn prepare_transfer(
        &self,
        from: &str,
        to: &str,
        amount: u128,
    ) -> WalletResult<TransferPlan> {
        self.require_address(from)?;
        self.require_address(to)?;

        let nonce = self
            .pending_nonce(from)
            .await
            .map_err(|e| ChainError::FeeUnavailable(format!("eth_getTransactionCount: {}", e)))?;
        let gas_price = self
            .gas_price()
            .await
            .map_err(|e| ChainError::FeeUnavailable(format!("eth_gasPrice: {}", e)))?;
        let gas_limit = self
            .estimate_gas(from, to, amount)
            .await
            .map_err(|e| ChainError::FeeUnavailable(format!("eth_estimateGas: {}", e)))?
            .max(NATIVE_TRANSFER_GAS);

        Ok(TransferPlan::Evm {
            chain_id: self.config.chain_id,
            nonce,
            gas_price,
            gas_limit,
            to: to.to_string(),
            value: amount,
        })
    }

    fn sign(&self, plan: &TransferPlan, key: &KeyMaterial) -> WalletResult<SignedTransaction> {
        let TransferPlan::Evm {
            chain_id,
            nonce,
            gas_price,
            gas_limit,
            to,
            value,
        } = plan
        else {
            return Err(CryptoError::SigningFailed(format!(
                "{} adapter cannot sign a {:?} plan",
                self.chain,
                plan.family()
            ))
            .into());
        };
        if key.chain().family() != ChainFamily::Evm {
            return Err(CryptoError::InvalidKeyFormat(format!(
                "key for {} cannot sign on {}",
                key.chain(),
                self.chain
            ))
            .into());
        }

        let signer = EvmSigner::new(key.secret(), *chain_id)?;
        let signed = signer.sign_transfer(
            *nonce,
            *gas_price,
            *gas_limit,
            EvmAddress::parse(to)?,
            U256::from(*value),
        )?;

        Ok(SignedTransaction {
            chain: self.chain,
            raw: signed.raw,
            hash: signed.hash.to_string(),
            fee: Some(gas_price.saturating_mul(*gas_limit as u128)),
        })
    }

    async fn broadcast(&self, signed: &SignedTransaction) -> WalletResult<String> {
        let raw = format!("0x{}", hex::encode(&signed.raw));
        match self.rpc.call("eth_sendRawTransaction", json!([raw])).await {
            Ok(Value::String(hash)) => {
                tracing::info!(chain = %self.chain, %hash, "transaction broadcast");
                Ok(hash)
            }
            Ok(other) => Err(ChainError::BroadcastOutcomeUnknown(format!(
                "unexpected eth_sendRawTransaction result: {}",
                other
            ))
            .into()),
            Err(TransportError::Rejected { message, .. }) => {
                tracing::warn!(chain = %self.chain, %message, "broadcast rejected");
                Err(ChainError::Broadcast(message).into())
            }
            Err(e) => {
                tracing::warn!(chain = %self.chain, hash = %signed.hash, error = %e, "broadcast outcome unknown");
                Err(ChainError::BroadcastOutcomeUnknown(e.to_string()).into())
            }
        }
    }

    async fn get_status(&self, hash: &str) -> WalletResult<TransactionStatus> {
        let receipt = self
            .rpc
            .call("eth_getTransactionReceipt", json!([hash]))
            .await
            .map_err(|e| ChainError::StatusUnknown(e.to_string()))?;

        if receipt.is_null() {
            return Ok(TransactionStatus::Pending);
        }
        match receipt.get("status").map(parse_hex_u64) {
            Some(Ok(1)) => Ok(TransactionStatus::Confirmed),
            Some(Ok(0)) => Ok(TransactionStatus::Failed),
            Some(Ok(other)) => Err(ChainError::StatusUnknown(format!("unknown receipt status {}", other)).into()),
            Some(Err(e)) => Err(ChainError::StatusUnknown(e.to_string()).into()),
            None => Err(WalletError::from(ChainError::StatusUnknown(
                "receipt without status field".to_string(),
            ))),
        }
    }

    fn explorer_tx_url(&self, hash: &str) -> Option<String> {
        Some(format!("{}/tx/{}", self.config.explorer_url.trim_end_matches('/'), hash))
    }
}

// =============================================================================
// TESTS
// =============================================================================
