// wallet-core/src/chains/bitcoin/provider.rs
//
// Bitcoin Chain Adapter - Esplora/Blockstream REST API qua `RestClient`
//
// Endpoints:
// - GET  /address/{a}          balance (chain_stats)
// - GET  /address/{a}/utxo     UTXOs
// - GET  /fee-estimates        sat/vB theo confirmation target
// - POST /tx                   broadcast (hex body → txid)
// - GET  /tx/{txid}/status     confirmation

use crate::chains::bitcoin::transaction::{build_signed_transaction, estimate_vsize, select_utxos, Utxo};
use crate::chains::bitcoin::BitcoinAddress;
use crate::chains::{SignedTransaction, TransferPlan};
use crate::crypto::hd::KeyMaterial;
use crate::error::{ChainError, CryptoError, WalletError, WalletResult};
use crate::network::models::{AddressValidation, Balance, Chain, ChainFamily, FeeEstimate, TransactionStatus};
use crate::network::traits::ChainAdapter;
use crate::network::transport::{RestClient, TransportError, TransportResult};
use async_trait::async_trait;
use bitcoin::Network;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Confirmation target dùng cho fee (blocks)
pub const FEE_TARGET_BLOCKS: &str = "6";

// =============================================================================
// ESPLORA MODELS
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChainStats {
    #[serde(default)]
    pub funded_txo_sum: u64,
    #[serde(default)]
    pub spent_txo_sum: u64,
    #[serde(default)]
    pub tx_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddressInfo {
    pub address: String,
    #[serde(default)]
    pub chain_stats: ChainStats,
}

impl AddressInfo {
    /// Confirmed balance = funded − spent
    pub fn confirmed_balance(&self) -> u64 {
        self.chain_stats
            .funded_txo_sum
            .saturating_sub(self.chain_stats.spent_txo_sum)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TxStatus {
    pub confirmed: bool,
    #[serde(default)]
    pub block_height: Option<u64>,
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> TransportResult<T> {
    serde_json::from_value(value).map_err(|e| TransportError::Malformed(e.to_string()))
}

/// `{"1": 87.88, "3": 40.1, "6": 20.2, ...}` → sat/vB (làm tròn lên, tối thiểu 1)
pub fn parse_fee_rate(estimates: &Value, target: &str) -> TransportResult<u64> {
    let rate = estimates
        .get(target)
        .and_then(Value::as_f64)
        .ok_or_else(|| TransportError::Malformed(format!("no fee estimate for target {}", target)))?;
    if !rate.is_finite() || rate < 0.0 {
        return Err(TransportError::Malformed(format!("invalid fee rate {}", rate)));
    }
    Ok((rate.ceil() as u64).max(1))
}

// =============================================================================
// ADAPTER
// =============================================================================

pub struct BitcoinAdapter {
    network: Network,
    rest: Arc<dyn RestClient>,
    explorer_url: String,
}

impl BitcoinAdapter {
    pub fn new(network: Network, rest: Arc<dyn RestClient>, explorer_url: impl Into<String>) -> Self {
        Self {
            network,
            rest,
            explorer_url: explorer_url.into(),
        }
    }

    #[inline]
    pub fn network(&self) -> Network {
        self.network
    }

    fn require_address(&self, address: &str) -> WalletResult<()> {
        if BitcoinAddress::validate(address, self.network).is_valid {
            Ok(())
        } else {
            Err(ChainError::InvalidAddress {
                chain: Chain::Bitcoin.to_string(),
                address: address.to_string(),
            }
            .into())
        }
    }

    async fn fee_rate(&self) -> TransportResult<u64> {
        let estimates = self.rest.get_json("/fee-estimates").await?;
        parse_fee_rate(&estimates, FEE_TARGET_BLOCKS)
    }

    async fn utxos(&self, address: &str) -> TransportResult<Vec<Utxo>> {
        self.rest
            .get_json(&format!("/address/{}/utxo", address))
            .await
            .and_then(decode)
    }
}

#[async_trait]
impl ChainAdapter for BitcoinAdapter {
    fn chain(&self) -> Chain {
        Chain::Bitcoin
    }

    fn validate_address(&self, address: &str) -> AddressValidation {
        BitcoinAddress::validate(address, self.network)
    }

    /// P2WPKH cho network đã cấu hình (mainnet `bc1q`, testnet `tb1q`)
    fn derive_address(&self, key: &KeyMaterial) -> WalletResult<String> {
        if key.chain().family() != ChainFamily::Utxo {
            return Err(CryptoError::InvalidKeyFormat(format!(
                "key for {} cannot produce a bitcoin address",
                key.chain()
            ))
            .into());
        }
        BitcoinAddress::p2wpkh_from_secret(key.secret(), self.network).map(|a| a.to_string())
    }

    async fn get_balance(&self, address: &str) -> WalletResult<Balance> {
        self.require_address(address)?;

        let info: AddressInfo = self
            .rest
            .get_json(&format!("/address/{}", address))
            .await
            .and_then(decode)
            .map_err(|e| {
                tracing::warn!(%address, error = %e, "bitcoin balance query failed");
                ChainError::BalanceUnavailable(e.to_string())
            })?;

        Ok(Balance::native(Chain::Bitcoin, info.confirmed_balance() as u128))
    }

    async fn estimate_network_fee(
        &self,
        from: &str,
        to: &str,
        _amount: u128,
    ) -> WalletResult<FeeEstimate> {
        self.require_address(from)?;
        self.require_address(to)?;

        let fee_rate = self
            .fee_rate()
            .await
            .map_err(|e| ChainError::FeeUnavailable(e.to_string()))?;

        // 1 input + recipient + change
        Ok(FeeEstimate::new(Chain::Bitcoin, fee_rate as u128, estimate_vsize(1, 2)))
    }

    async fn prepare_transfer(
        &self,
        from: &str,
        to: &str,
        amount: u128,
    ) -> WalletResult<TransferPlan> {
        self.require_address(from)?;
        self.require_address(to)?;
        let amount = u64::try_from(amount)
            .map_err(|_| WalletError::Validation(format!("{} sats exceeds bitcoin supply", amount)))?;

        let utxos = self
            .utxos(from)
            .await
            .map_err(|e| ChainError::BalanceUnavailable(format!("utxo query: {}", e)))?;
        let fee_rate = self
            .fee_rate()
            .await
            .map_err(|e| ChainError::FeeUnavailable(e.to_string()))?;

        let selection = select_utxos(&utxos, amount, fee_rate)?;
        tracing::debug!(
            inputs = selection.selected.len(),
            fee = selection.fee,
            change = selection.change,
            "selected utxos"
        );

        Ok(TransferPlan::Bitcoin {
            utxos: selection.selected,
            to: to.to_string(),
            amount,
            fee_rate,
            change_address: from.to_string(),
        })
    }

    fn sign(&self, plan: &TransferPlan, key: &KeyMaterial) -> WalletResult<SignedTransaction> {
        let TransferPlan::Bitcoin {
            utxos,
            to,
            amount,
            fee_rate,
            change_address,
        } = plan
        else {
            return Err(CryptoError::SigningFailed(format!(
                "bitcoin adapter cannot sign a {:?} plan",
                plan.family()
            ))
            .into());
        };
        if key.chain().family() != ChainFamily::Utxo {
            return Err(CryptoError::InvalidKeyFormat(format!(
                "key for {} cannot sign bitcoin transactions",
                key.chain()
            ))
            .into());
        }

        let signed = build_signed_transaction(
            utxos,
            to,
            *amount,
            *fee_rate,
            change_address,
            key.secret(),
            self.network,
        )?;

        Ok(SignedTransaction {
            chain: Chain::Bitcoin,
            raw: signed.raw,
            hash: signed.txid,
            fee: Some(signed.fee as u128),
        })
    }

    async fn broadcast(&self, signed: &SignedTransaction) -> WalletResult<String> {
        match self.rest.post_text("/tx", hex::encode(&signed.raw)).await {
            Ok(txid) => {
                let txid = txid.trim().to_string();
                tracing::info!(%txid, "bitcoin transaction broadcast");
                Ok(txid)
            }
            Err(TransportError::Rejected { message, .. }) => {
                tracing::warn!(%message, "bitcoin broadcast rejected");
                Err(ChainError::Broadcast(message).into())
            }
            Err(e) => {
                tracing::warn!(txid = %signed.hash, error = %e, "bitcoin broadcast outcome unknown");
                Err(ChainError::BroadcastOutcomeUnknown(e.to_string()).into())
            }
        }
    }

    async fn get_status(&self, hash: &str) -> WalletResult<TransactionStatus> {
        let status: TxStatus = self
            .rest
            .get_json(&format!("/tx/{}/status", hash))
            .await
            .and_then(decode)
            .map_err(|e| ChainError::StatusUnknown(e.to_string()))?;

        Ok(if status.confirmed {
            TransactionStatus::Confirmed
        } else {
            TransactionStatus::Pending
        })
    }

    fn explorer_tx_url(&self, hash: &str) -> Option<String> {
        Some(format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), hash))
    }
}

// =============================================================================
// TESTS
// =============================================================================
