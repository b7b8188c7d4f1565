// wallet-core/src/chains/bitcoin/transaction.rs
//
// Bitcoin transaction building: coin selection + P2WPKH (BIP-143) signing

use crate::chains::bitcoin::BitcoinAddress;
use crate::error::{ChainError, CryptoError, WalletError, WalletResult};
use bitcoin::absolute::LockTime;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{Message, Secp256k1, SecretKey};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::Version;
use bitcoin::{Amount, Network, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// =============================================================================
// SIZE MODEL (P2WPKH)
// =============================================================================

/// version + locktime + overhead
pub const BASE_VBYTES: u64 = 10;
/// P2WPKH input (witness discounted)
pub const INPUT_VBYTES: u64 = 68;
/// P2WPKH output
pub const OUTPUT_VBYTES: u64 = 31;
/// Output nhỏ hơn mức này không được tạo
pub const DUST_LIMIT_SATS: u64 = 546;

#[inline]
pub const fn estimate_vsize(inputs: usize, outputs: usize) -> u64 {
    BASE_VBYTES + inputs as u64 * INPUT_VBYTES + outputs as u64 * OUTPUT_VBYTES
}

// =============================================================================
// TYPES
// =============================================================================

/// UTXO (Esplora `/address/{a}/utxo`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    /// satoshi
    pub value: u64,
    #[serde(default)]
    pub status: UtxoStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoStatus {
    pub confirmed: bool,
    #[serde(default)]
    pub block_height: Option<u64>,
}

/// Kết quả chọn coin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinSelection {
    pub selected: Vec<Utxo>,
    pub total_input: u64,
    pub fee: u64,
    /// 0 nếu change ≤ dust (phần dư nhập vào phí)
    pub change: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedBitcoinTransaction {
    pub raw: Vec<u8>,
    pub txid: String,
    pub fee: u64,
}

// =============================================================================
// COIN SELECTION
// =============================================================================

/// Greedy largest-first
pub fn select_utxos(utxos: &[Utxo], amount: u64, fee_rate: u64) -> WalletResult<CoinSelection> {
    if amount == 0 {
        return Err(WalletError::Validation("amount must be positive".to_string()));
    }

    let mut sorted = utxos.to_vec();
    sorted.sort_by(|a, b| b.value.cmp(&a.value));

    let mut selected: Vec<Utxo> = Vec::new();
    let mut total_input: u64 = 0;
    let mut target = amount.saturating_add(fee_rate.saturating_mul(estimate_vsize(1, 2)));

    for utxo in sorted {
        if total_input >= target {
            break;
        }
        total_input = total_input.saturating_add(utxo.value);
        selected.push(utxo);
        target = amount.saturating_add(fee_rate.saturating_mul(estimate_vsize(selected.len(), 2)));
    }

    if total_input < target {
        return Err(ChainError::InsufficientBalance {
            requested: format!("{} sats (including fee)", target),
            available: format!("{} sats", total_input),
        }
        .into());
    }

    let fee_with_change = fee_rate.saturating_mul(estimate_vsize(selected.len(), 2));
    let change = total_input - amount - fee_with_change;

    let (fee, change) = if change > DUST_LIMIT_SATS {
        (fee_with_change, change)
    } else {
        (total_input - amount, 0)
    };

    Ok(CoinSelection {
        selected,
        total_input,
        fee,
        change,
    })
}

// =============================================================================
// BUILD & SIGN
// =============================================================================

/// Build + ký transaction P2WPKH chi tiêu từ address của `secret`
pub fn build_signed_transaction(
    utxos: &[Utxo],
    to: &str,
    amount: u64,
    fee_rate: u64,
    change_address: &str,
    secret: &[u8; 32],
    network: Network,
) -> WalletResult<SignedBitcoinTransaction> {
    let selection = select_utxos(utxos, amount, fee_rate)?;

    let dest = BitcoinAddress::parse(to, network)?;
    let public_key = BitcoinAddress::public_key_from_secret(secret)?;
    let sender_script = ScriptBuf::new_p2wpkh(&public_key.wpubkey_hash());

    let input = selection
        .selected
        .iter()
        .map(|utxo| -> WalletResult<TxIn> {
            let txid = Txid::from_str(&utxo.txid)
                .map_err(|e| WalletError::Validation(format!("Invalid txid '{}': {}", utxo.txid, e)))?;
            Ok(TxIn {
                previous_output: OutPoint { txid, vout: utxo.vout },
                script_sig: ScriptBuf::new(),
                sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
                witness: Witness::default(),
            })
        })
        .collect::<WalletResult<Vec<_>>>()?;

    let mut output = vec![TxOut {
        value: Amount::from_sat(amount),
        script_pubkey: dest.script_pubkey(),
    }];
    if selection.change > 0 {
        let change = BitcoinAddress::parse(change_address, network)?;
        output.push(TxOut {
            value: Amount::from_sat(selection.change),
            script_pubkey: change.script_pubkey(),
        });
    }

    let mut tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input,
        output,
    };

    let secp = Secp256k1::signing_only();
    let secret_key = SecretKey::from_slice(secret)
        .map_err(|e| CryptoError::InvalidKeyFormat(format!("Invalid secp256k1 private key: {}", e)))?;

    let witnesses = {
        let mut cache = SighashCache::new(&tx);
        selection
            .selected
            .iter()
            .enumerate()
            .map(|(i, utxo)| -> WalletResult<Witness> {
                let sighash = cache
                    .p2wpkh_signature_hash(
                        i,
                        &sender_script,
                        Amount::from_sat(utxo.value),
                        EcdsaSighashType::All,
                    )
                    .map_err(|e| CryptoError::SigningFailed(format!("Sighash error: {}", e)))?;

                let message = Message::from_digest(sighash.to_byte_array());
                let signature = bitcoin::ecdsa::Signature {
                    signature: secp.sign_ecdsa(&message, &secret_key),
                    sighash_type: EcdsaSighashType::All,
                };
                Ok(Witness::p2wpkh(&signature, &public_key.0))
            })
            .collect::<WalletResult<Vec<_>>>()?
    };
    for (txin, witness) in tx.input.iter_mut().zip(witnesses) {
        txin.witness = witness;
    }

    let txid = tx.compute_txid().to_string();
    tracing::debug!(
        %txid,
        inputs = tx.input.len(),
        outputs = tx.output.len(),
        fee = selection.fee,
        "signed bitcoin transaction"
    );

    Ok(SignedBitcoinTransaction {
        raw: bitcoin::consensus::encode::serialize(&tx),
        txid,
        fee: selection.fee,
    })
}

// =============================================================================
// TESTS
// =============================================================================
