// wallet-core/src/chains/evm/signer.rs
//
// EVM Signer Module - Offline Signing
// Native transfer: EIP-155 legacy transaction (replay protection qua chain id)

use crate::error::{CryptoError, WalletError, WalletResult};
use alloy::{
    consensus::{SignableTransaction, TxEnvelope, TxLegacy},
    eips::eip2718::Encodable2718,
    primitives::{keccak256, Address, Bytes, Signature, TxKind, B256, U256},
    signers::{local::PrivateKeySigner, SignerSync},
};

/// Kết quả ký: raw bytes sẵn sàng cho `eth_sendRawTransaction` + tx hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEvmTransaction {
    pub raw: Vec<u8>,
    pub hash: B256,
}

/// EVM Signer - Offline Signing
///
/// # Security Architecture
/// - **ZeroizeOnDrop**: `SigningKey` bên trong tự ghi đè bằng 0 khi Drop
/// - **Replay Protection**: Chain ID bắt buộc (EIP-155)
/// - **No Debug Leak**: Custom Debug không hiển thị private key
///
/// Signer chỉ sống trong một thao tác ký; không cache giữa các lần gửi.
pub struct EvmSigner {
    signer: PrivateKeySigner,
    address: Address,
    chain_id: u64,
}

// Custom Debug - KHÔNG BAO GIỜ hiển thị private key
impl std::fmt::Debug for EvmSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmSigner")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}

impl EvmSigner {
    // =========================================================================
    // CONSTRUCTOR
    // =========================================================================

    /// # Arguments
    /// * `priv_key` - Private key 32 bytes
    /// * `chain_id` - Chain ID (1 = Ethereum, 56 = BSC, 137 = Polygon)
    pub fn new(priv_key: &[u8], chain_id: u64) -> WalletResult<Self> {
        let signer = PrivateKeySigner::from_slice(priv_key).map_err(|e| {
            WalletError::Crypto(CryptoError::InvalidKeyFormat(format!(
                "Invalid private key (must be 32 bytes): {}",
                e
            )))
        })?;
        let address = signer.address();

        Ok(Self {
            signer,
            address,
            chain_id,
        })
    }

    #[inline]
    pub fn address(&self) -> Address {
        self.address
    }

    #[inline]
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    // =========================================================================
    // TRANSACTION SIGNING (EIP-155)
    // =========================================================================

    /// Build + ký native transfer (legacy, EIP-155)
    pub fn sign_transfer(
        &self,
        nonce: u64,
        gas_price: u128,
        gas_limit: u64,
        to: Address,
        value: U256,
    ) -> WalletResult<SignedEvmTransaction> {
        let tx = TxLegacy {
            chain_id: Some(self.chain_id),
            nonce,
            gas_price,
            gas_limit,
            to: TxKind::Call(to),
            value,
            input: Bytes::new(),
        };
        self.sign_legacy(tx)
    }

    /// Ký legacy tx, trả về RLP bytes + keccak hash
    pub fn sign_legacy(&self, tx: TxLegacy) -> WalletResult<SignedEvmTransaction> {
        if tx.chain_id != Some(self.chain_id) {
            return Err(WalletError::Crypto(CryptoError::SigningFailed(format!(
                "transaction chain id {:?} does not match signer chain id {}",
                tx.chain_id, self.chain_id
            ))));
        }

        let signature = self.sign_hash_sync(&tx.signature_hash())?;
        let envelope = TxEnvelope::Legacy(tx.into_signed(signature));
        let raw = envelope.encoded_2718();
        let hash = keccak256(&raw);

        tracing::debug!(from = %self.address, %hash, "signed EVM transaction");

        Ok(SignedEvmTransaction { raw, hash })
    }

    // =========================================================================
    // HASH SIGNING (Low-level)
    // =========================================================================

    /// Ký hash trực tiếp (32 bytes)
    pub fn sign_hash_sync(&self, hash: &B256) -> WalletResult<Signature> {
        self.signer
            .sign_hash_sync(hash)
            .map_err(|e| WalletError::Crypto(CryptoError::SigningFailed(e.to_string())))
    }
}

// =============================================================================
// UNIT TESTS
// =============================================================================
