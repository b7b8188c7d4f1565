// wallet-core/src/error.rs
//
// Error taxonomy cho toàn bộ wallet core.
// Layout lồng nhau: WalletError bọc các lỗi theo từng domain.

use thiserror::Error;

pub type WalletResult<T> = std::result::Result<T, WalletError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("Mnemonic Error: {0}")]
    Mnemonic(#[from] MnemonicError),

    #[error("Cryptography Error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Chain Error: {0}")]
    Chain(#[from] ChainError),

    #[error("Vault Error: {0}")]
    Vault(#[from] VaultError),

    #[error("Validation Error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage Error: {0}")]
    Storage(String),

    #[error("Configuration Error: {0}")]
    Config(String),
}

impl WalletError {
    /// Lỗi tạm thời do remote (network/provider) - caller có thể thử lại.
    ///
    /// Lỗi crypto, input sai và broadcast bị từ chối KHÔNG retryable.
    /// `BroadcastOutcomeUnknown` cũng không: kết quả phải được xác định
    /// bằng cách poll status, không phải gửi lại.
    pub fn is_retryable(&self) -> bool {
        match self {
            WalletError::Chain(e) => e.is_retryable(),
            WalletError::Storage(_) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MnemonicError {
    #[error("Invalid word count: {0}. Expected 12, 15, 18, 21 or 24 words.")]
    InvalidWordCount(usize),

    #[error("Word '{0}' not found in the BIP39 wordlist.")]
    UnknownWord(String),

    #[error("Checksum validation failed.")]
    ChecksumFailed,

    #[error("BIP39 internal error: {0}")]
    Bip39Error(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Sai key hoặc ciphertext đã bị sửa - không phân biệt hai trường hợp.
    #[error("Decryption failed: wrong key or tampered ciphertext")]
    Decryption,

    #[error("Key stretching failed: {0}")]
    Kdf(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("Unsupported chain: {0}")]
    UnsupportedChain(String),

    #[error("Invalid {chain} address: {address}")]
    InvalidAddress { chain: String, address: String },

    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: String, available: String },

    #[error("Balance unavailable: {0}")]
    BalanceUnavailable(String),

    #[error("Fee unavailable: {0}")]
    FeeUnavailable(String),

    #[error("Broadcast rejected: {0}")]
    Broadcast(String),

    #[error("Broadcast outcome unknown: {0}")]
    BroadcastOutcomeUnknown(String),

    #[error("Transaction status unknown: {0}")]
    StatusUnknown(String),

    #[error("Price unavailable: {0}")]
    PriceUnavailable(String),

    #[error("Swap quote unavailable: {0}")]
    QuoteUnavailable(String),

    #[error("Account {0} is watch-only and cannot sign")]
    WatchOnly(String),
}

impl ChainError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChainError::BalanceUnavailable(_)
                | ChainError::FeeUnavailable(_)
                | ChainError::StatusUnknown(_)
                | ChainError::PriceUnavailable(_)
                | ChainError::QuoteUnavailable(_)
        )
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VaultError {
    #[error("No wallet has been created on this device")]
    NotInitialized,

    #[error("A wallet already exists on this device")]
    AlreadyInitialized,

    #[error("Vault is locked")]
    Locked,

    #[error("User verification was declined")]
    VerificationFailed,

    #[error("Corrupted vault record '{0}'")]
    Corrupted(String),
}
