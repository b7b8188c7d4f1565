// wallet-core/src/crypto/mnemonic.rs
//
// Mnemonic Module - BIP-39
// Chuẩn: BIP-39 (Mnemonic), PBKDF2-HMAC-SHA512 (Seed Derivation)

use crate::error::{MnemonicError, WalletError, WalletResult};
use bip39::{Language, Mnemonic};
use rand::{rngs::OsRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Số lượng words hợp lệ theo BIP-39
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordCount {
    /// 12 words (128-bit entropy)
    Twelve = 12,
    /// 15 words (160-bit entropy)
    Fifteen = 15,
    /// 18 words (192-bit entropy)
    Eighteen = 18,
    /// 21 words (224-bit entropy)
    TwentyOne = 21,
    /// 24 words (256-bit entropy)
    TwentyFour = 24,
}

impl WordCount {
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            12 => Some(WordCount::Twelve),
            15 => Some(WordCount::Fifteen),
            18 => Some(WordCount::Eighteen),
            21 => Some(WordCount::TwentyOne),
            24 => Some(WordCount::TwentyFour),
            _ => None,
        }
    }

    /// Số bytes entropy tương ứng
    #[inline]
    pub const fn entropy_bytes(self) -> usize {
        match self {
            WordCount::Twelve => 16,
            WordCount::Fifteen => 20,
            WordCount::Eighteen => 24,
            WordCount::TwentyOne => 28,
            WordCount::TwentyFour => 32,
        }
    }
}

/// Wallet Mnemonic - root secret của toàn bộ wallet
///
/// # Security Architecture
/// - **ZeroizeOnDrop**: Phrase bị ghi đè bằng 0 khi drop
/// - **CSPRNG**: Entropy từ `OsRng`
/// - **No Debug Leak**: Debug không bao giờ in phrase
///
/// Ví mới luôn là 24 words. Restore chấp nhận mọi độ dài BIP-39.
/// Không `Clone`: root secret chỉ có một bản trong memory.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct WalletMnemonic {
    phrase: String,
    word_count: usize,
}

// Custom Debug - KHÔNG BAO GIỜ hiển thị mnemonic phrase
impl std::fmt::Debug for WalletMnemonic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletMnemonic")
            .field("word_count", &self.word_count)
            .field("phrase", &"[REDACTED]")
            .finish()
    }
}

impl WalletMnemonic {
    // =========================================================================
    // CONSTRUCTORS
    // =========================================================================

    /// Tạo mnemonic mới: 256-bit entropy → 24 words
    pub fn generate() -> WalletResult<Self> {
        Self::with_word_count(WordCount::TwentyFour)
    }

    pub fn with_word_count(word_count: WordCount) -> WalletResult<Self> {
        let entropy_size = word_count.entropy_bytes();

        // Stack-allocated entropy buffer (max 32 bytes)
        let mut entropy = [0u8; 32];
        OsRng.fill_bytes(&mut entropy[..entropy_size]);

        let result = Mnemonic::from_entropy_in(Language::English, &entropy[..entropy_size]);
        entropy.zeroize();

        let mnemonic = result.map_err(|e| MnemonicError::Bip39Error(e.to_string()))?;

        Ok(Self {
            phrase: mnemonic.to_string(),
            word_count: word_count as usize,
        })
    }

    /// Khôi phục mnemonic từ phrase người dùng nhập
    ///
    /// Normalize whitespace + lowercase, rồi kiểm tra:
    /// số words → từng word trong wordlist → checksum.
    pub fn from_phrase(phrase: &str) -> WalletResult<Self> {
        // Bản lowercase cũng là secret → zeroize khi drop
        let words: Vec<Zeroizing<String>> = phrase
            .split_whitespace()
            .map(|w| Zeroizing::new(w.to_lowercase()))
            .collect();
        let count = words.len();

        if WordCount::from_count(count).is_none() {
            return Err(WalletError::Mnemonic(MnemonicError::InvalidWordCount(count)));
        }

        if let Some(bad) = words
            .iter()
            .find(|w| Language::English.find_word(w).is_none())
        {
            return Err(WalletError::Mnemonic(MnemonicError::UnknownWord(bad.as_str().to_string())));
        }

        let mut normalized_phrase = String::with_capacity(phrase.len());
        for (i, word) in words.iter().enumerate() {
            if i > 0 {
                normalized_phrase.push(' ');
            }
            normalized_phrase.push_str(word);
        }
        if let Err(e) = Mnemonic::parse_in_normalized(Language::English, &normalized_phrase) {
            normalized_phrase.zeroize();
            return Err(WalletError::Mnemonic(Self::map_bip39_error(e)));
        }

        Ok(Self {
            phrase: normalized_phrase,
            word_count: count,
        })
    }

    fn map_bip39_error(e: bip39::Error) -> MnemonicError {
        match e {
            bip39::Error::BadWordCount(n) => MnemonicError::InvalidWordCount(n),
            bip39::Error::UnknownWord(idx) => MnemonicError::UnknownWord(format!("#{}", idx)),
            bip39::Error::InvalidChecksum => MnemonicError::ChecksumFailed,
            other => MnemonicError::Bip39Error(other.to_string()),
        }
    }

    // =========================================================================
    // GETTERS
    // =========================================================================

    /// Lấy mnemonic phrase
    ///
    /// # Warning
    /// Chỉ dùng để hiển thị backup cho người dùng. KHÔNG log.
    #[inline]
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    #[inline]
    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn words(&self) -> Vec<&str> {
        self.phrase.split_whitespace().collect()
    }

    // =========================================================================
    // SEED DERIVATION
    // =========================================================================

    /// BIP-39 seed (PBKDF2-HMAC-SHA512, 2048 rounds)
    ///
    /// # Returns
    /// 64-byte seed trong `Zeroizing`, tự xóa khi drop
    pub fn to_seed(&self, passphrase: Option<&str>) -> WalletResult<Zeroizing<[u8; 64]>> {
        let mnemonic = Mnemonic::parse_in_normalized(Language::English, &self.phrase)
            .map_err(|e| WalletError::Mnemonic(Self::map_bip39_error(e)))?;
        Ok(Zeroizing::new(mnemonic.to_seed(passphrase.unwrap_or(""))))
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    /// Kiểm tra phrase: word count, wordlist, checksum
    #[inline]
    pub fn validate(phrase: &str) -> bool {
        Self::from_phrase(phrase).is_ok()
    }

    /// Một từ có trong BIP-39 English wordlist không
    pub fn is_valid_word(word: &str) -> bool {
        Language::English.find_word(word).is_some()
    }

    pub fn strength_bits(&self) -> usize {
        WordCount::from_count(self.word_count)
            .map(|w| w.entropy_bytes() * 8)
            .unwrap_or(0)
    }
}

// =============================================================================
// UNIT TESTS
// =============================================================================
