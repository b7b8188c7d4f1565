// wallet-core/src/vault/mod.rs

//! Encrypted Secret Store
//!
//! - **KDF**: Argon2id(credential, salt) → [`SessionKey`], header ở slot `vault/kdf`.
//! - **Cipher**: XChaCha20-Poly1305, slot name là associated data.
//! - **Store**: persistence qua [`KeyValueStore`] được inject.
//!
//! Mnemonic plaintext chỉ tồn tại bên trong [`Vault::with_mnemonic`].

pub mod cipher;
pub mod kdf;
pub mod store;

pub use cipher::{decrypt, encrypt, EncryptedSecret};
pub use kdf::{derive_session_key, KdfHeader, KdfParams, SessionKey};
pub use store::{KeyValueStore, MemoryStore};

use crate::crypto::WalletMnemonic;
use crate::error::{VaultError, WalletError, WalletResult};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

const KDF_SLOT: &str = "vault/kdf";
const MNEMONIC_SLOT: &str = "vault/mnemonic";
/// Danh sách tên các named secret (plaintext, không bí mật)
const INDEX_SLOT: &str = "vault/index";

fn secret_slot(name: &str) -> String {
    format!("vault/secret/{}", name)
}

/// Credential/biometric collaborator. Core chỉ dùng kết quả boolean.
#[async_trait]
pub trait UserVerifier: Send + Sync {
    async fn verify(&self) -> bool;
}

// =============================================================================
// VAULT
// =============================================================================

pub struct Vault {
    store: Arc<dyn KeyValueStore>,
    params: KdfParams,
    /// `Some` khi unlocked. Mutex cũng serialize mọi truy cập mnemonic.
    session: Mutex<Option<SessionKey>>,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("params", &self.params)
            .field("unlocked", &self.is_unlocked())
            .finish()
    }
}

impl Vault {
    /// `params` chỉ dùng khi tạo header mới; vault đã có dùng params trong header.
    pub fn new(store: Arc<dyn KeyValueStore>, params: KdfParams) -> Self {
        Self {
            store,
            params,
            session: Mutex::new(None),
        }
    }

    fn session(&self) -> MutexGuard<'_, Option<SessionKey>> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    pub fn is_initialized(&self) -> WalletResult<bool> {
        Ok(self.store.get(KDF_SLOT)?.is_some())
    }

    pub fn is_unlocked(&self) -> bool {
        self.session().is_some()
    }

    /// Tạo vault mới: KDF header + mnemonic đã mã hóa. Vault unlocked sau khi tạo.
    pub fn initialize(&self, credential: &str, mnemonic: &WalletMnemonic) -> WalletResult<()> {
        if self.is_initialized()? {
            return Err(VaultError::AlreadyInitialized.into());
        }

        let header = KdfHeader::generate(self.params);
        let key = header.derive_key(credential)?;
        let sealed = encrypt(mnemonic.phrase().as_bytes(), &key, MNEMONIC_SLOT.as_bytes())?;

        // Mnemonic trước, header sau: header là dấu hiệu vault tồn tại
        self.store.set(MNEMONIC_SLOT, sealed.to_bytes()?)?;
        self.store.set(KDF_SLOT, header.to_bytes()?)?;

        *self.session() = Some(key);
        info!(words = mnemonic.word_count(), "Vault initialized");
        Ok(())
    }

    /// Unlock: user verification → derive key → thử decrypt mnemonic một lần.
    /// Lỗi ở bất kỳ bước nào → vault vẫn locked.
    pub async fn unlock(&self, credential: &str, verifier: &dyn UserVerifier) -> WalletResult<()> {
        let header = self.load_header()?;

        if !verifier.verify().await {
            warn!("Vault unlock declined by user verification");
            return Err(VaultError::VerificationFailed.into());
        }

        let key = header.derive_key(credential)?;
        if let Err(e) = self.open_mnemonic(&key) {
            warn!("Vault unlock failed: {}", e);
            return Err(e);
        }

        *self.session() = Some(key);
        info!("Vault unlocked");
        Ok(())
    }

    pub fn lock(&self) {
        if self.session().take().is_some() {
            info!("Vault locked");
        }
    }

    /// Đổi credential: mọi slot của vault được mã hóa lại dưới salt mới.
    /// Chỉ khi đang unlocked: key mới không bao giờ được giữ nếu chưa qua `unlock`.
    pub fn change_credential(&self, old: &str, new: &str) -> WalletResult<()> {
        let mut session = self.session();
        if session.is_none() {
            return Err(VaultError::Locked.into());
        }

        let header = self.load_header()?;
        let old_key = header.derive_key(old)?;
        let mnemonic = self.open_mnemonic(&old_key)?;

        let names = self.secret_names()?;
        let mut secrets = Vec::with_capacity(names.len());
        for name in &names {
            let slot = secret_slot(name);
            if let Some(plaintext) = self.open_slot(&slot, &old_key)? {
                secrets.push((slot, plaintext));
            }
        }

        let new_header = KdfHeader::generate(header.params);
        let new_key = new_header.derive_key(new)?;

        // Mã hóa hết trước khi ghi
        let sealed_mnemonic = encrypt(
            mnemonic.phrase().as_bytes(),
            &new_key,
            MNEMONIC_SLOT.as_bytes(),
        )?
        .to_bytes()?;
        let mut sealed = Vec::with_capacity(secrets.len());
        for (slot, plaintext) in &secrets {
            sealed.push((slot, encrypt(plaintext, &new_key, slot.as_bytes())?.to_bytes()?));
        }

        self.store.set(MNEMONIC_SLOT, sealed_mnemonic)?;
        for (slot, blob) in sealed {
            self.store.set(slot, blob)?;
        }
        self.store.set(KDF_SLOT, new_header.to_bytes()?)?;

        *session = Some(new_key);
        info!(secrets = secrets.len(), "Vault credential changed");
        Ok(())
    }

    /// Xóa toàn bộ slot của vault và lock
    pub fn reset(&self) -> WalletResult<()> {
        let mut session = self.session();
        for name in self.secret_names()? {
            self.store.delete(&secret_slot(&name))?;
        }
        self.store.delete(INDEX_SLOT)?;
        self.store.delete(MNEMONIC_SLOT)?;
        self.store.delete(KDF_SLOT)?;
        *session = None;
        warn!("Vault reset, all secrets deleted");
        Ok(())
    }

    // =========================================================================
    // SCOPED ACCESS
    // =========================================================================

    /// Chạy `f` với mnemonic đã giải mã. Plaintext bị zeroize khi `f` trả về
    /// (kể cả khi lỗi). Mỗi lúc chỉ một operation giữ mnemonic.
    pub fn with_mnemonic<T>(
        &self,
        f: impl FnOnce(&WalletMnemonic) -> WalletResult<T>,
    ) -> WalletResult<T> {
        let session = self.session();
        let key = session.as_ref().ok_or(VaultError::Locked)?;
        let mnemonic = self.open_mnemonic(key)?;
        debug!("Mnemonic opened for scoped operation");
        f(&mnemonic)
    }

    // =========================================================================
    // NAMED SECRETS
    // =========================================================================

    pub fn put_secret(&self, name: &str, plaintext: &[u8]) -> WalletResult<()> {
        validate_name(name)?;
        let session = self.session();
        let key = session.as_ref().ok_or(VaultError::Locked)?;

        let slot = secret_slot(name);
        let sealed = encrypt(plaintext, key, slot.as_bytes())?;
        self.store.set(&slot, sealed.to_bytes()?)?;

        let mut names = self.secret_names()?;
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
            self.write_names(&names)?;
        }
        debug!(name, bytes = plaintext.len(), "Secret stored");
        Ok(())
    }

    /// `None` nếu chưa có secret tên này
    pub fn get_secret(&self, name: &str) -> WalletResult<Option<Zeroizing<Vec<u8>>>> {
        validate_name(name)?;
        let session = self.session();
        let key = session.as_ref().ok_or(VaultError::Locked)?;
        self.open_slot(&secret_slot(name), key)
    }

    pub fn delete_secret(&self, name: &str) -> WalletResult<()> {
        validate_name(name)?;
        let _session = self.session();
        self.store.delete(&secret_slot(name))?;
        let mut names = self.secret_names()?;
        names.retain(|n| n != name);
        self.write_names(&names)
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn load_header(&self) -> WalletResult<KdfHeader> {
        let bytes = self.store.get(KDF_SLOT)?.ok_or(VaultError::NotInitialized)?;
        KdfHeader::from_bytes(&bytes)
    }

    fn open_slot(&self, slot: &str, key: &SessionKey) -> WalletResult<Option<Zeroizing<Vec<u8>>>> {
        match self.store.get(slot)? {
            Some(bytes) => {
                let sealed = EncryptedSecret::from_bytes(slot, &bytes)?;
                decrypt(&sealed, key, slot.as_bytes()).map(Some)
            }
            None => Ok(None),
        }
    }

    fn open_mnemonic(&self, key: &SessionKey) -> WalletResult<WalletMnemonic> {
        let plaintext = self
            .open_slot(MNEMONIC_SLOT, key)?
            .ok_or_else(|| VaultError::Corrupted(MNEMONIC_SLOT.to_string()))?;
        let phrase = std::str::from_utf8(&plaintext)
            .map_err(|_| VaultError::Corrupted(MNEMONIC_SLOT.to_string()))?;
        WalletMnemonic::from_phrase(phrase)
    }

    fn secret_names(&self) -> WalletResult<Vec<String>> {
        match self.store.get(INDEX_SLOT)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| VaultError::Corrupted(format!("{}: {}", INDEX_SLOT, e)).into()),
            None => Ok(Vec::new()),
        }
    }

    fn write_names(&self, names: &[String]) -> WalletResult<()> {
        let bytes = serde_json::to_vec(names).map_err(|e| WalletError::Storage(e.to_string()))?;
        self.store.set(INDEX_SLOT, bytes)
    }
}

fn validate_name(name: &str) -> WalletResult<()> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(WalletError::Validation(format!("invalid secret name '{}'", name)));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
