// wallet-core/src/vault/cipher.rs
//
// XChaCha20-Poly1305 AEAD
// - Nonce 192-bit ngẫu nhiên mỗi lần encrypt (OsRng), không bao giờ reuse
// - Tên slot là associated data: blob chép sang slot khác sẽ không decrypt được

use crate::error::{CryptoError, VaultError, WalletResult};
use crate::vault::kdf::SessionKey;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

pub const NONCE_LEN: usize = 24;
pub const TAG_LEN: usize = 16;
const ENVELOPE_VERSION: u8 = 1;

/// Ciphertext + metadata, serialize thành JSON bytes cho persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedSecret {
    pub version: u8,
    #[serde(with = "hex::serde")]
    pub nonce: Vec<u8>,
    /// ciphertext || tag
    #[serde(with = "hex::serde")]
    pub ciphertext: Vec<u8>,
    /// ms since epoch
    pub created_at: i64,
}

impl EncryptedSecret {
    pub fn to_bytes(&self) -> WalletResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| VaultError::Corrupted(e.to_string()).into())
    }

    pub fn from_bytes(slot: &str, bytes: &[u8]) -> WalletResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| VaultError::Corrupted(format!("{}: {}", slot, e)).into())
    }
}

fn cipher(key: &SessionKey) -> XChaCha20Poly1305 {
    XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()))
}

/// Mã hóa `plaintext` cho slot `aad`
pub fn encrypt(plaintext: &[u8], key: &SessionKey, aad: &[u8]) -> WalletResult<EncryptedSecret> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = cipher(key)
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    Ok(EncryptedSecret {
        version: ENVELOPE_VERSION,
        nonce: nonce.to_vec(),
        ciphertext,
        created_at: Utc::now().timestamp_millis(),
    })
}

/// Giải mã; tag được verify trước khi trả plaintext.
/// Sai key, sai slot hoặc bị sửa → `CryptoError::Decryption`.
pub fn decrypt(secret: &EncryptedSecret, key: &SessionKey, aad: &[u8]) -> WalletResult<Zeroizing<Vec<u8>>> {
    if secret.version != ENVELOPE_VERSION
        || secret.nonce.len() != NONCE_LEN
        || secret.ciphertext.len() < TAG_LEN
    {
        return Err(CryptoError::Decryption.into());
    }

    cipher(key)
        .decrypt(
            XNonce::from_slice(&secret.nonce),
            Payload {
                msg: &secret.ciphertext,
                aad,
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::Decryption.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WalletError;

    fn key(byte: u8) -> SessionKey {
        SessionKey::from_bytes([byte; 32])
    }

    #[test]
    fn test_roundtrip() {
        let k = key(1);
        let plaintext = b"abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
        let secret = encrypt(plaintext, &k, b"vault/mnemonic").unwrap();

        assert_eq!(secret.nonce.len(), NONCE_LEN);
        assert_eq!(secret.ciphertext.len(), plaintext.len() + TAG_LEN);
        assert_eq!(&decrypt(&secret, &k, b"vault/mnemonic").unwrap()[..], &plaintext[..]);

        let empty = encrypt(b"", &k, b"x").unwrap();
        assert!(decrypt(&empty, &k, b"x").unwrap().is_empty());
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let k = key(1);
        let a = encrypt(b"same", &k, b"slot").unwrap();
        let b = encrypt(b"same", &k, b"slot").unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_wrong_key() {
        let secret = encrypt(b"secret", &key(1), b"slot").unwrap();
        assert_eq!(
            decrypt(&secret, &key(2), b"slot").unwrap_err(),
            WalletError::Crypto(CryptoError::Decryption)
        );
    }

    #[test]
    fn test_tampering_detected() {
        let k = key(3);
        let secret = encrypt(b"secret payload", &k, b"slot").unwrap();

        for i in 0..secret.ciphertext.len() {
            let mut tampered = secret.clone();
            tampered.ciphertext[i] ^= 0x01;
            assert!(decrypt(&tampered, &k, b"slot").is_err(), "byte {} flip undetected", i);
        }

        let mut bad_nonce = secret.clone();
        bad_nonce.nonce[0] ^= 0xff;
        assert!(decrypt(&bad_nonce, &k, b"slot").is_err());

        let mut truncated = secret.clone();
        truncated.ciphertext.truncate(4);
        assert!(decrypt(&truncated, &k, b"slot").is_err());
    }

    #[test]
    fn test_slot_binding() {
        let k = key(4);
        let secret = encrypt(b"state", &k, b"vault/secret/state").unwrap();
        assert!(decrypt(&secret, &k, b"vault/mnemonic").is_err());
    }

    #[test]
    fn test_serialization() {
        let k = key(5);
        let secret = encrypt(b"blob", &k, b"slot").unwrap();
        let bytes = secret.to_bytes().unwrap();
        let parsed = EncryptedSecret::from_bytes("slot", &bytes).unwrap();
        assert_eq!(parsed, secret);
        assert!(EncryptedSecret::from_bytes("slot", b"{}").is_err());
    }
}
