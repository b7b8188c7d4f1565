// wallet-core/src/vault/kdf.rs
//
// Argon2id: credential + salt → 256-bit SessionKey
// Salt và cost parameters nằm trong KDF header (slot `vault/kdf`), không bí mật.

use crate::error::{CryptoError, VaultError, WalletResult};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Độ dài salt khi tạo header mới
pub const SALT_LEN: usize = 32;
/// Argon2 yêu cầu tối thiểu 8 bytes
const MIN_SALT_LEN: usize = 8;
const HEADER_VERSION: u8 = 1;
const ALGORITHM: &str = "argon2id";

// =============================================================================
// PARAMETERS
// =============================================================================

/// Argon2id cost parameters
///
/// | Parameter | Default | Meaning |
/// |-----------|---------|---------|
/// | `m_cost`  | 65 536  | Memory (KiB) = 64 MiB |
/// | `t_cost`  | 3       | Iterations |
/// | `p_cost`  | 1       | Parallelism |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost: 65_536,
            t_cost: 3,
            p_cost: 1,
        }
    }
}

impl KdfParams {
    /// Tham số nhẹ cho tests
    pub const fn light() -> Self {
        Self {
            m_cost: 256,
            t_cost: 1,
            p_cost: 1,
        }
    }

    fn to_argon2(self) -> WalletResult<argon2::Params> {
        argon2::Params::new(self.m_cost, self.t_cost, self.p_cost, Some(SessionKey::LEN))
            .map_err(|e| CryptoError::Kdf(format!("invalid Argon2 parameters: {}", e)).into())
    }

    pub fn validate(&self) -> WalletResult<()> {
        self.to_argon2().map(|_| ())
    }
}

// =============================================================================
// SESSION KEY
// =============================================================================

/// Key mã hóa của vault. Chỉ tồn tại khi vault unlocked; zeroize khi drop.
/// Không Clone, không Debug.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; 32]);

impl SessionKey {
    pub const LEN: usize = 32;

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[cfg(test)]
    pub(crate) fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Argon2id(credential, salt) → SessionKey
pub fn derive_session_key(
    credential: &[u8],
    salt: &[u8],
    params: &KdfParams,
) -> WalletResult<SessionKey> {
    if salt.len() < MIN_SALT_LEN {
        return Err(CryptoError::Kdf(format!(
            "salt must be at least {} bytes, got {}",
            MIN_SALT_LEN,
            salt.len()
        ))
        .into());
    }

    let argon2 = argon2::Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        params.to_argon2()?,
    );

    let mut output = [0u8; SessionKey::LEN];
    argon2
        .hash_password_into(credential, salt, &mut output)
        .map_err(|e| CryptoError::Kdf(format!("Argon2id derivation failed: {}", e)))?;

    Ok(SessionKey(output))
}

// =============================================================================
// HEADER
// =============================================================================

/// KDF header lưu plaintext cạnh ciphertext
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KdfHeader {
    pub version: u8,
    pub algorithm: String,
    #[serde(with = "hex::serde")]
    pub salt: Vec<u8>,
    pub params: KdfParams,
}

impl KdfHeader {
    /// Header mới với salt ngẫu nhiên (OsRng)
    pub fn generate(params: KdfParams) -> Self {
        let mut salt = vec![0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        Self {
            version: HEADER_VERSION,
            algorithm: ALGORITHM.to_string(),
            salt,
            params,
        }
    }

    pub fn derive_key(&self, credential: &str) -> WalletResult<SessionKey> {
        derive_session_key(credential.as_bytes(), &self.salt, &self.params)
    }

    pub fn to_bytes(&self) -> WalletResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| VaultError::Corrupted(format!("kdf header: {}", e)).into())
    }

    pub fn from_bytes(bytes: &[u8]) -> WalletResult<Self> {
        let header: Self = serde_json::from_slice(bytes)
            .map_err(|e| VaultError::Corrupted(format!("kdf header: {}", e)))?;
        if header.version != HEADER_VERSION || header.algorithm != ALGORITHM {
            return Err(VaultError::Corrupted(format!(
                "unsupported kdf header v{} ({})",
                header.version, header.algorithm
            ))
            .into());
        }
        Ok(header)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WalletError;

    const SALT: &[u8] = b"0123456789abcdef";

    #[test]
    fn test_derive_deterministic() {
        let params = KdfParams::light();
        let a = derive_session_key(b"correct horse battery staple", SALT, &params).unwrap();
        let b = derive_session_key(b"correct horse battery staple", SALT, &params).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.as_bytes(), &[0u8; 32]);
    }

    #[test]
    fn test_credential_and_salt_matter() {
        let params = KdfParams::light();
        let base = derive_session_key(b"pin-1234", SALT, &params).unwrap();
        let other_pw = derive_session_key(b"pin-1235", SALT, &params).unwrap();
        let other_salt = derive_session_key(b"pin-1234", b"fedcba9876543210", &params).unwrap();
        assert_ne!(base.as_bytes(), other_pw.as_bytes());
        assert_ne!(base.as_bytes(), other_salt.as_bytes());
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            derive_session_key(b"pw", b"short", &KdfParams::light()),
            Err(WalletError::Crypto(CryptoError::Kdf(_)))
        ));
        let zero_t = KdfParams {
            t_cost: 0,
            ..KdfParams::light()
        };
        assert!(derive_session_key(b"pw", SALT, &zero_t).is_err());
        assert!(zero_t.validate().is_err());
        assert!(KdfParams::default().validate().is_ok());
    }

    #[test]
    fn test_header_roundtrip() {
        let header = KdfHeader::generate(KdfParams::light());
        assert_eq!(header.salt.len(), SALT_LEN);

        let parsed = KdfHeader::from_bytes(&header.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(
            parsed.derive_key("pw").unwrap().as_bytes(),
            header.derive_key("pw").unwrap().as_bytes()
        );

        // Salt mới mỗi lần
        assert_ne!(KdfHeader::generate(KdfParams::light()).salt, header.salt);
    }

    #[test]
    fn test_header_corrupted() {
        assert!(matches!(
            KdfHeader::from_bytes(b"not json"),
            Err(WalletError::Vault(VaultError::Corrupted(_)))
        ));
    }
}
