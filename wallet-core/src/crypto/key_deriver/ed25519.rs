// wallet-core/src/crypto/key_deriver/ed25519.rs
//
// Ed25519 Key Derivation - SLIP-0010 Standard
//
// Dùng cho: Solana
// Algorithm: HMAC-SHA512 (khác BIP-32, chỉ hỗ trợ hardened derivation)
// Reference: https://github.com/satoshilabs/slips/blob/master/slip-0010.md
//
// QUAN TRỌNG: Tất cả levels trong path PHẢI là hardened (có dấu ').
// VD: m/44'/501'/0'/0' (OK)    m/44'/501'/0'/0 (INVALID)

use crate::error::{CryptoError, WalletError, WalletResult};
use hmac::{Hmac, Mac};
use sha2::Sha512;
use zeroize::{Zeroize, Zeroizing};

type HmacSha512 = Hmac<Sha512>;

const HARDENED_OFFSET: u32 = 0x8000_0000;

fn derivation_failed(msg: String) -> WalletError {
    WalletError::Crypto(CryptoError::DerivationFailed(msg))
}

/// Ed25519 Key Deriver - SLIP-0010
///
/// # Khác biệt với secp256k1 (BIP-32)
/// - Master key seed: "ed25519 seed" (thay vì "Bitcoin seed")
/// - Chỉ hardened derivation (index >= 2^31)
/// - Mọi 32 bytes đều là private key hợp lệ
pub struct Ed25519Deriver;

impl Ed25519Deriver {
    const MASTER_SECRET: &'static [u8] = b"ed25519 seed";

    /// Derive ed25519 private key từ seed + path (all hardened)
    pub fn derive(seed: &[u8], path: &str) -> WalletResult<Zeroizing<[u8; 32]>> {
        let indices = Self::parse_path(path)?;

        // I = HMAC-SHA512(Key = "ed25519 seed", Data = seed)
        let (mut key, mut chain_code) = Self::hmac_split(Self::MASTER_SECRET, &[seed])?;

        // I = HMAC-SHA512(Key = chain_code, Data = 0x00 || key || ser32(index'))
        for index in indices {
            let hardened = (index | HARDENED_OFFSET).to_be_bytes();
            let (child_key, child_chain) =
                Self::hmac_split(&chain_code, &[&[0x00u8][..], &key[..], &hardened[..]])?;
            key.zeroize();
            chain_code.zeroize();
            key = child_key;
            chain_code = child_chain;
        }

        chain_code.zeroize();
        Ok(Zeroizing::new(key))
    }

    /// HMAC-SHA512 rồi tách IL (key) / IR (chain code)
    fn hmac_split(mac_key: &[u8], parts: &[&[u8]]) -> WalletResult<([u8; 32], [u8; 32])> {
        let mut mac = HmacSha512::new_from_slice(mac_key)
            .map_err(|e| derivation_failed(format!("HMAC init failed: {}", e)))?;
        for part in parts {
            mac.update(part);
        }
        let result = mac.finalize().into_bytes();

        // Copy vào stack buffer, rồi zeroize
        let mut buf = [0u8; 64];
        buf.copy_from_slice(&result);

        let mut key = [0u8; 32];
        let mut chain_code = [0u8; 32];
        key.copy_from_slice(&buf[..32]);
        chain_code.copy_from_slice(&buf[32..]);
        buf.zeroize();

        Ok((key, chain_code))
    }

    /// "m/44'/501'/0'/0'" → [44, 501, 0, 0]
    fn parse_path(path: &str) -> WalletResult<Vec<u32>> {
        let path = path.trim();

        let segments = path
            .strip_prefix("m/")
            .ok_or_else(|| derivation_failed(format!("Path must start with 'm/': {}", path)))?;

        if segments.is_empty() {
            return Err(derivation_failed("Empty derivation path".to_string()));
        }

        let mut indices = Vec::new();
        for segment in segments.split('/').map(str::trim).filter(|s| !s.is_empty()) {
            let num_str = segment
                .strip_suffix('\'')
                .or_else(|| segment.strip_suffix('h'))
                .ok_or_else(|| {
                    derivation_failed(format!(
                        "Ed25519 SLIP-0010 requires ALL levels to be hardened. Invalid segment: '{}'",
                        segment
                    ))
                })?;

            let index: u32 = num_str
                .parse()
                .map_err(|e| derivation_failed(format!("Invalid index '{}': {}", num_str, e)))?;
            if index >= HARDENED_OFFSET {
                return Err(derivation_failed(format!("Index out of range: {}", index)));
            }
            indices.push(index);
        }

        Ok(indices)
    }
}

// =============================================================================
// TESTS
// =============================================================================
