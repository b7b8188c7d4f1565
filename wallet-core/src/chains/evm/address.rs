// wallet-core/src/chains/evm/address.rs
//
// EVM Address Module
// EIP-55 (Checksum), Keccak-256, secp256k1

use crate::error::{CryptoError, WalletError, WalletResult};
use crate::network::models::AddressValidation;
use alloy::primitives::Address;
use k256::{elliptic_curve::sec1::ToEncodedPoint, SecretKey};
use tiny_keccak::{Hasher, Keccak};
use zeroize::{Zeroize, Zeroizing};

/// EVM Address Generator
///
/// # Flow:  Private Key (32B) → Public Key (64B) → Keccak256 → Address (20B)
///
/// Ethereum, Polygon, BNB dùng chung address cho cùng một key.
pub struct EvmAddress;

impl EvmAddress {
    // =========================================================================
    // CORE: Private Key → Address Bytes (20 bytes)
    // =========================================================================

    /// # Algorithm (chuẩn Ethereum Yellow Paper)
    /// 1. `priv_key` (32B) → secp256k1 → `pub_key` (uncompressed, 65B)
    /// 2. Bỏ prefix byte 0x04 → `pub_key_raw` (64B)
    /// 3. Keccak-256(`pub_key_raw`) → `hash` (32B)
    /// 4. `hash[12..32]` → `address` (20B)
    pub fn derive_bytes_from_slice(priv_key: &[u8]) -> WalletResult<[u8; 20]> {
        let secret_key = SecretKey::from_slice(priv_key).map_err(|e| {
            WalletError::Crypto(CryptoError::InvalidKeyFormat(format!(
                "Invalid secp256k1 private key: {}",
                e
            )))
        })?;

        let public_key = secret_key.public_key();
        let encoded = Zeroizing::new(public_key.to_encoded_point(false));
        let pub_key_raw = &encoded.as_bytes()[1..]; // Bỏ 0x04 prefix

        let mut hasher = Keccak::v256();
        let mut hash = [0u8; 32];
        hasher.update(pub_key_raw);
        hasher.finalize(&mut hash);

        let mut address = [0u8; 20];
        address.copy_from_slice(&hash[12..]);
        hash.zeroize();

        Ok(address)
    }

    /// EIP-55 checksummed address
    ///
    /// `"0x9858EfFD232B4033E47d90003D41EC34EcaEda94"`
    #[inline]
    pub fn derive_from_slice(priv_key: &[u8]) -> WalletResult<String> {
        let bytes = Self::derive_bytes_from_slice(priv_key)?;
        Ok(Address::from_slice(&bytes).to_checksum(None))
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    /// `0x` + 40 hex. Mixed case → phải đúng EIP-55 checksum.
    pub fn validate(address: &str) -> AddressValidation {
        let Some(body) = address.strip_prefix("0x") else {
            return AddressValidation::invalid("EVM address must start with 0x");
        };
        if body.len() != 40 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
            return AddressValidation::invalid("EVM address must be 0x followed by 40 hex characters");
        }

        let is_mixed_case = body.chars().any(|c| c.is_ascii_lowercase())
            && body.chars().any(|c| c.is_ascii_uppercase());

        let parsed = if is_mixed_case {
            Address::parse_checksummed(address, None)
                .map_err(|_| "EIP-55 checksum mismatch".to_string())
        } else {
            address.parse::<Address>().map_err(|e| e.to_string())
        };

        match parsed {
            Ok(addr) => AddressValidation::valid(addr.to_checksum(None)),
            Err(reason) => AddressValidation::invalid(reason),
        }
    }

    #[inline]
    pub fn is_valid(address: &str) -> bool {
        Self::validate(address).is_valid
    }

    /// Parse sang `alloy::Address` (sau khi validate)
    pub fn parse(address: &str) -> WalletResult<Address> {
        let validation = Self::validate(address);
        if !validation.is_valid {
            return Err(WalletError::Validation(format!(
                "Invalid EVM address '{}': {}",
                address,
                validation.error.unwrap_or_default()
            )));
        }
        address
            .parse()
            .map_err(|e| WalletError::Validation(format!("Invalid EVM address: {}", e)))
    }

    /// So sánh 2 address (case-insensitive)
    #[inline]
    pub fn equals(addr1: &str, addr2: &str) -> bool {
        match (addr1.parse::<Address>(), addr2.parse::<Address>()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
