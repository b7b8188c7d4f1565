// wallet-core/src/chains/solana/address.rs
//
// Solana address = base58(ed25519 public key, 32 bytes)

use crate::error::{WalletError, WalletResult};
use crate::network::models::AddressValidation;
use ed25519_dalek::SigningKey;

pub struct SolanaAddress;

impl SolanaAddress {
    /// Public key bytes từ 32-byte ed25519 seed (SLIP-0010 output)
    pub fn public_key_from_secret(priv_key: &[u8; 32]) -> [u8; 32] {
        SigningKey::from_bytes(priv_key).verifying_key().to_bytes()
    }

    pub fn from_secret(priv_key: &[u8; 32]) -> String {
        bs58::encode(Self::public_key_from_secret(priv_key)).into_string()
    }

    /// Base58 decode phải ra đúng 32 bytes
    pub fn decode(address: &str) -> WalletResult<[u8; 32]> {
        let bytes = bs58::decode(address)
            .into_vec()
            .map_err(|e| WalletError::Validation(format!("Invalid base58 '{}': {}", address, e)))?;
        bytes.try_into().map_err(|v: Vec<u8>| {
            WalletError::Validation(format!(
                "Solana address must decode to 32 bytes, got {}",
                v.len()
            ))
        })
    }

    pub fn validate(address: &str) -> AddressValidation {
        // Base58 của 32 bytes dài 32..=44 ký tự
        if !(32..=44).contains(&address.len()) {
            return AddressValidation::invalid("Solana address must be 32-44 base58 characters");
        }
        match Self::decode(address) {
            Ok(_) => AddressValidation::valid(address),
            Err(e) => AddressValidation::invalid(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_program_address() {
        // 32 zero bytes = System Program
        assert_eq!(
            bs58::encode([0u8; 32]).into_string(),
            "11111111111111111111111111111111"
        );
        assert!(SolanaAddress::validate("11111111111111111111111111111111").is_valid);
    }

    #[test]
    fn test_from_secret_roundtrip() {
        let secret = [7u8; 32];
        let address = SolanaAddress::from_secret(&secret);
        assert!(SolanaAddress::validate(&address).is_valid);
        assert_eq!(
            SolanaAddress::decode(&address).unwrap(),
            SolanaAddress::public_key_from_secret(&secret)
        );
    }

    #[test]
    fn test_rfc8032_public_key() {
        // RFC 8032 test 1
        let secret: [u8; 32] =
            hex::decode("9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60")
                .unwrap()
                .try_into()
                .unwrap();
        assert_eq!(
            hex::encode(SolanaAddress::public_key_from_secret(&secret)),
            "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a"
        );
    }

    #[test]
    fn test_rejects_other_families() {
        assert!(!SolanaAddress::validate("0x9858EfFD232B4033E47d90003D41EC34EcaEda94").is_valid);
        assert!(!SolanaAddress::validate("bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu").is_valid);
        // base58 hợp lệ nhưng sai độ dài
        assert!(!SolanaAddress::validate("1111111111111111111111111111111111").is_valid);
        assert!(!SolanaAddress::validate("").is_valid);
    }
}
