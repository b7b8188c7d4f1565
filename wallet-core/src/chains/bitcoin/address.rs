// wallet-core/src/chains/bitcoin/address.rs
//
// Bitcoin address: P2WPKH (native SegWit, bc1q...) từ compressed public key

use crate::error::{CryptoError, WalletError, WalletResult};
use crate::network::models::AddressValidation;
use bitcoin::secp256k1::{Secp256k1, SecretKey};
use bitcoin::{Address, CompressedPublicKey, Network};
use std::str::FromStr;

pub struct BitcoinAddress;

impl BitcoinAddress {
    /// Compressed public key (33 bytes) từ private key
    pub fn public_key_from_secret(priv_key: &[u8]) -> WalletResult<CompressedPublicKey> {
        let secp = Secp256k1::signing_only();
        let secret = SecretKey::from_slice(priv_key).map_err(|e| {
            WalletError::Crypto(CryptoError::InvalidKeyFormat(format!(
                "Invalid secp256k1 private key: {}",
                e
            )))
        })?;
        Ok(CompressedPublicKey(secret.public_key(&secp)))
    }

    /// P2WPKH address cho network
    pub fn p2wpkh_from_secret(priv_key: &[u8], network: Network) -> WalletResult<Address> {
        let public_key = Self::public_key_from_secret(priv_key)?;
        let address = Address::p2wpkh(&public_key, network);
        tracing::trace!(%address, ?network, "derived P2WPKH address");
        Ok(address)
    }

    /// Recipient có thể là bất kỳ loại address chuẩn nào (P2PKH, P2SH, SegWit, Taproot),
    /// nhưng phải đúng network.
    pub fn validate(address: &str, network: Network) -> AddressValidation {
        match Address::from_str(address) {
            Ok(unchecked) => match unchecked.require_network(network) {
                Ok(checked) => AddressValidation::valid(checked.to_string()),
                Err(_) => AddressValidation::invalid(format!("address is not valid on {}", network)),
            },
            Err(e) => AddressValidation::invalid(format!("not a bitcoin address: {}", e)),
        }
    }

    /// Parse + check network
    pub fn parse(address: &str, network: Network) -> WalletResult<Address> {
        Address::from_str(address)
            .map_err(|e| WalletError::Validation(format!("Invalid bitcoin address '{}': {}", address, e)))?
            .require_network(network)
            .map_err(|e| WalletError::Validation(format!("Invalid bitcoin address '{}': {}", address, e)))
    }
}
