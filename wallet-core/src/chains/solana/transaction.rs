// wallet-core/src/chains/solana/transaction.rs
//
// Solana legacy transaction: System Program transfer
//
// Message layout:
//   header [num_required_signatures, num_readonly_signed, num_readonly_unsigned]
//   shortvec(account keys) || recent_blockhash (32) || shortvec(instructions)
// Transaction = shortvec(signatures) || signatures || message

use crate::chains::solana::SolanaAddress;
use crate::error::{WalletError, WalletResult};
use ed25519_dalek::{Signer, SigningKey};

/// System Program id = 32 zero bytes ("111...1")
pub const SYSTEM_PROGRAM_ID: [u8; 32] = [0u8; 32];
/// SystemInstruction::Transfer
const TRANSFER_INSTRUCTION_INDEX: u32 = 2;

/// compact-u16 (shortvec) length prefix
pub fn encode_shortvec_len(out: &mut Vec<u8>, len: usize) {
    let mut rem = len;
    loop {
        let mut byte = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            out.push(byte);
            break;
        }
        byte |= 0x80;
        out.push(byte);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedSolanaTransaction {
    pub raw: Vec<u8>,
    /// base58 của signature đầu tiên = transaction id
    pub signature: String,
}

/// Serialize message cho một transfer `from → to`
pub fn transfer_message(
    from: &str,
    to: &str,
    lamports: u64,
    recent_blockhash: &str,
) -> WalletResult<Vec<u8>> {
    let from_key = SolanaAddress::decode(from)?;
    let to_key = SolanaAddress::decode(to)?;
    let blockhash = SolanaAddress::decode(recent_blockhash)
        .map_err(|e| WalletError::Validation(format!("Invalid recent blockhash: {}", e)))?;

    if from_key == to_key {
        return Err(WalletError::Validation(
            "Solana transfer recipient must differ from sender".to_string(),
        ));
    }

    let mut message = Vec::with_capacity(150);

    // Header: 1 signer (from), 0 readonly signed, 1 readonly unsigned (system program)
    message.extend_from_slice(&[1, 0, 1]);

    // Account keys: [from (writable signer), to (writable), system program (readonly)]
    encode_shortvec_len(&mut message, 3);
    message.extend_from_slice(&from_key);
    message.extend_from_slice(&to_key);
    message.extend_from_slice(&SYSTEM_PROGRAM_ID);

    message.extend_from_slice(&blockhash);

    // 1 instruction
    encode_shortvec_len(&mut message, 1);
    message.push(2); // program id index
    encode_shortvec_len(&mut message, 2);
    message.extend_from_slice(&[0, 1]);

    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&TRANSFER_INSTRUCTION_INDEX.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());
    encode_shortvec_len(&mut message, data.len());
    message.extend_from_slice(&data);

    Ok(message)
}

/// Ký message bằng ed25519 key của `from`
pub fn sign_transfer(
    secret: &[u8; 32],
    from: &str,
    to: &str,
    lamports: u64,
    recent_blockhash: &str,
) -> WalletResult<SignedSolanaTransaction> {
    let signing_key = SigningKey::from_bytes(secret);
    if bs58::encode(signing_key.verifying_key().to_bytes()).into_string() != from {
        return Err(WalletError::Validation(format!(
            "key does not control sender address {}",
            from
        )));
    }

    let message = transfer_message(from, to, lamports, recent_blockhash)?;
    let signature = signing_key.sign(&message).to_bytes();

    let mut raw = Vec::with_capacity(1 + 64 + message.len());
    encode_shortvec_len(&mut raw, 1);
    raw.extend_from_slice(&signature);
    raw.extend_from_slice(&message);

    let signature = bs58::encode(signature).into_string();
    tracing::debug!(%signature, %from, %to, lamports, "signed solana transfer");

    Ok(SignedSolanaTransaction { raw, signature })
}
