// wallet-core/src/network/models.rs
//
// Universal Data Models - Chain-Agnostic Structures for Multi-Chain Wallet
//
// Tất cả structs đều:
// - Serialize/Deserialize friendly (JSON, camelCase)
// - Không phụ thuộc vào chain-specific types (EVM U256, Solana Pubkey, etc.)
// - Số lượng token luôn ở base unit (wei, satoshi, lamport) kiểu u128,
//   serialize thành decimal string để tránh mất precision

use crate::error::{ChainError, WalletError, WalletResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// CHAIN IDENTIFICATION
// =============================================================================

/// Họ blockchain - chung address scheme và signing scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
    /// Account model, secp256k1 + Keccak (Ethereum, Polygon, BNB)
    Evm,
    /// UTXO model, secp256k1 + bech32 (Bitcoin)
    Utxo,
    /// Account model, ed25519 + base58 (Solana)
    Solana,
}

/// Các chain được hỗ trợ. Tập đóng: chain lạ → `UnsupportedChain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Polygon,
    Bnb,
    Bitcoin,
    Solana,
}

impl Chain {
    pub const ALL: [Chain; 5] = [
        Chain::Ethereum,
        Chain::Polygon,
        Chain::Bnb,
        Chain::Bitcoin,
        Chain::Solana,
    ];

    #[inline]
    pub const fn family(self) -> ChainFamily {
        match self {
            Chain::Ethereum | Chain::Polygon | Chain::Bnb => ChainFamily::Evm,
            Chain::Bitcoin => ChainFamily::Utxo,
            Chain::Solana => ChainFamily::Solana,
        }
    }

    /// Identifier ổn định (dùng cho storage và config)
    pub const fn id(self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Polygon => "polygon",
            Chain::Bnb => "bnb",
            Chain::Bitcoin => "bitcoin",
            Chain::Solana => "solana",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Chain::Ethereum => "Ethereum",
            Chain::Polygon => "Polygon",
            Chain::Bnb => "BNB Chain",
            Chain::Bitcoin => "Bitcoin",
            Chain::Solana => "Solana",
        }
    }

    /// Symbol của native asset
    pub const fn symbol(self) -> &'static str {
        match self {
            Chain::Ethereum => "ETH",
            Chain::Polygon => "MATIC",
            Chain::Bnb => "BNB",
            Chain::Bitcoin => "BTC",
            Chain::Solana => "SOL",
        }
    }

    /// Decimals của native asset (wei = 18, satoshi = 8, lamport = 9)
    pub const fn decimals(self) -> u8 {
        match self {
            Chain::Ethereum | Chain::Polygon | Chain::Bnb => 18,
            Chain::Bitcoin => 8,
            Chain::Solana => 9,
        }
    }

    /// EIP-155 chain id (chỉ EVM)
    pub const fn evm_chain_id(self) -> Option<u64> {
        match self {
            Chain::Ethereum => Some(1),
            Chain::Polygon => Some(137),
            Chain::Bnb => Some(56),
            Chain::Bitcoin | Chain::Solana => None,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Chain {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ethereum" | "eth" => Ok(Chain::Ethereum),
            "polygon" | "matic" => Ok(Chain::Polygon),
            "bnb" | "bsc" | "binance" => Ok(Chain::Bnb),
            "bitcoin" | "btc" => Ok(Chain::Bitcoin),
            "solana" | "sol" => Ok(Chain::Solana),
            other => Err(ChainError::UnsupportedChain(other.to_string()).into()),
        }
    }
}

// =============================================================================
// AMOUNTS
// =============================================================================

/// serde helper: u128 <-> decimal string
pub mod amount_str {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// serde helper: Option<u128> <-> Option<decimal string>
pub mod opt_amount_str {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<u128>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => s.serialize_some(&v.to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u128>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        raw.map(|r| r.parse().map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// Format base units thành human-readable string (bỏ số 0 thừa)
///
/// `format_units(1_500_000_000_000_000_000, 18)` → `"1.5"`
pub fn format_units(raw: u128, decimals: u8) -> String {
    let raw = raw.to_string();
    if decimals == 0 || raw == "0" {
        return raw;
    }

    let raw_len = raw.len();
    let decimals = decimals as usize;

    if raw_len <= decimals {
        // Số nhỏ hơn 1 (e.g., 0.001)
        let padded = format!("{}{}", "0".repeat(decimals - raw_len), raw);
        let trimmed = padded.trim_end_matches('0');
        if trimmed.is_empty() {
            "0".to_string()
        } else {
            format!("0.{}", trimmed)
        }
    } else {
        let integer_part = &raw[..raw_len - decimals];
        let decimal_part = raw[raw_len - decimals..].trim_end_matches('0');
        if decimal_part.is_empty() {
            integer_part.to_string()
        } else {
            format!("{}.{}", integer_part, decimal_part)
        }
    }
}

/// Parse decimal string (user input) thành base units
///
/// Reject: rỗng, ký tự lạ, nhiều dấu chấm, nhiều decimals hơn asset cho phép, overflow.
pub fn parse_units(amount: &str, decimals: u8) -> WalletResult<u128> {
    let amount = amount.trim();
    let invalid = |reason: &str| WalletError::Validation(format!("Invalid amount '{}': {}", amount, reason));

    if amount.is_empty() {
        return Err(invalid("empty"));
    }

    let (int_part, frac_part) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid("no digits"));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit()) || !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("not a decimal number"));
    }
    if frac_part.len() > decimals as usize {
        return Err(invalid(&format!("more than {} decimal places", decimals)));
    }

    let scale = 10u128
        .checked_pow(decimals as u32)
        .ok_or_else(|| invalid("decimals out of range"))?;

    let int_value: u128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| invalid("too large"))?
    };

    let frac_value: u128 = if frac_part.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac_part, width = decimals as usize);
        padded.parse().map_err(|_| invalid("too large"))?
    };

    int_value
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(|| invalid("too large"))
}

/// Rút gọn address để hiển thị: `0x1234...abcd`
pub fn format_address(address: &str, chars: usize) -> String {
    if address.len() <= chars * 2 + 2 || !address.is_ascii() {
        return address.to_string();
    }
    let head = if address.starts_with("0x") { chars + 2 } else { chars };
    format!("{}...{}", &address[..head], &address[address.len() - chars..])
}

// =============================================================================
// BALANCE
// =============================================================================

/// Số dư native asset (chain-agnostic)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    /// Số dư raw (base units)
    #[serde(with = "amount_str")]
    pub raw: u128,
    /// Số dư đã format với decimals (e.g., "1.5")
    pub formatted: String,
    /// Symbol (e.g., "ETH")
    pub symbol: String,
    /// Số decimals
    pub decimals: u8,
}

impl Balance {
    /// Tạo Balance từ raw value và decimals
    pub fn new(raw: u128, decimals: u8, symbol: impl Into<String>) -> Self {
        Self {
            raw,
            formatted: format_units(raw, decimals),
            symbol: symbol.into(),
            decimals,
        }
    }

    /// Balance native của một chain
    pub fn native(chain: Chain, raw: u128) -> Self {
        Self::new(raw, chain.decimals(), chain.symbol())
    }

    /// Giá trị dạng f64 (chỉ dùng cho hiển thị / USD)
    pub fn as_f64(&self) -> f64 {
        self.raw as f64 / 10f64.powi(self.decimals as i32)
    }
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// Trạng thái giao dịch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Đã broadcast, đang chờ xác nhận
    Pending,
    /// Đã xác nhận thành công
    Confirmed,
    /// Thất bại on-chain
    Failed,
}

impl TransactionStatus {
    /// Chỉ cho phép pending → confirmed | failed
    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (TransactionStatus::Pending, TransactionStatus::Confirmed)
                | (TransactionStatus::Pending, TransactionStatus::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

/// Loại giao dịch (để hiển thị icon/label)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Send,
    Receive,
    Swap,
}

/// Giao dịch trong lịch sử của wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    /// Hash - chỉ có sau khi broadcast
    pub hash: String,
    pub from: String,
    pub to: String,
    /// Giá trị (base units)
    #[serde(with = "amount_str")]
    pub amount: u128,
    pub symbol: String,
    pub chain: Chain,
    pub tx_type: TransactionType,
    pub status: TransactionStatus,
    pub timestamp: DateTime<Utc>,
    /// Phí native (base units), nếu biết
    #[serde(default, with = "opt_amount_str")]
    pub fee: Option<u128>,
    #[serde(default)]
    pub fee_usd: Option<f64>,
}

impl Transaction {
    pub fn amount_formatted(&self) -> String {
        format_units(self.amount, self.chain.decimals())
    }
}

// =============================================================================
// FEE ESTIMATION
// =============================================================================

/// Ước tính phí mạng. Ephemeral - không persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEstimate {
    pub chain: Chain,
    /// Giá mỗi unit: wei/gas, sat/vB, lamports/signature
    #[serde(with = "amount_str")]
    pub unit_fee_rate: u128,
    /// Số unit: gas limit, vbytes, số signatures
    pub fee_units: u64,
    /// Tổng phí (base units) = rate × units
    #[serde(with = "amount_str")]
    pub fee_native: u128,
    pub fee_formatted: String,
    pub symbol: String,
    /// Giá trị USD - `None` khi price feed không có, KHÔNG bao giờ bịa số
    pub fee_usd: Option<f64>,
    /// Nguồn giá đã dùng cho `fee_usd` (`Cached` = giá cũ khi provider lỗi)
    #[serde(default)]
    pub usd_freshness: Option<PriceFreshness>,
}

impl FeeEstimate {
    pub fn new(chain: Chain, unit_fee_rate: u128, fee_units: u64) -> Self {
        let fee_native = unit_fee_rate.saturating_mul(fee_units as u128);
        Self {
            chain,
            unit_fee_rate,
            fee_units,
            fee_native,
            fee_formatted: format_units(fee_native, chain.decimals()),
            symbol: chain.symbol().to_string(),
            fee_usd: None,
            usd_freshness: None,
        }
    }

    pub fn with_price(mut self, price: &TokenPrice) -> Self {
        let native = self.fee_native as f64 / 10f64.powi(self.chain.decimals() as i32);
        self.fee_usd = Some(native * price.usd);
        self.usd_freshness = Some(price.freshness);
        self
    }
}

// =============================================================================
// PRICES & SWAPS
// =============================================================================

/// Nguồn gốc của giá
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceFreshness {
    /// Vừa lấy từ provider
    Live,
    /// Giá cuối cùng đã biết (provider đang lỗi)
    Cached,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPrice {
    pub symbol: String,
    pub usd: f64,
    pub change_24h: f64,
    pub freshness: PriceFreshness,
    pub updated_at: DateTime<Utc>,
}

/// Swap quote. Ephemeral - không persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
    pub chain: Chain,
    pub from_token: String,
    pub to_token: String,
    #[serde(with = "amount_str")]
    pub amount_in: u128,
    #[serde(with = "amount_str")]
    pub amount_out: u128,
    pub out_decimals: u8,
    /// Price impact (%)
    pub price_impact_pct: f64,
    /// Slippage tolerance (%)
    pub slippage_pct: f64,
    /// amount_out × (1 − slippage)
    #[serde(with = "amount_str")]
    pub minimum_received: u128,
    /// Phí swap: gas units của aggregator × gas price hiện tại của chain
    pub fee: FeeEstimate,
}

// =============================================================================
// ADDRESS
// =============================================================================

/// Kết quả validation địa chỉ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressValidation {
    /// Có hợp lệ không
    pub is_valid: bool,
    /// Địa chỉ đã normalize (checksum, etc.)
    pub normalized: Option<String>,
    /// Lý do không hợp lệ (nếu có)
    pub error: Option<String>,
}

impl AddressValidation {
    pub fn valid(normalized: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            normalized: Some(normalized.into()),
            error: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            normalized: None,
            error: Some(reason.into()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
