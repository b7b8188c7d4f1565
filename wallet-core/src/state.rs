// wallet-core/src/state.rs
//
// Application state: danh sách account (derived + watch-only) và lịch sử giao dịch.
// Chỉ là data + invariants; không có I/O. Caller giữ trong Mutex và KHÔNG giữ
// lock qua `.await`.

use crate::error::{ChainError, WalletError, WalletResult};
use crate::network::models::{
    amount_str, format_units, Balance, Chain, ChainFamily, PriceFreshness, TokenPrice, Transaction,
    TransactionStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// ACCOUNT
// =============================================================================

/// Một account trên một chain. `(chain, derivation_index)` xác định address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainAccount {
    pub id: String,
    pub name: String,
    pub chain: Chain,
    /// `None` với watch-only
    pub derivation_index: Option<u32>,
    pub address: String,
    /// Số dư cache (base units) từ lần refresh gần nhất
    #[serde(with = "amount_str")]
    pub balance: u128,
    pub balance_usd: Option<f64>,
    /// Nguồn giá của `balance_usd`
    #[serde(default)]
    pub price_freshness: Option<PriceFreshness>,
    pub watch_only: bool,
    pub created_at: DateTime<Utc>,
}

impl ChainAccount {
    pub fn balance_formatted(&self) -> String {
        format_units(self.balance, self.chain.decimals())
    }

    pub fn can_sign(&self) -> bool {
        !self.watch_only && self.derivation_index.is_some()
    }

    /// Index để derive key; watch-only → lỗi
    pub fn signing_index(&self) -> WalletResult<u32> {
        match self.derivation_index {
            Some(index) if !self.watch_only => Ok(index),
            _ => Err(ChainError::WatchOnly(self.address.clone()).into()),
        }
    }
}

/// Tổng USD của các account đã có giá
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsdTotal {
    pub usd: f64,
    /// `Cached` nếu có ít nhất một giá cũ
    pub freshness: PriceFreshness,
    /// Số account chưa có giá (không tính vào `usd`)
    pub unpriced: usize,
}

// =============================================================================
// WALLET STATE
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WalletState {
    accounts: Vec<ChainAccount>,
    /// Mới nhất trước
    transactions: Vec<Transaction>,
    selected: Option<String>,
}

/// EVM hex không phân biệt hoa thường; base58/bech32 so sánh chính xác
fn same_address(chain: Chain, a: &str, b: &str) -> bool {
    match chain.family() {
        ChainFamily::Evm => a.eq_ignore_ascii_case(b),
        ChainFamily::Utxo | ChainFamily::Solana => a == b,
    }
}

fn clean_name(name: &str) -> WalletResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(WalletError::Validation("account name cannot be empty".into()));
    }
    Ok(name.to_string())
}

impl WalletState {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // ACCOUNTS
    // =========================================================================

    pub fn accounts(&self) -> &[ChainAccount] {
        &self.accounts
    }

    pub fn account(&self, id: &str) -> WalletResult<&ChainAccount> {
        self.accounts
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| WalletError::NotFound(format!("account {}", id)))
    }

    fn account_mut(&mut self, id: &str) -> WalletResult<&mut ChainAccount> {
        self.accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| WalletError::NotFound(format!("account {}", id)))
    }

    pub fn find_by_address(&self, chain: Chain, address: &str) -> Option<&ChainAccount> {
        self.accounts
            .iter()
            .find(|a| a.chain == chain && same_address(chain, &a.address, address))
    }

    /// Index cho account derived tiếp theo: số account derived trên chain,
    /// tăng tiếp nếu index đó đã bị dùng (sau khi xóa).
    pub fn next_index(&self, chain: Chain) -> u32 {
        let used: Vec<u32> = self
            .accounts
            .iter()
            .filter(|a| a.chain == chain)
            .filter_map(|a| a.derivation_index)
            .collect();
        let mut index = used.len() as u32;
        while used.contains(&index) {
            index += 1;
        }
        index
    }

    /// Thêm account derived. Account đầu tiên được select.
    pub fn add_derived(
        &mut self,
        name: &str,
        chain: Chain,
        index: u32,
        address: String,
    ) -> WalletResult<&ChainAccount> {
        let name = clean_name(name)?;
        if self
            .accounts
            .iter()
            .any(|a| a.chain == chain && a.derivation_index == Some(index))
        {
            return Err(WalletError::Validation(format!(
                "{} index {} is already in use",
                chain, index
            )));
        }
        self.push(ChainAccount {
            id: Uuid::new_v4().to_string(),
            name,
            chain,
            derivation_index: Some(index),
            address,
            balance: 0,
            balance_usd: None,
            price_freshness: None,
            watch_only: false,
            created_at: Utc::now(),
        })
    }

    /// Thêm watch-only. Address phải đã được validate bởi adapter của chain.
    pub fn add_watch_only(&mut self, name: &str, chain: Chain, address: String) -> WalletResult<&ChainAccount> {
        let name = clean_name(name)?;
        self.push(ChainAccount {
            id: Uuid::new_v4().to_string(),
            name,
            chain,
            derivation_index: None,
            address,
            balance: 0,
            balance_usd: None,
            price_freshness: None,
            watch_only: true,
            created_at: Utc::now(),
        })
    }

    fn push(&mut self, account: ChainAccount) -> WalletResult<&ChainAccount> {
        if self.find_by_address(account.chain, &account.address).is_some() {
            return Err(WalletError::Validation(format!(
                "{} address {} is already tracked",
                account.chain, account.address
            )));
        }
        if self.selected.is_none() {
            self.selected = Some(account.id.clone());
        }
        self.accounts.push(account);
        let last = self.accounts.len() - 1;
        Ok(&self.accounts[last])
    }

    /// Xóa account; nếu đang được select thì chọn account đầu tiên còn lại
    pub fn remove(&mut self, id: &str) -> WalletResult<ChainAccount> {
        let pos = self
            .accounts
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| WalletError::NotFound(format!("account {}", id)))?;
        let removed = self.accounts.remove(pos);
        if self.selected.as_deref() == Some(id) {
            self.selected = self.accounts.first().map(|a| a.id.clone());
        }
        Ok(removed)
    }

    pub fn rename(&mut self, id: &str, name: &str) -> WalletResult<()> {
        let name = clean_name(name)?;
        self.account_mut(id)?.name = name;
        Ok(())
    }

    pub fn select(&mut self, id: &str) -> WalletResult<()> {
        self.account(id)?;
        self.selected = Some(id.to_string());
        Ok(())
    }

    pub fn selected(&self) -> Option<&ChainAccount> {
        self.selected.as_deref().and_then(|id| self.account(id).ok())
    }

    // =========================================================================
    // BALANCES & PRICES
    // =========================================================================

    /// Cập nhật balance từ một refresh đã hoàn tất. Account đã bị xóa → NotFound.
    pub fn apply_balance(&mut self, id: &str, balance: &Balance) -> WalletResult<()> {
        let account = self.account_mut(id)?;
        account.balance = balance.raw;
        account.balance_usd = None;
        account.price_freshness = None;
        Ok(())
    }

    /// Tính lại USD value từ giá (symbol không có giá → giữ nguyên)
    pub fn apply_prices(&mut self, prices: &[TokenPrice]) {
        for account in &mut self.accounts {
            if let Some(price) = prices.iter().find(|p| p.symbol == account.chain.symbol()) {
                let units = account.balance as f64 / 10f64.powi(account.chain.decimals() as i32);
                account.balance_usd = Some(units * price.usd);
                account.price_freshness = Some(price.freshness);
            }
        }
    }

    /// Các symbol native riêng biệt của mọi account
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = Vec::new();
        for account in &self.accounts {
            let symbol = account.chain.symbol().to_string();
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
        symbols
    }

    /// `None` khi chưa account nào có giá (không phải 0 USD)
    pub fn total_usd(&self) -> Option<UsdTotal> {
        let mut total: Option<UsdTotal> = None;
        let mut unpriced = 0;
        for account in &self.accounts {
            match (account.balance_usd, account.price_freshness) {
                (Some(usd), freshness) => {
                    let freshness = freshness.unwrap_or(PriceFreshness::Live);
                    let entry = total.get_or_insert(UsdTotal {
                        usd: 0.0,
                        freshness: PriceFreshness::Live,
                        unpriced: 0,
                    });
                    entry.usd += usd;
                    if freshness == PriceFreshness::Cached {
                        entry.freshness = PriceFreshness::Cached;
                    }
                }
                (None, _) => unpriced += 1,
            }
        }
        total.map(|t| UsdTotal { unpriced, ..t })
    }

    // =========================================================================
    // TRANSACTIONS
    // =========================================================================

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Lịch sử liên quan tới một account
    pub fn transactions_for(&self, account: &ChainAccount) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|t| {
                t.chain == account.chain
                    && (same_address(account.chain, &t.from, &account.address)
                        || same_address(account.chain, &t.to, &account.address))
            })
            .collect()
    }

    pub fn record_transaction(&mut self, tx: Transaction) {
        self.transactions.insert(0, tx);
    }

    pub fn transaction(&self, id: &str) -> WalletResult<&Transaction> {
        self.transactions
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| WalletError::NotFound(format!("transaction {}", id)))
    }

    /// pending → confirmed | failed. Trả về `true` nếu status thay đổi.
    pub fn update_status(&mut self, id: &str, status: TransactionStatus) -> WalletResult<bool> {
        let tx = self
            .transactions
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| WalletError::NotFound(format!("transaction {}", id)))?;
        if !tx.status.can_transition_to(status) {
            return Ok(false);
        }
        tx.status = status;
        Ok(true)
    }

    pub fn pending(&self) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|t| t.status == TransactionStatus::Pending)
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
