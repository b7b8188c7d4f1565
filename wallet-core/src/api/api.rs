// wallet-core/src/api/api.rs
//
// WalletCore - API cho host application (UI, FFI bridge)
// Ghép vault + registry + quotes + state; mọi lock đều ngắn và không qua `.await`.

use crate::chains::ChainRegistry;
use crate::config::CoreConfig;
use crate::crypto::{hd, WalletMnemonic};
use crate::error::{ChainError, VaultError, WalletError, WalletResult};
use crate::network::models::{parse_units, Balance, Chain, FeeEstimate, SwapQuote, TokenPrice, Transaction, TransactionStatus};
use crate::pipeline::{FeeAssessment, FeePolicy, TransferDraft, TransferPipeline, TransferReceipt};
use crate::quotes::{find_token, QuoteAggregator};
use crate::state::{ChainAccount, UsdTotal, WalletState};
use crate::vault::{KeyValueStore, UserVerifier, Vault};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// Tên named secret chứa accounts + transactions
const STATE_SECRET: &str = "state";

pub struct WalletCore {
    config: CoreConfig,
    registry: ChainRegistry,
    quotes: QuoteAggregator,
    vault: Vault,
    state: Mutex<WalletState>,
}

impl WalletCore {
    pub fn new(
        config: CoreConfig,
        registry: ChainRegistry,
        quotes: QuoteAggregator,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let vault = Vault::new(store, config.kdf);
        Self {
            config,
            registry,
            quotes,
            vault,
            state: Mutex::new(WalletState::new()),
        }
    }

    /// HTTP adapters + CoinGecko / 1inch theo config
    #[cfg(feature = "http")]
    pub fn from_config(config: CoreConfig, store: Arc<dyn KeyValueStore>) -> WalletResult<Self> {
        use crate::network::http::HttpRestClient;
        use crate::quotes::{CoinGeckoSource, OneInchSource};

        config.validate()?;
        let registry = ChainRegistry::from_config(&config)?;
        let timeout = config.request_timeout();
        let transport = |e: crate::network::TransportError| WalletError::Config(e.to_string());

        let prices = HttpRestClient::new(config.price_api_url.clone(), timeout).map_err(transport)?;
        let swaps = HttpRestClient::new(config.swap_api_url.clone(), timeout)
            .map_err(transport)?
            .with_bearer_token(config.swap_api_key.clone());
        let quotes = QuoteAggregator::new(
            Arc::new(CoinGeckoSource::new(Arc::new(prices))),
            Arc::new(OneInchSource::new(Arc::new(swaps))),
        )
        .with_default_slippage(config.default_slippage_pct);

        Ok(Self::new(config, registry, quotes, store))
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    fn state(&self) -> MutexGuard<'_, WalletState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn pipeline(&self) -> TransferPipeline<'_> {
        TransferPipeline::new(&self.registry, &self.quotes, &self.vault, &self.state)
    }

    // =========================================================================
    // ONBOARDING
    // =========================================================================

    /// Mnemonic 24 words mới. Host hiển thị cho user ghi lại rồi gọi `create_wallet`.
    pub fn generate_mnemonic() -> WalletResult<WalletMnemonic> {
        WalletMnemonic::generate()
    }

    pub fn validate_mnemonic(phrase: &str) -> bool {
        WalletMnemonic::validate(phrase)
    }

    pub fn is_initialized(&self) -> WalletResult<bool> {
        self.vault.is_initialized()
    }

    pub fn is_unlocked(&self) -> bool {
        self.vault.is_unlocked()
    }

    /// Tạo vault + account index 0 cho mỗi chain
    pub fn create_wallet(
        &self,
        credential: &str,
        mnemonic: &WalletMnemonic,
        chains: &[Chain],
    ) -> WalletResult<Vec<ChainAccount>> {
        for chain in chains {
            self.registry.get(*chain)?;
        }
        self.vault.initialize(credential, mnemonic)?;
        *self.state() = WalletState::new();

        let mut accounts = Vec::with_capacity(chains.len());
        for chain in chains {
            let name = format!("{} Wallet", chain.display_name());
            accounts.push(self.add_account(*chain, &name)?);
        }
        info!(accounts = accounts.len(), "Wallet created");
        Ok(accounts)
    }

    /// Khôi phục từ phrase (12-24 words)
    pub fn restore_wallet(
        &self,
        credential: &str,
        phrase: &str,
        chains: &[Chain],
    ) -> WalletResult<Vec<ChainAccount>> {
        let mnemonic = WalletMnemonic::from_phrase(phrase)?;
        self.create_wallet(credential, &mnemonic, chains)
    }

    /// Unlock vault rồi nạp state đã mã hóa
    pub async fn unlock(&self, credential: &str, verifier: &dyn UserVerifier) -> WalletResult<()> {
        self.vault.unlock(credential, verifier).await?;
        if let Err(e) = self.load_state() {
            self.vault.lock();
            return Err(e);
        }
        Ok(())
    }

    /// Lock vault và xóa state khỏi memory
    pub fn lock(&self) {
        self.vault.lock();
        *self.state() = WalletState::new();
    }

    /// Chỉ khi unlocked (state đã được nạp), nếu không sẽ ghi đè state đã lưu
    pub fn change_credential(&self, old: &str, new: &str) -> WalletResult<()> {
        if !self.vault.is_unlocked() {
            return Err(VaultError::Locked.into());
        }
        self.vault.change_credential(old, new)
    }

    /// Xóa toàn bộ dữ liệu (vault + state)
    pub fn clear_all_data(&self) -> WalletResult<()> {
        self.vault.reset()?;
        *self.state() = WalletState::new();
        warn!("All wallet data cleared");
        Ok(())
    }

    // =========================================================================
    // ACCOUNTS
    // =========================================================================

    pub fn accounts(&self) -> Vec<ChainAccount> {
        self.state().accounts().to_vec()
    }

    pub fn account(&self, id: &str) -> WalletResult<ChainAccount> {
        self.state().account(id).cloned()
    }

    pub fn selected_account(&self) -> Option<ChainAccount> {
        self.state().selected().cloned()
    }

    /// Account derived mới trên `chain` tại index kế tiếp
    pub fn add_account(&self, chain: Chain, name: &str) -> WalletResult<ChainAccount> {
        let adapter = self.registry.get(chain)?;
        let index = self.state().next_index(chain);

        let address = self.vault.with_mnemonic(|mnemonic| {
            let key = hd::derive_key(mnemonic, chain, index)?;
            adapter.derive_address(&key)
        })?;

        let account = self
            .state()
            .add_derived(name, chain, index, address)?
            .clone();
        info!(%chain, index, address = %account.address, "Account added");
        self.save_state()?;
        Ok(account)
    }

    pub fn add_watch_only(&self, chain: Chain, name: &str, address: &str) -> WalletResult<ChainAccount> {
        let adapter = self.registry.get(chain)?;
        let validation = adapter.validate_address(address);
        let normalized = match validation.normalized {
            Some(normalized) if validation.is_valid => normalized,
            _ => {
                return Err(ChainError::InvalidAddress {
                    chain: chain.to_string(),
                    address: address.to_string(),
                }
                .into())
            }
        };

        let account = self.state().add_watch_only(name, chain, normalized)?.clone();
        info!(%chain, address = %account.address, "Watch-only account added");
        self.save_state()?;
        Ok(account)
    }

    pub fn remove_account(&self, id: &str) -> WalletResult<()> {
        let removed = self.state().remove(id)?;
        info!(chain = %removed.chain, address = %removed.address, "Account removed");
        self.save_state()
    }

    pub fn rename_account(&self, id: &str, name: &str) -> WalletResult<()> {
        self.state().rename(id, name)?;
        self.save_state()
    }

    pub fn select_account(&self, id: &str) -> WalletResult<()> {
        self.state().select(id)?;
        self.save_state()
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.state().transactions().to_vec()
    }

    pub fn total_usd(&self) -> Option<UsdTotal> {
        self.state().total_usd()
    }

    // =========================================================================
    // REFRESH
    // =========================================================================

    /// Balance remote → cache. Account bị xóa trong lúc chờ → không ghi gì.
    pub async fn refresh_balance(&self, id: &str) -> WalletResult<Balance> {
        let account = self.account(id)?;
        let adapter = self.registry.get(account.chain)?;
        let balance = adapter.get_balance(&account.address).await?;

        match self.state().apply_balance(id, &balance) {
            Ok(()) => {}
            Err(WalletError::NotFound(_)) => debug!(id, "Account removed during balance refresh"),
            Err(e) => return Err(e),
        }
        Ok(balance)
    }

    /// Refresh lần lượt từng account; lỗi của account này không chặn account khác
    pub async fn refresh_balances(&self) -> Vec<(String, WalletResult<Balance>)> {
        let ids: Vec<String> = self.state().accounts().iter().map(|a| a.id.clone()).collect();
        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            let result = self.refresh_balance(&id).await;
            if let Err(e) = &result {
                warn!(%id, error = %e, "Balance refresh failed");
            }
            results.push((id, result));
        }
        results
    }

    /// Giá cho mọi symbol đang có, cập nhật USD value của accounts
    pub async fn refresh_prices(&self) -> WalletResult<Vec<TokenPrice>> {
        let symbols = self.state().symbols();
        let prices = self.quotes.get_prices(&symbols).await?;
        self.state().apply_prices(&prices);
        Ok(prices)
    }

    // =========================================================================
    // TRANSFERS
    // =========================================================================

    /// "1.5" → base units theo decimals của chain
    pub fn parse_amount(&self, chain: Chain, amount: &str) -> WalletResult<u128> {
        parse_units(amount, chain.decimals())
    }

    /// Draft từ input của user (amount dạng decimal string)
    pub fn draft(&self, account_id: &str, to: &str, amount: &str) -> WalletResult<TransferDraft> {
        let chain = self.account(account_id)?.chain;
        Ok(TransferDraft {
            account_id: account_id.to_string(),
            to: to.trim().to_string(),
            amount: self.parse_amount(chain, amount)?,
        })
    }

    /// Phí cho một draft (validate local trước)
    pub async fn estimate_fee(&self, draft: &TransferDraft) -> WalletResult<FeeEstimate> {
        let pipeline = self.pipeline();
        let transfer = pipeline.validate(draft)?;
        match pipeline.assess_fee(&transfer, FeePolicy::Require).await? {
            FeeAssessment::Estimated(fee) => Ok(fee),
            FeeAssessment::Unavailable { reason } => {
                Err(ChainError::FeeUnavailable(reason).into())
            }
        }
    }

    /// Chạy toàn bộ pipeline. Transaction đã broadcast luôn được trả về,
    /// kể cả khi persist state lỗi.
    pub async fn send(&self, draft: &TransferDraft, policy: FeePolicy) -> WalletResult<TransferReceipt> {
        let receipt = self.pipeline().execute(draft, policy).await?;
        if let Err(e) = self.save_state() {
            error!(hash = %receipt.transaction.hash, error = %e, "Failed to persist sent transaction");
        }
        Ok(receipt)
    }

    pub async fn refresh_status(&self, transaction_id: &str) -> WalletResult<TransactionStatus> {
        let status = self.pipeline().refresh_status(transaction_id).await?;
        if status.is_terminal() {
            self.save_state()?;
        }
        Ok(status)
    }

    /// Poll mọi transaction đang pending
    pub async fn refresh_pending(&self) -> Vec<(String, WalletResult<TransactionStatus>)> {
        let ids: Vec<String> = self.state().pending().iter().map(|t| t.id.clone()).collect();
        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            let result = self.refresh_status(&id).await;
            results.push((id, result));
        }
        results
    }

    pub fn explorer_url(&self, chain: Chain, hash: &str) -> Option<String> {
        self.registry.get(chain).ok()?.explorer_tx_url(hash)
    }

    // =========================================================================
    // SWAPS
    // =========================================================================

    /// Quote swap từ một account; `amount` là decimal string theo decimals của token nguồn
    pub async fn swap_quote(
        &self,
        account_id: &str,
        from: &str,
        to: &str,
        amount: &str,
        slippage_pct: Option<f64>,
    ) -> WalletResult<SwapQuote> {
        let account = self.account(account_id)?;
        let from_token = find_token(account.chain, from)?;
        let raw = parse_units(amount, from_token.decimals)?;
        let adapter = self.registry.get(account.chain)?;
        self.quotes
            .swap_quote(adapter.as_ref(), &account.address, from, to, raw, slippage_pct)
            .await
    }

    // =========================================================================
    // PERSISTENCE
    // =========================================================================

    /// Mã hóa accounts + transactions vào vault
    pub fn save_state(&self) -> WalletResult<()> {
        let snapshot = self.state().clone();
        let json = serde_json::to_vec(&snapshot).map_err(|e| WalletError::Storage(e.to_string()))?;
        self.vault.put_secret(STATE_SECRET, &json)?;
        debug!(bytes = json.len(), "Wallet state saved");
        Ok(())
    }

    /// Nạp state từ vault. Chưa có → state rỗng; hỏng → lỗi (không fallback rỗng).
    pub fn load_state(&self) -> WalletResult<()> {
        let loaded = match self.vault.get_secret(STATE_SECRET)? {
            Some(json) => serde_json::from_slice::<WalletState>(&json)
                .map_err(|e| VaultError::Corrupted(format!("{}: {}", STATE_SECRET, e)))?,
            None => WalletState::new(),
        };
        debug!(accounts = loaded.accounts().len(), "Wallet state loaded");
        *self.state() = loaded;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
