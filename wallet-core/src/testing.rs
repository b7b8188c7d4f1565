// wallet-core/src/testing.rs
//
// Test doubles: transport mocks đếm số remote call, mock adapter, verifier.
// Không có gì ở đây chạm tới network.

use crate::chains::evm::EvmAdapter;
use crate::chains::{EvmChainConfig, SignedTransaction, TransferPlan};
use crate::crypto::hd::KeyMaterial;
use crate::error::{ChainError, WalletResult};
use crate::network::models::{AddressValidation, Balance, Chain, FeeEstimate, TransactionStatus};
use crate::network::traits::ChainAdapter;
use crate::network::transport::{RestClient, RpcClient, TransportError, TransportResult};
use crate::vault::UserVerifier;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

// =============================================================================
// TRANSPORT MOCKS
// =============================================================================

/// Response theo key (method hoặc path), cố định cho mọi lần gọi
#[derive(Default)]
struct Script {
    responses: Mutex<HashMap<String, TransportResult<Value>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl Script {
    fn set(&self, key: &str, response: TransportResult<Value>) {
        self.responses
            .lock()
            .unwrap()
            .insert(key.to_string(), response);
    }

    fn hit(&self, key: &str) -> TransportResult<Value> {
        *self.calls.lock().unwrap().entry(key.to_string()).or_insert(0) += 1;
        self.responses
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_else(|| Err(TransportError::Unreachable(format!("no mock response for {}", key))))
    }

    fn calls(&self, key: &str) -> usize {
        self.calls.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    fn total(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

/// JSON-RPC mock, key = method
#[derive(Default)]
pub struct MockRpc {
    script: Script,
}

impl MockRpc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: &str, result: Value) {
        self.script.set(method, Ok(result));
    }

    pub fn fail(&self, method: &str, error: TransportError) {
        self.script.set(method, Err(error));
    }

    pub fn calls(&self, method: &str) -> usize {
        self.script.calls(method)
    }

    pub fn total_calls(&self) -> usize {
        self.script.total()
    }
}

#[async_trait]
impl RpcClient for MockRpc {
    async fn call(&self, method: &str, _params: Value) -> TransportResult<Value> {
        self.script.hit(method)
    }
}

/// REST mock, key = path (kể cả query string)
#[derive(Default)]
pub struct MockRest {
    script: Script,
}

impl MockRest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, path: &str, body: Value) {
        self.script.set(path, Ok(body));
    }

    pub fn respond_text(&self, path: &str, body: &str) {
        self.script.set(path, Ok(Value::String(body.to_string())));
    }

    pub fn fail(&self, path: &str, error: TransportError) {
        self.script.set(path, Err(error));
    }

    pub fn calls(&self, path: &str) -> usize {
        self.script.calls(path)
    }

    pub fn total_calls(&self) -> usize {
        self.script.total()
    }
}

#[async_trait]
impl RestClient for MockRest {
    async fn get_json(&self, path: &str) -> TransportResult<Value> {
        self.script.hit(path)
    }

    async fn post_text(&self, path: &str, _body: String) -> TransportResult<String> {
        match self.script.hit(path)? {
            Value::String(s) => Ok(s),
            other => Ok(other.to_string()),
        }
    }
}

// =============================================================================
// MOCK ADAPTER
// =============================================================================

/// Adapter EVM (Ethereum) với kết quả remote được script sẵn.
/// `sign` dùng signer thật nên hash là hash của raw bytes đã ký.
pub struct MockAdapter {
    chain: Chain,
    signer: EvmAdapter,
    pub balance: Mutex<WalletResult<u128>>,
    /// Mỗi `get_balance` lấy một gate (nếu có) và chờ tới khi test gửi kết quả
    balance_gates: Mutex<VecDeque<oneshot::Receiver<WalletResult<u128>>>>,
    pub fee: Mutex<WalletResult<FeeEstimate>>,
    /// `None` → trả về hash tính local
    pub broadcast_result: Mutex<Option<WalletResult<String>>>,
    pub status: Mutex<WalletResult<TransactionStatus>>,
    remote_calls: AtomicUsize,
    broadcasts: AtomicUsize,
    signs: AtomicUsize,
}

impl MockAdapter {
    pub fn ethereum() -> Self {
        Self::for_chain(Chain::Ethereum)
    }

    /// EVM chain bất kỳ (Ethereum, Polygon, BNB)
    pub fn for_chain(chain: Chain) -> Self {
        let config = EvmChainConfig::for_chain(chain).unwrap_or_else(EvmChainConfig::ethereum);
        Self {
            chain,
            signer: EvmAdapter::new(chain, config, Arc::new(MockRpc::new())).unwrap(),
            balance: Mutex::new(Ok(0)),
            balance_gates: Mutex::new(VecDeque::new()),
            fee: Mutex::new(Ok(FeeEstimate::new(chain, 20_000_000_000, 21_000))),
            broadcast_result: Mutex::new(None),
            status: Mutex::new(Ok(TransactionStatus::Pending)),
            remote_calls: AtomicUsize::new(0),
            broadcasts: AtomicUsize::new(0),
            signs: AtomicUsize::new(0),
        }
    }

    pub fn set_balance(&self, result: WalletResult<u128>) {
        *self.balance.lock().unwrap() = result;
    }

    /// `get_balance` kế tiếp treo cho tới khi sender gửi kết quả
    pub fn gate_balance(&self) -> oneshot::Sender<WalletResult<u128>> {
        let (tx, rx) = oneshot::channel();
        self.balance_gates.lock().unwrap().push_back(rx);
        tx
    }

    pub fn set_fee(&self, result: WalletResult<FeeEstimate>) {
        *self.fee.lock().unwrap() = result;
    }

    pub fn set_broadcast(&self, result: WalletResult<String>) {
        *self.broadcast_result.lock().unwrap() = Some(result);
    }

    pub fn set_status(&self, result: WalletResult<TransactionStatus>) {
        *self.status.lock().unwrap() = result;
    }

    pub fn remote_calls(&self) -> usize {
        self.remote_calls.load(Ordering::SeqCst)
    }

    pub fn broadcasts(&self) -> usize {
        self.broadcasts.load(Ordering::SeqCst)
    }

    pub fn signs(&self) -> usize {
        self.signs.load(Ordering::SeqCst)
    }

    fn remote(&self) {
        self.remote_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChainAdapter for MockAdapter {
    fn chain(&self) -> Chain {
        self.chain
    }

    fn validate_address(&self, address: &str) -> AddressValidation {
        self.signer.validate_address(address)
    }

    async fn get_balance(&self, _address: &str) -> WalletResult<Balance> {
        self.remote();
        let gate = self.balance_gates.lock().unwrap().pop_front();
        let raw = match gate {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(ChainError::BalanceUnavailable("gate dropped".into()).into()))?,
            None => self.balance.lock().unwrap().clone()?,
        };
        Ok(Balance::native(self.chain, raw))
    }

    async fn estimate_network_fee(
        &self,
        _from: &str,
        _to: &str,
        _amount: u128,
    ) -> WalletResult<FeeEstimate> {
        self.remote();
        self.fee.lock().unwrap().clone()
    }

    async fn prepare_transfer(
        &self,
        _from: &str,
        to: &str,
        amount: u128,
    ) -> WalletResult<TransferPlan> {
        self.remote();
        Ok(TransferPlan::Evm {
            chain_id: self.chain.evm_chain_id().unwrap_or(1),
            nonce: 0,
            gas_price: 1_000_000_000,
            gas_limit: 21_000,
            to: to.to_string(),
            value: amount,
        })
    }

    fn sign(&self, plan: &TransferPlan, key: &KeyMaterial) -> WalletResult<SignedTransaction> {
        self.signs.fetch_add(1, Ordering::SeqCst);
        self.signer.sign(plan, key)
    }

    async fn broadcast(&self, signed: &SignedTransaction) -> WalletResult<String> {
        self.remote();
        self.broadcasts.fetch_add(1, Ordering::SeqCst);
        match self.broadcast_result.lock().unwrap().clone() {
            Some(result) => result,
            None => Ok(signed.hash.clone()),
        }
    }

    async fn get_status(&self, _hash: &str) -> WalletResult<TransactionStatus> {
        self.remote();
        self.status.lock().unwrap().clone()
    }

    fn explorer_tx_url(&self, hash: &str) -> Option<String> {
        self.signer.explorer_tx_url(hash)
    }
}

/// Fee lookup timeout như adapter thật trả về
pub fn fee_timeout() -> WalletResult<FeeEstimate> {
    Err(ChainError::FeeUnavailable("request timed out: 10s".to_string()).into())
}

// =============================================================================
// USER VERIFIER
// =============================================================================

/// Verifier trả về kết quả cố định, đếm số lần được hỏi
pub struct StaticVerifier {
    approve: bool,
    asked: AtomicUsize,
}

impl StaticVerifier {
    pub fn approve() -> Self {
        Self {
            approve: true,
            asked: AtomicUsize::new(0),
        }
    }

    pub fn deny() -> Self {
        Self {
            approve: false,
            asked: AtomicUsize::new(0),
        }
    }

    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserVerifier for StaticVerifier {
    async fn verify(&self) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.approve
    }
}
