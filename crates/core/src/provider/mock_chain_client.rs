use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use alloy::{
    primitives::{TxHash, U256},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;

use super::chain_client::{ChainClient, ChainClientError, ReceiptStatus};
use crate::{
    gas::types::GasLimit,
    shared::common_types::EvmAddress,
    transaction::types::{TransactionHash, TransactionNonce},
};

#[derive(Debug, Clone)]
pub enum ReceiptBehavior {
    Immediate(ReceiptStatus),
    After(Duration, ReceiptStatus),
    Error(ChainClientError),
    Never,
}

#[derive(Debug, Clone)]
pub struct Broadcast {
    pub from: EvmAddress,
    pub hash: TransactionHash,
    pub request: TransactionRequest,
}

/// Scriptable in-memory chain used by unit tests.
pub struct MockChainClient {
    default_balance: Mutex<U256>,
    balances: Mutex<HashMap<EvmAddress, U256>>,
    balance_errors: Mutex<HashMap<EvmAddress, ChainClientError>>,
    nonces: Mutex<HashMap<EvmAddress, u64>>,
    estimate: Mutex<Result<GasLimit, ChainClientError>>,
    send_results: Mutex<VecDeque<Result<(), ChainClientError>>>,
    hang_sends: AtomicBool,
    receipt: Mutex<ReceiptBehavior>,
    broadcasts: Mutex<Vec<Broadcast>>,
    next_hash: AtomicU64,
    pub balance_calls: AtomicUsize,
    pub estimate_calls: AtomicUsize,
    pub nonce_calls: AtomicUsize,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self {
            default_balance: Mutex::new(U256::from(1_000_000_000_000_000_000u128)),
            balances: Mutex::new(HashMap::new()),
            balance_errors: Mutex::new(HashMap::new()),
            nonces: Mutex::new(HashMap::new()),
            estimate: Mutex::new(Ok(GasLimit::new(100_000))),
            send_results: Mutex::new(VecDeque::new()),
            hang_sends: AtomicBool::new(false),
            receipt: Mutex::new(ReceiptBehavior::Immediate(ReceiptStatus::Success)),
            broadcasts: Mutex::new(Vec::new()),
            next_hash: AtomicU64::new(1),
            balance_calls: AtomicUsize::new(0),
            estimate_calls: AtomicUsize::new(0),
            nonce_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_default_balance(&self, balance: U256) {
        *self.default_balance.lock().unwrap() = balance;
    }

    pub fn set_balance(&self, address: EvmAddress, balance: U256) {
        self.balances.lock().unwrap().insert(address, balance);
    }

    pub fn fail_balance(&self, address: EvmAddress, error: ChainClientError) {
        self.balance_errors.lock().unwrap().insert(address, error);
    }

    pub fn set_nonce(&self, address: EvmAddress, nonce: u64) {
        self.nonces.lock().unwrap().insert(address, nonce);
    }

    pub fn set_estimate(&self, estimate: Result<GasLimit, ChainClientError>) {
        *self.estimate.lock().unwrap() = estimate;
    }

    /// Queues outcomes for the next broadcasts; once drained every broadcast succeeds.
    pub fn push_send_result(&self, result: Result<(), ChainClientError>) {
        self.send_results.lock().unwrap().push_back(result);
    }

    /// While set, broadcasts never return.
    pub fn set_hang_sends(&self, hang: bool) {
        self.hang_sends.store(hang, Ordering::SeqCst);
    }

    pub fn set_receipt(&self, behavior: ReceiptBehavior) {
        *self.receipt.lock().unwrap() = behavior;
    }

    pub fn broadcasts(&self) -> Vec<Broadcast> {
        self.broadcasts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn get_balance(&self, address: &EvmAddress) -> Result<U256, ChainClientError> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.balance_errors.lock().unwrap().get(address) {
            return Err(error.clone());
        }
        let balance = self.balances.lock().unwrap().get(address).copied();
        Ok(balance.unwrap_or(*self.default_balance.lock().unwrap()))
    }

    async fn get_transaction_count(
        &self,
        address: &EvmAddress,
    ) -> Result<TransactionNonce, ChainClientError> {
        self.nonce_calls.fetch_add(1, Ordering::SeqCst);
        let nonce = self.nonces.lock().unwrap().get(address).copied().unwrap_or(0);
        Ok(TransactionNonce::new(nonce))
    }

    async fn estimate_gas(&self, _request: &TransactionRequest) -> Result<GasLimit, ChainClientError> {
        self.estimate_calls.fetch_add(1, Ordering::SeqCst);
        self.estimate.lock().unwrap().clone()
    }

    async fn send_transaction(
        &self,
        signer: &PrivateKeySigner,
        request: TransactionRequest,
    ) -> Result<TransactionHash, ChainClientError> {
        if self.hang_sends.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        let scripted = self.send_results.lock().unwrap().pop_front();
        if let Some(Err(error)) = scripted {
            return Err(error);
        }

        let id = self.next_hash.fetch_add(1, Ordering::SeqCst);
        let hash = TransactionHash::from(TxHash::from(U256::from(id).to_be_bytes::<32>()));
        self.broadcasts.lock().unwrap().push(Broadcast {
            from: EvmAddress::new(signer.address()),
            hash,
            request,
        });

        Ok(hash)
    }

    async fn wait_for_receipt(
        &self,
        _hash: &TransactionHash,
    ) -> Result<ReceiptStatus, ChainClientError> {
        let behavior = self.receipt.lock().unwrap().clone();
        match behavior {
            ReceiptBehavior::Immediate(status) => Ok(status),
            ReceiptBehavior::After(delay, status) => {
                tokio::time::sleep(delay).await;
                Ok(status)
            }
            ReceiptBehavior::Error(error) => Err(error),
            ReceiptBehavior::Never => std::future::pending().await,
        }
    }
}
