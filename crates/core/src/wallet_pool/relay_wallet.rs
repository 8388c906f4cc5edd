use std::{collections::HashMap, sync::Arc, time::SystemTime};

use alloy::signers::local::PrivateKeySigner;
use serde::Serialize;
use tokio::{sync::Mutex, time::Instant};

use crate::{
    shared::{
        common_types::EvmAddress,
        serializers::{serialize_system_time, serialize_system_time_option},
    },
    transaction::types::{TransactionHash, TransactionNonce, TransactionStatus},
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub hash: TransactionHash,
    pub status: TransactionStatus,
    #[serde(serialize_with = "serialize_system_time")]
    pub submitted_at: SystemTime,
    #[serde(serialize_with = "serialize_system_time_option")]
    pub resolved_at: Option<SystemTime>,
    pub failure_reason: Option<String>,
}

impl TransactionRecord {
    pub fn pending(hash: TransactionHash) -> Self {
        Self {
            hash,
            status: TransactionStatus::Pending,
            submitted_at: SystemTime::now(),
            resolved_at: None,
            failure_reason: None,
        }
    }

    /// Moves a pending record to a terminal status. Returns false when it was already resolved.
    pub fn resolve(&mut self, status: TransactionStatus, failure_reason: Option<String>) -> bool {
        if self.status.is_terminal() || !status.is_terminal() {
            return false;
        }

        self.status = status;
        self.resolved_at = Some(SystemTime::now());
        self.failure_reason = failure_reason;
        true
    }
}

/// Mutable state of one relay wallet. Only ever touched under the pool lock.
#[derive(Debug)]
pub struct RelayWallet {
    pub address: EvmAddress,
    /// Held for the duration of a sign + broadcast so one key never signs concurrently.
    pub signer: Arc<Mutex<PrivateKeySigner>>,
    pub pending_count: u32,
    pub failure_count: u32,
    pub last_used_at: Option<Instant>,
    pub current_nonce: TransactionNonce,
    pub transactions: HashMap<TransactionHash, TransactionRecord>,
    pub last_failure: Option<String>,
}

impl RelayWallet {
    pub fn new(signer: PrivateKeySigner, current_nonce: TransactionNonce) -> Self {
        Self {
            address: EvmAddress::new(signer.address()),
            signer: Arc::new(Mutex::new(signer)),
            pending_count: 0,
            failure_count: 0,
            last_used_at: None,
            current_nonce,
            transactions: HashMap::new(),
            last_failure: None,
        }
    }

    pub fn snapshot(&self, now: Instant) -> WalletSnapshot {
        WalletSnapshot {
            address: self.address,
            pending_count: self.pending_count,
            failure_count: self.failure_count,
            last_used_at: self.last_used_at,
            idle_ms: self
                .last_used_at
                .map(|last_used| now.saturating_duration_since(last_used).as_millis() as u64),
            current_nonce: self.current_nonce,
            pending_transactions: self
                .transactions
                .values()
                .filter(|record| record.status == TransactionStatus::Pending)
                .count(),
            last_failure: self.last_failure.clone(),
        }
    }
}

/// Point-in-time copy of a wallet's scheduling state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSnapshot {
    pub address: EvmAddress,
    pub pending_count: u32,
    pub failure_count: u32,
    #[serde(skip)]
    pub last_used_at: Option<Instant>,
    pub idle_ms: Option<u64>,
    pub current_nonce: TransactionNonce,
    pub pending_transactions: usize,
    pub last_failure: Option<String>,
}
