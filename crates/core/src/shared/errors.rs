use std::{fmt::Display, time::Duration};

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{
    provider::ChainClientError, shared::common_types::EvmAddress,
    transaction::types::TransactionHash, user_operation::ValidationError,
};

/// Machine readable error classes surfaced to the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidParams,
    BannedAddress,
    InvalidGasParameters,
    NoWalletAvailable,
    InsufficientBalance,
    InvalidSignature,
    NonceConflict,
    BroadcastFailed,
    TransactionReverted,
    TransactionTimeout,
    MaxRetriesExceeded,
    Internal,
}

impl ErrorKind {
    /// JSON-RPC error code for this kind.
    pub fn code(&self) -> i64 {
        match self {
            ErrorKind::InvalidParams => -32602,
            ErrorKind::Internal => -32603,
            ErrorKind::InvalidSignature => -32102,
            ErrorKind::NoWalletAvailable => -32200,
            ErrorKind::InsufficientBalance => -32201,
            ErrorKind::MaxRetriesExceeded => -32202,
            ErrorKind::TransactionReverted => -32203,
            ErrorKind::TransactionTimeout => -32204,
            ErrorKind::InvalidGasParameters => -32205,
            ErrorKind::NonceConflict => -32206,
            ErrorKind::BroadcastFailed => -32208,
            ErrorKind::BannedAddress => -32301,
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Error, Debug, Clone)]
pub enum BundlerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("No available wallet found")]
    NoWalletAvailable { wallets: usize, max_pending: u32, max_failures: u32, cool_down: Duration },

    #[error("Relay wallet {address} has insufficient balance {balance} (minimum {minimum})")]
    InsufficientBalance { address: EvmAddress, balance: U256, minimum: U256 },

    #[error("Invalid UserOperation signature: {details}")]
    InvalidSignature { wallet: EvmAddress, details: String },

    #[error("Nonce conflict on relay wallet {wallet}: {details}")]
    NonceConflict { wallet: EvmAddress, details: String },

    #[error("Broadcast from relay wallet {wallet} failed: {source}")]
    BroadcastFailed { wallet: EvmAddress, source: ChainClientError },

    #[error("Transaction {hash} reverted")]
    TransactionReverted { hash: TransactionHash, wallet: EvmAddress },

    #[error("Transaction {hash} was not confirmed within {timeout:?}")]
    TransactionTimeout { hash: TransactionHash, wallet: EvmAddress, timeout: Duration },

    #[error("Failed after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: Box<BundlerError> },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BundlerError {
    /// Lifts a chain client failure observed while using `wallet` into the boundary taxonomy.
    pub fn from_chain_error(wallet: EvmAddress, error: ChainClientError) -> Self {
        match error {
            ChainClientError::NonceConflict(details) => {
                BundlerError::NonceConflict { wallet, details }
            }
            ChainClientError::InvalidSignature(details) => {
                BundlerError::InvalidSignature { wallet, details }
            }
            source => BundlerError::BroadcastFailed { wallet, source },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BundlerError::Validation(error) => error.kind(),
            BundlerError::NoWalletAvailable { .. } => ErrorKind::NoWalletAvailable,
            BundlerError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            BundlerError::InvalidSignature { .. } => ErrorKind::InvalidSignature,
            BundlerError::NonceConflict { .. } => ErrorKind::NonceConflict,
            BundlerError::BroadcastFailed { source, .. } => match source {
                ChainClientError::InsufficientFunds(_) => ErrorKind::InsufficientBalance,
                _ => ErrorKind::BroadcastFailed,
            },
            BundlerError::TransactionReverted { .. } => ErrorKind::TransactionReverted,
            BundlerError::TransactionTimeout { .. } => ErrorKind::TransactionTimeout,
            BundlerError::MaxRetriesExceeded { .. } => ErrorKind::MaxRetriesExceeded,
            BundlerError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn code(&self) -> i64 {
        self.kind().code()
    }

    /// Whether another submission attempt could succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            BundlerError::Validation(_)
                | BundlerError::InvalidSignature { .. }
                | BundlerError::MaxRetriesExceeded { .. }
                | BundlerError::Internal(_)
        )
    }

    /// Whether the failure says something about the relay wallet rather than the operation.
    /// A wallet short on funds is left to the balance check at selection time.
    pub fn counts_against_wallet(&self) -> bool {
        !matches!(
            self,
            BundlerError::Validation(_)
                | BundlerError::InvalidSignature { .. }
                | BundlerError::InsufficientBalance { .. }
                | BundlerError::BroadcastFailed {
                    source: ChainClientError::InsufficientFunds(_),
                    ..
                }
        )
    }

    /// Structured context for the JSON-RPC `data` member.
    pub fn data(&self) -> Value {
        let mut data = match self {
            BundlerError::Validation(error) => error.data(),
            BundlerError::NoWalletAvailable { wallets, max_pending, max_failures, cool_down } => {
                json!({
                    "wallets": wallets,
                    "maxPending": max_pending,
                    "maxFailures": max_failures,
                    "cooldownPeriodMs": cool_down.as_millis() as u64,
                })
            }
            BundlerError::InsufficientBalance { address, balance, minimum } => json!({
                "address": address,
                "balance": balance.to_string(),
                "minimum": minimum.to_string(),
            }),
            BundlerError::InvalidSignature { wallet, details }
            | BundlerError::NonceConflict { wallet, details } => {
                json!({ "wallet": wallet, "details": details })
            }
            BundlerError::BroadcastFailed { wallet, source } => {
                json!({ "wallet": wallet, "details": source.to_string() })
            }
            BundlerError::TransactionReverted { hash, wallet } => {
                json!({ "hash": hash, "wallet": wallet })
            }
            BundlerError::TransactionTimeout { hash, wallet, timeout } => json!({
                "hash": hash,
                "wallet": wallet,
                "timeoutMs": timeout.as_millis() as u64,
            }),
            BundlerError::MaxRetriesExceeded { attempts, last_error } => json!({
                "attempts": attempts,
                "lastError": {
                    "code": last_error.code(),
                    "message": last_error.to_string(),
                    "data": last_error.data(),
                },
            }),
            BundlerError::Internal(_) => json!({}),
        };

        if let Value::Object(map) = &mut data {
            map.insert("kind".to_string(), json!(self.kind()));
        }

        data
    }
}
