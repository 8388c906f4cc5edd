use alloy::{primitives::U256, rpc::types::TransactionRequest, signers::local::PrivateKeySigner};
use async_trait::async_trait;
use thiserror::Error;

use crate::{
    gas::types::GasLimit,
    shared::common_types::EvmAddress,
    transaction::types::{TransactionHash, TransactionNonce},
};

/// Final on-chain result of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

/// Failures reported by the chain client, already split into the classes the
/// submission pipeline reacts to differently.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainClientError {
    #[error("Nonce conflict: {0}")]
    NonceConflict(String),

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Replacement transaction underpriced: {0}")]
    ReplacementUnderpriced(String),

    #[error("Transaction builder error: {0}")]
    TransactionBuilder(String),

    #[error("Provider error: {0}")]
    Rpc(String),
}

impl ChainClientError {
    /// Maps a free-text node error onto a tagged variant. Only used where the
    /// underlying client gives us nothing better than a message.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        if lower.contains("nonce too low")
            || lower.contains("nonce too high")
            || lower.contains("invalid nonce")
            || lower.contains("already known")
        {
            ChainClientError::NonceConflict(message)
        } else if lower.contains("insufficient funds") {
            ChainClientError::InsufficientFunds(message)
        } else if lower.contains("aa24 signature error") || lower.contains("invalid signature") {
            ChainClientError::InvalidSignature(message)
        } else if lower.contains("replacement transaction underpriced") {
            ChainClientError::ReplacementUnderpriced(message)
        } else {
            ChainClientError::Rpc(message)
        }
    }
}

/// Everything the bundler needs from a blockchain node.
///
/// `send_transaction` fills the nonce from the signer's pending transaction count when the
/// request does not carry one, so callers must serialize broadcasts per signer.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn get_balance(&self, address: &EvmAddress) -> Result<U256, ChainClientError>;

    async fn get_transaction_count(
        &self,
        address: &EvmAddress,
    ) -> Result<TransactionNonce, ChainClientError>;

    async fn estimate_gas(&self, request: &TransactionRequest) -> Result<GasLimit, ChainClientError>;

    async fn send_transaction(
        &self,
        signer: &PrivateKeySigner,
        request: TransactionRequest,
    ) -> Result<TransactionHash, ChainClientError>;

    /// Resolves once the transaction is mined. Has no deadline of its own.
    async fn wait_for_receipt(
        &self,
        hash: &TransactionHash,
    ) -> Result<ReceiptStatus, ChainClientError>;
}
