use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::types::{TransactionHash, TransactionStatus};
use crate::{
    provider::{ChainClient, ReceiptStatus},
    shared::{common_types::EvmAddress, BundlerError},
    wallet_pool::WalletPool,
};

/// How a tracked transaction ended.
#[derive(Debug, Clone)]
pub struct TransactionOutcome {
    pub hash: TransactionHash,
    pub wallet: EvmAddress,
    pub status: TransactionStatus,
    pub error: Option<BundlerError>,
}

pub struct TransactionTracker {
    pool: Arc<WalletPool>,
    chain_client: Arc<dyn ChainClient>,
    confirmation_timeout: Duration,
}

impl TransactionTracker {
    pub fn new(
        pool: Arc<WalletPool>,
        chain_client: Arc<dyn ChainClient>,
        confirmation_timeout: Duration,
    ) -> Self {
        Self { pool, chain_client, confirmation_timeout }
    }

    /// Records `hash` as pending on `wallet` and spawns a task that waits for its receipt or
    /// the confirmation timeout, whichever comes first, then settles the wallet's counters.
    pub async fn track(
        &self,
        hash: TransactionHash,
        wallet: EvmAddress,
    ) -> JoinHandle<TransactionOutcome> {
        self.pool.record_pending_transaction(&wallet, hash).await;

        let pool = self.pool.clone();
        let chain_client = self.chain_client.clone();
        let timeout = self.confirmation_timeout;

        tokio::spawn(async move {
            let waited = tokio::time::timeout(timeout, chain_client.wait_for_receipt(&hash)).await;

            let (status, error) = match waited {
                Ok(Ok(ReceiptStatus::Success)) => (TransactionStatus::Confirmed, None),
                Ok(Ok(ReceiptStatus::Reverted)) => (
                    TransactionStatus::Failed,
                    Some(BundlerError::TransactionReverted { hash, wallet }),
                ),
                Ok(Err(e)) => {
                    (TransactionStatus::Failed, Some(BundlerError::from_chain_error(wallet, e)))
                }
                Err(_) => (
                    TransactionStatus::Failed,
                    Some(BundlerError::TransactionTimeout { hash, wallet, timeout }),
                ),
            };

            let failure_reason = error.as_ref().map(|e| e.to_string());
            if pool.resolve_transaction(&wallet, &hash, status, failure_reason).await {
                match &error {
                    None => {
                        pool.record_success(&wallet).await;
                        info!("Transaction {} from relay wallet {} confirmed", hash, wallet);
                    }
                    Some(e) => {
                        pool.record_failure(&wallet, e).await;
                        error!("Transaction {} from relay wallet {} failed: {}", hash, wallet, e);
                    }
                }
            } else {
                warn!("Transaction {} from relay wallet {} was already resolved", hash, wallet);
            }

            TransactionOutcome { hash, wallet, status, error }
        })
    }
}
