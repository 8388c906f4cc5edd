use std::{sync::Arc, time::Duration};

use alloy::{network::TransactionBuilder, rpc::types::TransactionRequest};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{
    tracker::{TransactionOutcome, TransactionTracker},
    types::TransactionHash,
};
use crate::{
    gas::{GasEstimator, GasLimit},
    provider::ChainClient,
    shared::{common_types::EvmAddress, BundlerError},
    user_operation::{
        types::{FormattedOperation, UserOperation},
        UserOperationValidator,
    },
    wallet_pool::{SelectedWallet, WalletPool},
};

#[derive(Debug, Clone)]
pub struct SubmissionConfig {
    pub entry_point: EvmAddress,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

impl SubmissionConfig {
    pub fn new(entry_point: EvmAddress) -> Self {
        Self {
            entry_point,
            max_attempts: 3,
            retry_delay: Duration::from_millis(1_000),
            max_fee_per_gas: 100_000_000_000,
            max_priority_fee_per_gas: 2_000_000_000,
        }
    }
}

/// A broadcast operation. `tracking` resolves once the transaction is confirmed, reverted or
/// timed out; dropping it does not stop tracking.
#[derive(Debug)]
pub struct SubmittedOperation {
    pub hash: TransactionHash,
    pub wallet: EvmAddress,
    pub gas_limit: GasLimit,
    pub attempts: u32,
    pub tracking: JoinHandle<TransactionOutcome>,
}

/// Owns a selected wallet's pending slot until the attempt's outcome reaches the pool. Dropped
/// armed, as when the submission future is cancelled mid-broadcast, it hands the slot back.
struct SlotGuard {
    pool: Arc<WalletPool>,
    address: Option<EvmAddress>,
}

impl SlotGuard {
    fn new(pool: Arc<WalletPool>, address: EvmAddress) -> Self {
        Self { pool, address: Some(address) }
    }

    fn disarm(mut self) {
        self.address = None;
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let Some(address) = self.address.take() else {
            return;
        };

        warn!("Submission through relay wallet {} was abandoned, releasing its slot", address);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let pool = self.pool.clone();
                handle.spawn(async move {
                    pool.release_wallet(&address).await;
                });
            }
            Err(_) => warn!("No runtime to release relay wallet {} on", address),
        }
    }
}

pub struct SubmissionOrchestrator {
    pool: Arc<WalletPool>,
    validator: UserOperationValidator,
    gas_estimator: GasEstimator,
    tracker: TransactionTracker,
    chain_client: Arc<dyn ChainClient>,
    config: SubmissionConfig,
}

impl SubmissionOrchestrator {
    pub fn new(
        pool: Arc<WalletPool>,
        validator: UserOperationValidator,
        gas_estimator: GasEstimator,
        tracker: TransactionTracker,
        chain_client: Arc<dyn ChainClient>,
        config: SubmissionConfig,
    ) -> Self {
        Self { pool, validator, gas_estimator, tracker, chain_client, config }
    }

    pub fn entry_point(&self) -> &EvmAddress {
        &self.config.entry_point
    }

    pub fn pool(&self) -> &Arc<WalletPool> {
        &self.pool
    }

    /// Submits `operation` through `handleOps` and returns the transaction hash as soon as it
    /// is broadcast. Confirmation is tracked in the background.
    pub async fn send_operation(
        &self,
        operation: &UserOperation,
    ) -> Result<TransactionHash, BundlerError> {
        self.submit_operation(operation).await.map(|submitted| submitted.hash)
    }

    pub async fn submit_operation(
        &self,
        operation: &UserOperation,
    ) -> Result<SubmittedOperation, BundlerError> {
        let formatted = self.validator.validate_and_format(operation)?;
        let max_attempts = self.config.max_attempts.max(1);

        let mut last_error: Option<BundlerError> = None;
        for attempt in 1..=max_attempts {
            match self.attempt(&formatted, attempt).await {
                Ok(submitted) => return Ok(submitted),
                Err(error) => {
                    warn!(
                        "Submission attempt {}/{} for {} failed: {}",
                        attempt, max_attempts, formatted.target, error
                    );

                    if !error.is_retryable() {
                        return Err(error);
                    }

                    last_error = Some(error);
                    if attempt < max_attempts {
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
            }
        }

        Err(BundlerError::MaxRetriesExceeded {
            attempts: max_attempts,
            last_error: Box::new(last_error.unwrap_or_else(|| {
                BundlerError::Internal("no submission attempt was made".to_string())
            })),
        })
    }

    async fn attempt(
        &self,
        formatted: &FormattedOperation,
        attempt: u32,
    ) -> Result<SubmittedOperation, BundlerError> {
        // no slot is held if selection fails
        let wallet = self.pool.select_wallet().await?;
        let slot = SlotGuard::new(self.pool.clone(), wallet.address);

        let gas_limit = self.gas_estimator.estimate(formatted, &wallet.address).await;
        let request = self.handle_ops_request(formatted, &wallet, gas_limit);

        let sent = {
            let signer = wallet.signer.lock().await;
            self.chain_client.send_transaction(&signer, request).await
        };

        match sent {
            Ok(hash) => {
                let tracking = self.tracker.track(hash, wallet.address).await;
                // the tracker settles the slot from here on
                slot.disarm();
                self.log_transaction_summary(formatted, &hash, &wallet.address, gas_limit);
                Ok(SubmittedOperation {
                    hash,
                    wallet: wallet.address,
                    gas_limit,
                    attempts: attempt,
                    tracking,
                })
            }
            Err(e) => {
                let error = BundlerError::from_chain_error(wallet.address, e);
                if error.counts_against_wallet() {
                    self.pool.record_failure(&wallet.address, &error).await;
                } else {
                    self.pool.release_wallet(&wallet.address).await;
                }
                slot.disarm();
                Err(error)
            }
        }
    }

    fn handle_ops_request(
        &self,
        formatted: &FormattedOperation,
        wallet: &SelectedWallet,
        gas_limit: GasLimit,
    ) -> TransactionRequest {
        TransactionRequest::default()
            .with_to(self.config.entry_point.into_address())
            .with_input(formatted.handle_ops_call_data(&wallet.address))
            .with_gas_limit(u64::from(gas_limit))
            .with_max_fee_per_gas(self.config.max_fee_per_gas)
            .with_max_priority_fee_per_gas(self.config.max_priority_fee_per_gas)
    }

    fn log_transaction_summary(
        &self,
        formatted: &FormattedOperation,
        hash: &TransactionHash,
        wallet: &EvmAddress,
        gas_limit: GasLimit,
    ) {
        let max_fee = self.config.max_fee_per_gas;
        debug!(
            "Gas calculation - call {} * {} = {}, verification {} * {} = {}, pre-verification {} * {} = {}",
            formatted.call_gas_limit,
            max_fee,
            formatted.call_gas_limit.into_inner().saturating_mul(max_fee),
            formatted.verification_gas_limit,
            max_fee,
            formatted.verification_gas_limit.into_inner().saturating_mul(max_fee),
            formatted.pre_verification_gas,
            max_fee,
            formatted.pre_verification_gas.into_inner().saturating_mul(max_fee),
        );
        info!(
            "Transaction summary - relay wallet: {}, entry point: {}, UserOperation sender: {}, target: {}, gas limit: {}, hash: {}",
            wallet,
            self.config.entry_point,
            EvmAddress::new(formatted.packed.sender),
            formatted.target,
            gas_limit,
            hash
        );
    }
}
