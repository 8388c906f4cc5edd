use std::{
    cmp::Ordering,
    collections::HashMap,
    sync::Arc,
    time::{Duration, SystemTime},
};

use alloy::{primitives::U256, signers::local::PrivateKeySigner};
use thiserror::Error;
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, info, warn};

use super::{
    relay_wallet::{RelayWallet, TransactionRecord, WalletSnapshot},
    scorer::{WalletScore, WalletScorer},
    WalletPoolConfig,
};
use crate::{
    provider::{ChainClient, ChainClientError},
    shared::{common_types::EvmAddress, BundlerError, ErrorKind},
    transaction::types::{TransactionHash, TransactionNonce, TransactionStatus},
};

#[derive(Error, Debug)]
pub enum WalletPoolLoadError {
    #[error("At least one signing key is required")]
    NoSigningKeys,

    #[error("Could not fetch nonce for relay wallet {address}: {source}")]
    NonceFetch { address: EvmAddress, source: ChainClientError },
}

/// The wallet handed to a submission. The pending slot it holds must be given back through
/// exactly one of `release_wallet`, `record_failure`, or the tracked transaction's outcome.
#[derive(Debug, Clone)]
pub struct SelectedWallet {
    pub address: EvmAddress,
    pub signer: Arc<Mutex<PrivateKeySigner>>,
    pub balance: U256,
    pub score: f64,
}

pub struct WalletPool {
    wallets: Mutex<HashMap<EvmAddress, RelayWallet>>,
    scorer: WalletScorer,
    config: WalletPoolConfig,
    chain_client: Arc<dyn ChainClient>,
}

impl WalletPool {
    pub fn new(
        wallets: Vec<RelayWallet>,
        config: WalletPoolConfig,
        chain_client: Arc<dyn ChainClient>,
    ) -> Self {
        let wallets = wallets.into_iter().map(|wallet| (wallet.address, wallet)).collect();

        Self {
            wallets: Mutex::new(wallets),
            scorer: WalletScorer::new(config.clone()),
            config,
            chain_client,
        }
    }

    /// Builds the pool from signing keys, fetching each wallet's nonce and staggering their
    /// last use so the first selections spread across wallets.
    pub async fn load(
        signers: Vec<PrivateKeySigner>,
        config: WalletPoolConfig,
        chain_client: Arc<dyn ChainClient>,
    ) -> Result<Self, WalletPoolLoadError> {
        if signers.is_empty() {
            return Err(WalletPoolLoadError::NoSigningKeys);
        }

        let now = Instant::now();
        let mut wallets: Vec<RelayWallet> = Vec::with_capacity(signers.len());

        for (index, signer) in signers.into_iter().enumerate() {
            let address = EvmAddress::new(signer.address());
            if wallets.iter().any(|wallet| wallet.address == address) {
                warn!("Skipping duplicate signing key for relay wallet {}", address);
                continue;
            }

            let nonce = chain_client
                .get_transaction_count(&address)
                .await
                .map_err(|source| WalletPoolLoadError::NonceFetch { address, source })?;

            let mut wallet = RelayWallet::new(signer, nonce);
            wallet.last_used_at = now.checked_sub(config.cool_down * (index as u32 + 1));

            info!("Initialized relay wallet {} with nonce {}", address, nonce);
            wallets.push(wallet);
        }

        Ok(Self::new(wallets, config, chain_client))
    }

    pub fn config(&self) -> &WalletPoolConfig {
        &self.config
    }

    /// Picks the best eligible wallet and reserves a pending slot on it.
    pub async fn select_wallet(&self) -> Result<SelectedWallet, BundlerError> {
        let candidates: Vec<WalletSnapshot> = {
            let mut wallets = self.wallets.lock().await;
            self.reset_if_all_failed(&mut wallets);

            let now = Instant::now();
            wallets
                .values()
                .map(|wallet| wallet.snapshot(now))
                .filter(|snapshot| self.scorer.is_available(snapshot, now))
                .collect()
        };

        if candidates.is_empty() {
            return Err(self.no_wallet_available().await);
        }

        // no lock held while talking to the chain
        let now = Instant::now();
        let mut scored: Vec<WalletScore> = Vec::with_capacity(candidates.len());
        let mut underfunded: Option<(EvmAddress, U256)> = None;
        for snapshot in candidates {
            match self.chain_client.get_balance(&snapshot.address).await {
                Ok(balance) if !self.scorer.has_min_balance(balance) => {
                    debug!("Relay wallet {} below minimum balance: {}", snapshot.address, balance);
                    underfunded.get_or_insert((snapshot.address, balance));
                }
                Ok(balance) => scored.push(self.scorer.score(&snapshot, balance, now)),
                Err(e) => {
                    warn!("Could not fetch balance for relay wallet {}: {}", snapshot.address, e)
                }
            }
        }

        if scored.is_empty() {
            return Err(match underfunded {
                Some((address, balance)) => BundlerError::InsufficientBalance {
                    address,
                    balance,
                    minimum: self.config.min_balance,
                },
                None => self.no_wallet_available().await,
            });
        }

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.snapshot.last_used_at.cmp(&b.snapshot.last_used_at))
        });

        let mut wallets = self.wallets.lock().await;
        let now = Instant::now();
        for candidate in scored {
            let Some(wallet) = wallets.get_mut(&candidate.address) else {
                continue;
            };

            // another selection may have taken the slot while balances were fetched
            if !self.scorer.is_available(&wallet.snapshot(now), now) {
                continue;
            }

            wallet.pending_count += 1;
            wallet.last_used_at = Some(now);

            info!(
                "Selected relay wallet {} - score {:.2}, balance {}, pending {}, failures {}",
                wallet.address,
                candidate.score,
                candidate.balance,
                wallet.pending_count,
                wallet.failure_count
            );

            return Ok(SelectedWallet {
                address: wallet.address,
                signer: wallet.signer.clone(),
                balance: candidate.balance,
                score: candidate.score,
            });
        }
        drop(wallets);

        Err(self.no_wallet_available().await)
    }

    /// Gives back a pending slot without holding the failure against the wallet.
    pub async fn release_wallet(&self, address: &EvmAddress) {
        let mut wallets = self.wallets.lock().await;
        match wallets.get_mut(address) {
            Some(wallet) => {
                wallet.pending_count = wallet.pending_count.saturating_sub(1);
                debug!("Released relay wallet {} - pending {}", address, wallet.pending_count);
            }
            None => warn!("release_wallet called for unknown relay wallet {}", address),
        }
    }

    pub async fn record_success(&self, address: &EvmAddress) {
        let mut wallets = self.wallets.lock().await;
        match wallets.get_mut(address) {
            Some(wallet) => {
                wallet.pending_count = wallet.pending_count.saturating_sub(1);
                wallet.failure_count = 0;
                wallet.last_failure = None;
                wallet.current_nonce = wallet.current_nonce + 1;
                debug!(
                    "Recorded success for relay wallet {} - nonce {}, pending {}",
                    address, wallet.current_nonce, wallet.pending_count
                );
            }
            None => warn!("record_success called for unknown relay wallet {}", address),
        }
    }

    pub async fn record_failure(&self, address: &EvmAddress, cause: &BundlerError) {
        {
            let mut wallets = self.wallets.lock().await;
            let Some(wallet) = wallets.get_mut(address) else {
                warn!("record_failure called for unknown relay wallet {}", address);
                return;
            };

            wallet.pending_count = wallet.pending_count.saturating_sub(1);
            wallet.failure_count += 1;
            wallet.last_failure = Some(cause.to_string());

            warn!(
                "Recorded failure for relay wallet {} ({} of {}): {}",
                address, wallet.failure_count, self.config.max_failures, cause
            );
        }

        if cause.kind() == ErrorKind::NonceConflict {
            self.resync_nonce(address).await;
        }
    }

    /// Moves the local nonce up to the chain's pending count. Never moves it down.
    async fn resync_nonce(&self, address: &EvmAddress) {
        let chain_nonce = match self.chain_client.get_transaction_count(address).await {
            Ok(nonce) => nonce,
            Err(e) => {
                warn!("Nonce resync for relay wallet {} failed: {}", address, e);
                return;
            }
        };

        let mut wallets = self.wallets.lock().await;
        if let Some(wallet) = wallets.get_mut(address) {
            let previous = wallet.current_nonce;
            wallet.current_nonce = previous.max(chain_nonce);
            info!(
                "Resynced nonce for relay wallet {}: {} -> {}",
                address, previous, wallet.current_nonce
            );
        }
    }

    pub async fn record_pending_transaction(&self, address: &EvmAddress, hash: TransactionHash) {
        let mut wallets = self.wallets.lock().await;
        if let Some(wallet) = wallets.get_mut(address) {
            wallet.transactions.insert(hash, TransactionRecord::pending(hash));
        }
    }

    /// Applies a terminal status to a tracked transaction. Returns false if the record is
    /// missing or already resolved, in which case the caller must not touch wallet counters.
    pub async fn resolve_transaction(
        &self,
        address: &EvmAddress,
        hash: &TransactionHash,
        status: TransactionStatus,
        failure_reason: Option<String>,
    ) -> bool {
        let mut wallets = self.wallets.lock().await;
        wallets
            .get_mut(address)
            .and_then(|wallet| wallet.transactions.get_mut(hash))
            .map(|record| record.resolve(status, failure_reason))
            .unwrap_or(false)
    }

    pub async fn transaction(
        &self,
        address: &EvmAddress,
        hash: &TransactionHash,
    ) -> Option<TransactionRecord> {
        let wallets = self.wallets.lock().await;
        wallets.get(address).and_then(|wallet| wallet.transactions.get(hash)).cloned()
    }

    pub async fn wallet_snapshots(&self) -> Vec<WalletSnapshot> {
        let wallets = self.wallets.lock().await;
        let now = Instant::now();
        let mut snapshots: Vec<WalletSnapshot> =
            wallets.values().map(|wallet| wallet.snapshot(now)).collect();
        snapshots.sort_by_key(|snapshot| snapshot.address);
        snapshots
    }

    pub async fn wallet_snapshot(&self, address: &EvmAddress) -> Option<WalletSnapshot> {
        let wallets = self.wallets.lock().await;
        wallets.get(address).map(|wallet| wallet.snapshot(Instant::now()))
    }

    pub async fn get_nonce(&self, address: &EvmAddress) -> Option<TransactionNonce> {
        let wallets = self.wallets.lock().await;
        wallets.get(address).map(|wallet| wallet.current_nonce)
    }

    /// Drops terminal records resolved longer than `retention` ago. Returns how many went.
    pub async fn prune_terminal_transactions(&self, retention: Duration) -> usize {
        let now = SystemTime::now();
        let mut wallets = self.wallets.lock().await;
        let mut pruned = 0;

        for wallet in wallets.values_mut() {
            let before = wallet.transactions.len();
            wallet.transactions.retain(|_, record| match record.resolved_at {
                Some(resolved_at) if record.status.is_terminal() => {
                    now.duration_since(resolved_at).unwrap_or_default() < retention
                }
                _ => true,
            });
            pruned += before - wallet.transactions.len();
        }

        pruned
    }

    /// Circuit breaker: once every wallet is over the failure limit, give them all a clean slate.
    fn reset_if_all_failed(&self, wallets: &mut HashMap<EvmAddress, RelayWallet>) {
        if wallets.is_empty() ||
            !wallets.values().all(|wallet| wallet.failure_count >= self.config.max_failures)
        {
            return;
        }

        let cleared = Instant::now().checked_sub(self.config.cool_down);
        for wallet in wallets.values_mut() {
            wallet.failure_count = 0;
            wallet.last_used_at = cleared;
        }

        warn!("All {} relay wallets hit the failure limit, resetting failure counts", wallets.len());
    }

    async fn no_wallet_available(&self) -> BundlerError {
        let snapshots = self.wallet_snapshots().await;
        warn!("No available relay wallet found. Wallet states:");
        for snapshot in &snapshots {
            warn!(
                "Relay wallet {} - pending {}, failures {}, idle {:?}ms",
                snapshot.address, snapshot.pending_count, snapshot.failure_count, snapshot.idle_ms
            );
        }

        BundlerError::NoWalletAvailable {
            wallets: snapshots.len(),
            max_pending: self.config.max_pending,
            max_failures: self.config.max_failures,
            cool_down: self.config.cool_down,
        }
    }
}
