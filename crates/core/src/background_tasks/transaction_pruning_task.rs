use std::{sync::Arc, time::Duration};

use tokio::time::interval;
use tracing::{debug, info};

use crate::wallet_pool::WalletPool;

/// Sweep period, independent of the retention window.
pub const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

pub struct TransactionPruningTask {
    pool: Arc<WalletPool>,
    retention: Duration,
    period: Duration,
}

impl TransactionPruningTask {
    pub fn new(pool: Arc<WalletPool>, retention: Duration) -> Self {
        Self { pool, retention, period: PRUNE_INTERVAL }
    }

    pub async fn run(&mut self) {
        info!("Starting transaction record pruning background task");

        let mut interval = interval(self.period);

        loop {
            interval.tick().await;
            self.prune().await;
        }
    }

    async fn prune(&self) -> usize {
        let pruned = self.pool.prune_terminal_transactions(self.retention).await;
        if pruned > 0 {
            info!("Pruned {} resolved transaction records", pruned);
        } else {
            debug!("No resolved transaction records to prune");
        }
        pruned
    }
}

pub async fn run_transaction_pruning_task(pool: Arc<WalletPool>, retention: Duration) {
    let mut pruning_task = TransactionPruningTask::new(pool, retention);

    tokio::spawn(async move {
        pruning_task.run().await;
    });
}
