mod transaction_pruning_task;

use std::{sync::Arc, time::Duration};

use tracing::info;

use crate::{
    background_tasks::transaction_pruning_task::run_transaction_pruning_task,
    wallet_pool::WalletPool,
};

pub async fn run_background_tasks(pool: Arc<WalletPool>, record_retention: Duration) {
    info!("Starting background tasks");

    run_transaction_pruning_task(pool, record_retention).await;

    info!("Background tasks spawned up");
}
