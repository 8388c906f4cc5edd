use std::{collections::HashMap, sync::Arc, time::Duration};

use alloy::{
    network::TransactionBuilder, primitives::FixedBytes, rpc::types::TransactionRequest,
};
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, warn};

use super::types::GasLimit;
use crate::{
    provider::ChainClient, shared::common_types::EvmAddress,
    user_operation::types::FormattedOperation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct GasCacheKey {
    target: EvmAddress,
    account_selector: FixedBytes<4>,
    inner_selector: FixedBytes<4>,
}

impl GasCacheKey {
    fn for_operation(operation: &FormattedOperation) -> Self {
        Self {
            target: operation.target,
            account_selector: operation.account_selector,
            inner_selector: operation.inner_selector,
        }
    }
}

/// How long a simulated base stays usable before the call shape is simulated again.
pub const GAS_CACHE_TTL: Duration = Duration::from_secs(60 * 10);

struct CacheEntry {
    base: GasLimit,
    expiration_time: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expiration_time > now
    }
}

/// Gas limits for `handleOps` submissions, caching the simulated base usage per call shape.
pub struct GasEstimator {
    chain_client: Arc<dyn ChainClient>,
    entry_point: EvmAddress,
    margin_percent: u64,
    cache: Mutex<HashMap<GasCacheKey, CacheEntry>>,
}

impl GasEstimator {
    pub fn new(chain_client: Arc<dyn ChainClient>, entry_point: EvmAddress, margin_percent: u64) -> Self {
        Self { chain_client, entry_point, margin_percent, cache: Mutex::new(HashMap::new()) }
    }

    /// Never fails: when simulation errors the declared total plus margin is used instead.
    pub async fn estimate(&self, operation: &FormattedOperation, from: &EvmAddress) -> GasLimit {
        let declared = operation.declared_total_gas();
        let key = GasCacheKey::for_operation(operation);

        let cached = {
            let mut cache = self.cache.lock().await;
            let now = Instant::now();
            match cache.get(&key).map(|entry| (entry.base, entry.is_live(now))) {
                Some((base, true)) => Some(base),
                Some((_, false)) => {
                    cache.remove(&key);
                    None
                }
                None => None,
            }
        };
        if let Some(cached) = cached {
            if cached <= declared {
                let estimate = cached.with_margin(self.margin_percent).min(declared);
                debug!(
                    "gas cache hit for {} - cached {} declared {} estimate {}",
                    operation.target, cached, declared, estimate
                );
                return estimate;
            }
        }

        let request = TransactionRequest::default()
            .with_from(from.into_address())
            .with_to(self.entry_point.into_address())
            .with_input(operation.handle_ops_call_data(from));

        match self.chain_client.estimate_gas(&request).await {
            Ok(simulated) => {
                let base = simulated.min(declared);
                let now = Instant::now();
                let mut cache = self.cache.lock().await;
                cache.retain(|_, entry| entry.is_live(now));
                cache.insert(key, CacheEntry { base, expiration_time: now + GAS_CACHE_TTL });
                drop(cache);
                let estimate = base.with_margin(self.margin_percent);
                debug!(
                    "simulated handleOps for {} - simulated {} declared {} estimate {}",
                    operation.target, simulated, declared, estimate
                );
                estimate
            }
            Err(e) => {
                let estimate = declared.with_margin(self.margin_percent);
                warn!(
                    "gas simulation for {} failed, falling back to declared total {}: {}",
                    operation.target, estimate, e
                );
                estimate
            }
        }
    }

    #[cfg(test)]
    async fn cached(&self, operation: &FormattedOperation) -> Option<GasLimit> {
        let now = Instant::now();
        self.cache
            .lock()
            .await
            .get(&GasCacheKey::for_operation(operation))
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.base)
    }

    #[cfg(test)]
    async fn cache_len(&self) -> usize {
        self.cache.lock().await.len()
    }
}
