use std::time::Duration;

use alloy::primitives::U256;
use tokio::time::Instant;

use super::{relay_wallet::WalletSnapshot, WalletPoolConfig};
use crate::shared::common_types::EvmAddress;

const BALANCE_WEIGHT: f64 = 2.5;
const PENDING_WEIGHT: f64 = 2.5;
const TIME_WEIGHT: f64 = 3.0;
const FAILURE_WEIGHT: f64 = 2.0;

const MAX_COMPONENT: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct WalletScore {
    pub address: EvmAddress,
    pub score: f64,
    pub balance: U256,
    pub snapshot: WalletSnapshot,
}

/// Availability and desirability of wallets. Every component is in `[0, 10]`, so scores land
/// in `[0, 100]`.
#[derive(Debug, Clone)]
pub struct WalletScorer {
    config: WalletPoolConfig,
}

impl WalletScorer {
    pub fn new(config: WalletPoolConfig) -> Self {
        Self { config }
    }

    /// Whether the wallet may take a new submission, ignoring balance.
    pub fn is_available(&self, wallet: &WalletSnapshot, now: Instant) -> bool {
        if wallet.failure_count >= self.config.max_failures {
            return false;
        }

        if wallet.pending_count >= self.config.max_pending {
            return false;
        }

        match wallet.last_used_at {
            Some(last_used) => now.saturating_duration_since(last_used) >= self.config.cool_down,
            None => true,
        }
    }

    pub fn has_min_balance(&self, balance: U256) -> bool {
        balance >= self.config.min_balance
    }

    pub fn score(&self, wallet: &WalletSnapshot, balance: U256, now: Instant) -> WalletScore {
        let score = self.balance_score(balance) * BALANCE_WEIGHT
            + self.pending_score(wallet.pending_count) * PENDING_WEIGHT
            + self.time_score(wallet.last_used_at, now) * TIME_WEIGHT
            + self.failure_score(wallet.failure_count) * FAILURE_WEIGHT;

        WalletScore { address: wallet.address, score, balance, snapshot: wallet.clone() }
    }

    fn balance_score(&self, balance: U256) -> f64 {
        let headroom = balance.saturating_sub(self.config.min_balance);
        if self.config.balance_unit.is_zero() {
            return if headroom.is_zero() { 0.0 } else { MAX_COMPONENT };
        }

        // thousandths of a unit, so partial units still count
        let cap = U256::from(10_000u64);
        let milli_units = headroom.saturating_mul(U256::from(1_000u64)) / self.config.balance_unit;
        let milli_units: u64 = milli_units.min(cap).to::<u64>();

        milli_units as f64 / 1_000.0
    }

    fn pending_score(&self, pending: u32) -> f64 {
        if self.config.max_pending == 0 {
            return 0.0;
        }

        let free = self.config.max_pending.saturating_sub(pending);
        free as f64 * MAX_COMPONENT / self.config.max_pending as f64
    }

    fn time_score(&self, last_used_at: Option<Instant>, now: Instant) -> f64 {
        let Some(last_used) = last_used_at else {
            return MAX_COMPONENT;
        };

        let elapsed = now.saturating_duration_since(last_used);
        let divisor = (self.config.cool_down * 10).max(Duration::from_millis(1));

        (elapsed.as_secs_f64() / divisor.as_secs_f64()).min(MAX_COMPONENT)
    }

    fn failure_score(&self, failures: u32) -> f64 {
        if self.config.max_failures == 0 {
            return 0.0;
        }

        let headroom = self.config.max_failures.saturating_sub(failures);
        headroom as f64 * MAX_COMPONENT / self.config.max_failures as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::types::TransactionNonce;

    const ETHER: u128 = 1_000_000_000_000_000_000;

    fn scorer() -> WalletScorer {
        WalletScorer::new(WalletPoolConfig::default())
    }

    fn snapshot(pending: u32, failures: u32, last_used_at: Option<Instant>) -> WalletSnapshot {
        WalletSnapshot {
            address: EvmAddress::zero(),
            pending_count: pending,
            failure_count: failures,
            last_used_at,
            idle_ms: None,
            current_nonce: TransactionNonce::new(0),
            pending_transactions: 0,
            last_failure: None,
        }
    }

    #[test]
    fn test_fresh_wallet_with_ample_balance_scores_maximum() {
        let score = scorer().score(&snapshot(0, 0, None), U256::from(ETHER), Instant::now());

        assert!((score.score - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_score_is_monotonic_in_each_component() {
        let scorer = scorer();
        let now = Instant::now();
        let base = snapshot(1, 1, None);
        let balance = U256::from(ETHER / 20);
        let score = |wallet: &WalletSnapshot, balance: U256| scorer.score(wallet, balance, now).score;

        let reference = score(&base, balance);

        assert!(score(&base, balance * U256::from(2)) > reference);
        assert!(score(&snapshot(2, 1, None), balance) < reference);
        assert!(score(&snapshot(1, 2, None), balance) < reference);
    }

    #[tokio::test(start_paused = true)]
    async fn test_longer_idle_scores_higher() {
        let scorer = scorer();
        let earlier = Instant::now();
        tokio::time::advance(Duration::from_secs(5)).await;
        let later = Instant::now();
        tokio::time::advance(Duration::from_secs(1)).await;
        let now = Instant::now();

        let idle_longer = scorer.score(&snapshot(0, 0, Some(earlier)), U256::ZERO, now).score;
        let idle_shorter = scorer.score(&snapshot(0, 0, Some(later)), U256::ZERO, now).score;

        assert!(idle_longer > idle_shorter);
    }

    #[tokio::test(start_paused = true)]
    async fn test_availability_filters() {
        let scorer = scorer();
        let used = Instant::now();

        assert!(scorer.is_available(&snapshot(2, 2, None), used));
        assert!(!scorer.is_available(&snapshot(3, 0, None), used));
        assert!(!scorer.is_available(&snapshot(0, 3, None), used));
        assert!(!scorer.is_available(&snapshot(0, 0, Some(used)), used));

        tokio::time::advance(Duration::from_millis(1_000)).await;
        assert!(scorer.is_available(&snapshot(0, 0, Some(used)), Instant::now()));
    }

    #[test]
    fn test_min_balance() {
        let scorer = scorer();

        assert!(!scorer.has_min_balance(U256::from(ETHER / 100 - 1)));
        assert!(scorer.has_min_balance(U256::from(ETHER / 100)));
    }
}
