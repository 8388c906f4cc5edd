use std::time::Duration;

use alloy::primitives::U256;

mod pool;
pub use pool::{SelectedWallet, WalletPool, WalletPoolLoadError};

mod relay_wallet;
pub use relay_wallet::{RelayWallet, TransactionRecord, WalletSnapshot};

mod scorer;
pub use scorer::{WalletScore, WalletScorer};

#[derive(Debug, Clone)]
pub struct WalletPoolConfig {
    pub max_pending: u32,
    pub max_failures: u32,
    pub min_balance: U256,
    /// Balance headroom worth one scoring point.
    pub balance_unit: U256,
    pub cool_down: Duration,
}

impl Default for WalletPoolConfig {
    fn default() -> Self {
        Self {
            max_pending: 3,
            max_failures: 3,
            min_balance: U256::from(10_000_000_000_000_000u128),
            balance_unit: U256::from(10_000_000_000_000_000u128),
            cool_down: Duration::from_millis(1_000),
        }
    }
}
