mod gas_estimator;
pub use gas_estimator::GasEstimator;

pub mod types;
pub use types::*;
