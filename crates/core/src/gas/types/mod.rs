mod gas_limit;
pub use gas_limit::{GasLimit, ParseGasLimitError};
