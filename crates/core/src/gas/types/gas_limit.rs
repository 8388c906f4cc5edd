use std::{
    fmt::Display,
    ops::{Add, Mul},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GasLimit(u128);

impl GasLimit {
    pub fn new(gas_limit: u128) -> Self {
        GasLimit(gas_limit)
    }

    pub fn into_inner(self) -> u128 {
        self.0
    }

    /// Adds `percent` on top of the limit, rounding the margin down.
    pub fn with_margin(self, percent: u64) -> Self {
        GasLimit(self.0.saturating_add(self.0.saturating_mul(percent as u128) / 100))
    }
}

impl Display for GasLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Mul<u32> for GasLimit {
    type Output = GasLimit;

    fn mul(self, other: u32) -> Self::Output {
        GasLimit(self.0.saturating_mul(other as u128))
    }
}

impl Add for GasLimit {
    type Output = GasLimit;

    fn add(self, other: GasLimit) -> Self::Output {
        GasLimit(self.0.saturating_add(other.0))
    }
}

#[derive(Debug)]
pub struct ParseGasLimitError;

impl Display for ParseGasLimitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid gas limit")
    }
}

impl std::error::Error for ParseGasLimitError {}

impl FromStr for GasLimit {
    type Err = ParseGasLimitError;

    fn from_str(param: &str) -> Result<Self, Self::Err> {
        param.parse::<u128>().map(GasLimit).map_err(|_| ParseGasLimitError)
    }
}

impl From<GasLimit> for u128 {
    fn from(gas_limit: GasLimit) -> Self {
        gas_limit.0
    }
}

impl From<GasLimit> for u64 {
    fn from(gas_limit: GasLimit) -> Self {
        u64::try_from(gas_limit.0).unwrap_or(u64::MAX)
    }
}

impl From<u128> for GasLimit {
    fn from(gas_limit: u128) -> Self {
        GasLimit(gas_limit)
    }
}

impl From<u64> for GasLimit {
    fn from(gas_limit: u64) -> Self {
        GasLimit(gas_limit as u128)
    }
}
