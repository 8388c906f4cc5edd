use std::{fmt::Display, ops::Add};

use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionNonce(u64);

impl TransactionNonce {
    pub fn new(nonce: u64) -> Self {
        TransactionNonce(nonce)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl Add<u64> for TransactionNonce {
    type Output = Self;

    fn add(self, other: u64) -> Self {
        TransactionNonce(self.0.saturating_add(other))
    }
}

impl Display for TransactionNonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TransactionNonce {
    fn from(nonce: u64) -> Self {
        TransactionNonce(nonce)
    }
}
