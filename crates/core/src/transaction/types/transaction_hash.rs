use std::{fmt::Display, str::FromStr};

use alloy::primitives::TxHash;
use serde::{Deserialize, Serialize};

/// Hash of a broadcast `handleOps` transaction. This is what `eth_sendUserOperation` returns.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct TransactionHash(TxHash);

impl Display for TransactionHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransactionHash {
    type Err = String;

    fn from_str(param: &str) -> Result<Self, Self::Err> {
        param.parse::<TxHash>().map(Self).map_err(|e| e.to_string())
    }
}

impl From<TxHash> for TransactionHash {
    fn from(hash: TxHash) -> Self {
        Self(hash)
    }
}

impl From<TransactionHash> for TxHash {
    fn from(hash: TransactionHash) -> Self {
        hash.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_plain_hex_string() {
        let hash = TransactionHash::from(TxHash::repeat_byte(0xab));

        let json = serde_json::to_value(hash).unwrap();

        assert_eq!(json, serde_json::json!(format!("0x{}", "ab".repeat(32))));
        assert_eq!(json.as_str().unwrap().parse::<TransactionHash>().unwrap(), hash);
    }
}
