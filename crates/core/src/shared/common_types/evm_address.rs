use std::{error::Error, fmt::Display, str::FromStr};

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub struct EvmAddress(Address);

impl EvmAddress {
    /// Returns the checksummed hex representation of the address.
    pub fn hex(&self) -> String {
        self.0.to_checksum(None)
    }

    pub const fn new(address: Address) -> Self {
        EvmAddress(address)
    }

    pub fn into_address(self) -> Address {
        self.0
    }

    pub fn zero() -> Self {
        Self(Address::ZERO)
    }
}

impl Display for EvmAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hex())
    }
}

#[derive(Debug)]
pub struct ParseEvmAddressError(String);

impl Display for ParseEvmAddressError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid EVM address: {}", self.0)
    }
}

impl Error for ParseEvmAddressError {}

impl FromStr for EvmAddress {
    type Err = ParseEvmAddressError;

    fn from_str(param: &str) -> Result<Self, Self::Err> {
        Address::from_str(param.trim())
            .map(EvmAddress)
            .map_err(|e| ParseEvmAddressError(format!("{} ({})", param, e)))
    }
}

impl From<EvmAddress> for Address {
    fn from(address: EvmAddress) -> Self {
        address.0
    }
}

impl From<Address> for EvmAddress {
    fn from(address: Address) -> Self {
        EvmAddress(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        let lower = EvmAddress::from_str("0x742d35cc6af6c5c8c3c4b4c8e1a36f1c57f1b8ff").unwrap();
        let mixed = EvmAddress::from_str("0x742d35Cc6aF6C5C8c3C4B4C8e1A36F1c57F1b8Ff").unwrap();

        assert_eq!(lower, mixed);
    }

    #[test]
    fn test_rejects_short_address() {
        assert!(EvmAddress::from_str("0x1234").is_err());
        assert!(EvmAddress::from_str("0xmaliciousContract").is_err());
    }
}
