use std::str::FromStr;

use alloy::signers::local::PrivateKeySigner;
use thiserror::Error;

use crate::shared::common_types::EvmAddress;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Signing key {index} is invalid: {source}")]
    SigningKeyError {
        index: usize,
        #[source]
        source: alloy::signers::local::LocalSignerError,
    },

    #[error("No signing key configured")]
    NoSigningKey,
}

/// Parses hex private keys (with or without `0x`) into local signers, in configured order.
pub fn signers_from_keys(keys: &[String]) -> Result<Vec<PrivateKeySigner>, WalletError> {
    if keys.is_empty() {
        return Err(WalletError::NoSigningKey);
    }

    keys.iter()
        .enumerate()
        .map(|(index, key)| {
            PrivateKeySigner::from_str(key.trim())
                .map_err(|source| WalletError::SigningKeyError { index, source })
        })
        .collect()
}

pub fn signer_address(signer: &PrivateKeySigner) -> EvmAddress {
    EvmAddress::new(signer.address())
}

#[cfg(test)]
mod tests {
    use super::*;

    // anvil account 0
    const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_parses_keys_with_and_without_prefix() {
        let signers =
            signers_from_keys(&[KEY.to_string(), KEY.trim_start_matches("0x").to_string()])
                .unwrap();

        assert_eq!(signers.len(), 2);
        assert_eq!(
            signer_address(&signers[0]).hex(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
        assert_eq!(signers[0].address(), signers[1].address());
    }

    #[test]
    fn test_rejects_bad_keys() {
        assert!(matches!(signers_from_keys(&[]), Err(WalletError::NoSigningKey)));
        assert!(matches!(
            signers_from_keys(&[KEY.to_string(), "0x1234".to_string()]),
            Err(WalletError::SigningKeyError { index: 1, .. })
        ));
    }
}
