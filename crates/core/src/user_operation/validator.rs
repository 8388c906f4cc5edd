use std::collections::HashSet;

use alloy::{
    primitives::{hex, Bytes, FixedBytes, U256},
    sol_types::SolInterface,
};
use tracing::debug;

use super::{
    contracts::{ISmartAccount::ISmartAccountCalls, PackedUserOperation},
    pack::pack_u128_pair,
    types::{FormattedOperation, UserOperation},
    ValidationError,
};
use crate::{gas::types::GasLimit, shared::common_types::EvmAddress};

#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub min_verification_gas: u128,
    pub max_verification_gas: u128,
    pub max_total_gas: u128,
    pub max_call_data_size: usize,
    pub banned_addresses: HashSet<EvmAddress>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_verification_gas: 40_000,
            max_verification_gas: 5_000_000,
            max_total_gas: 10_000_000,
            max_call_data_size: 24_576,
            banned_addresses: HashSet::new(),
        }
    }
}

struct DecodedCall {
    targets: Vec<EvmAddress>,
    inner_selector: FixedBytes<4>,
}

pub struct UserOperationValidator {
    config: ValidationConfig,
}

impl UserOperationValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Checks `op` in order, failing on the first violation, and packs it for `handleOps`.
    pub fn validate_and_format(
        &self,
        op: &UserOperation,
    ) -> Result<FormattedOperation, ValidationError> {
        for (field, value) in op.required_fields() {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField { field });
            }
        }

        let sender = parse_sender(&op.sender)?;
        let init_code = parse_bytes("initCode", &op.init_code)?;
        let call_data = parse_bytes("callData", &op.call_data)?;
        let paymaster_and_data = parse_bytes("paymasterAndData", &op.paymaster_and_data)?;
        let signature = parse_bytes("signature", &op.signature)?;

        if call_data.len() > self.config.max_call_data_size {
            return Err(ValidationError::CallDataTooLarge {
                size: call_data.len(),
                max: self.config.max_call_data_size,
            });
        }

        let decoded = decode_account_call(&call_data)?;

        if let Some(banned) =
            decoded.targets.iter().find(|target| self.config.banned_addresses.contains(*target))
        {
            return Err(ValidationError::BannedAddress { address: *banned });
        }

        let verification_gas_limit =
            parse_gas("verificationGasLimit", &op.verification_gas_limit)?;
        if verification_gas_limit < self.config.min_verification_gas
            || verification_gas_limit > self.config.max_verification_gas
        {
            return Err(ValidationError::VerificationGasOutOfRange {
                value: verification_gas_limit,
                min: self.config.min_verification_gas,
                max: self.config.max_verification_gas,
            });
        }

        let nonce = parse_quantity("nonce", &op.nonce)?;
        let call_gas_limit = parse_gas("callGasLimit", &op.call_gas_limit)?;
        let pre_verification_gas = parse_gas("preVerificationGas", &op.pre_verification_gas)?;
        let max_fee_per_gas = parse_gas("maxFeePerGas", &op.max_fee_per_gas)?;
        let max_priority_fee_per_gas =
            parse_gas("maxPriorityFeePerGas", &op.max_priority_fee_per_gas)?;

        let total = call_gas_limit
            .checked_add(verification_gas_limit)
            .and_then(|sum| sum.checked_add(pre_verification_gas))
            .unwrap_or(u128::MAX);
        if total > self.config.max_total_gas {
            return Err(ValidationError::TotalGasTooHigh { total, max: self.config.max_total_gas });
        }

        if max_priority_fee_per_gas > max_fee_per_gas {
            return Err(ValidationError::PriorityFeeAboveMaxFee {
                priority_fee: max_priority_fee_per_gas,
                max_fee: max_fee_per_gas,
            });
        }

        let account_selector = FixedBytes::<4>::from_slice(&call_data[..4]);
        let target = decoded.targets[0];

        debug!(
            "validated UserOperation from {} targeting {} (total gas {})",
            sender, target, total
        );

        Ok(FormattedOperation {
            packed: PackedUserOperation {
                sender: sender.into_address(),
                nonce,
                initCode: init_code,
                callData: call_data,
                accountGasLimits: pack_u128_pair(verification_gas_limit, call_gas_limit),
                preVerificationGas: U256::from(pre_verification_gas),
                gasFees: pack_u128_pair(max_priority_fee_per_gas, max_fee_per_gas),
                paymasterAndData: paymaster_and_data,
                signature,
            },
            target,
            call_gas_limit: GasLimit::new(call_gas_limit),
            verification_gas_limit: GasLimit::new(verification_gas_limit),
            pre_verification_gas: GasLimit::new(pre_verification_gas),
            max_fee_per_gas,
            max_priority_fee_per_gas,
            account_selector,
            inner_selector: decoded.inner_selector,
        })
    }
}

fn parse_sender(value: &str) -> Result<EvmAddress, ValidationError> {
    let value = value.trim();
    if !value.starts_with("0x") || value.len() != 42 {
        return Err(ValidationError::InvalidSender { value: value.to_string() });
    }

    value.parse().map_err(|_| ValidationError::InvalidSender { value: value.to_string() })
}

fn parse_bytes(field: &'static str, value: &str) -> Result<Bytes, ValidationError> {
    let digits =
        value.trim().strip_prefix("0x").ok_or(ValidationError::InvalidHexField { field })?;

    hex::decode(digits).map(Bytes::from).map_err(|_| ValidationError::InvalidHexField { field })
}

/// Hex (`0x` prefixed) or decimal integer.
fn parse_quantity(field: &'static str, value: &str) -> Result<U256, ValidationError> {
    let value = value.trim();
    let invalid = || ValidationError::InvalidNumericField { field, value: value.to_string() };

    let (digits, radix) = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(digits) => (digits, 16),
        None => (value, 10),
    };

    if digits.is_empty() {
        return Err(invalid());
    }

    U256::from_str_radix(digits, radix).map_err(|_| invalid())
}

fn parse_gas(field: &'static str, value: &str) -> Result<u128, ValidationError> {
    let quantity = parse_quantity(field, value)?;
    u128::try_from(quantity).map_err(|_| ValidationError::ValueTooWide { field })
}

fn decode_account_call(call_data: &[u8]) -> Result<DecodedCall, ValidationError> {
    if call_data.len() < 4 {
        return Err(ValidationError::InvalidCallData {
            reason: "call data shorter than a function selector".to_string(),
        });
    }

    let call = ISmartAccountCalls::abi_decode(call_data)
        .map_err(|e| ValidationError::InvalidCallData { reason: e.to_string() })?;

    let (targets, first_func): (Vec<EvmAddress>, Option<Bytes>) = match call {
        ISmartAccountCalls::execute(call) => (vec![call.dest.into()], Some(call.func)),
        ISmartAccountCalls::executeBatch(call) => {
            (call.dest.into_iter().map(EvmAddress::from).collect(), call.func.into_iter().next())
        }
    };

    if targets.is_empty() {
        return Err(ValidationError::InvalidCallData {
            reason: "batch call has no destinations".to_string(),
        });
    }

    let inner_selector = match first_func {
        Some(func) if func.len() >= 4 => FixedBytes::<4>::from_slice(&func[..4]),
        _ => FixedBytes::<4>::ZERO,
    };

    Ok(DecodedCall { targets, inner_selector })
}

#[cfg(test)]
pub(crate) mod tests {
    use alloy::{primitives::address, sol_types::SolCall};

    use super::*;
    use crate::user_operation::{contracts::ISmartAccount, pack::unpack_u128_pair};

    pub const TARGET: EvmAddress =
        EvmAddress::new(address!("0x1111111111111111111111111111111111111111"));

    pub fn execute_call_data(dest: EvmAddress, func: &[u8]) -> String {
        let call = ISmartAccount::executeCall {
            dest: dest.into_address(),
            value: U256::ZERO,
            func: Bytes::copy_from_slice(func),
        };
        format!("0x{}", hex::encode(call.abi_encode()))
    }

    pub fn user_operation(call_data: String) -> UserOperation {
        UserOperation {
            sender: "0x742d35Cc6aF6C5C8c3C4B4C8e1A36F1c57F1b8Ff".to_string(),
            nonce: "0x1".to_string(),
            init_code: "0x".to_string(),
            call_data,
            call_gas_limit: "0x30d40".to_string(),
            verification_gas_limit: "100000".to_string(),
            pre_verification_gas: "0xc350".to_string(),
            max_fee_per_gas: "0x3b9aca00".to_string(),
            max_priority_fee_per_gas: "0x3b9aca00".to_string(),
            paymaster_and_data: "0x".to_string(),
            signature: "0xdeadbeef".to_string(),
        }
    }

    fn validator() -> UserOperationValidator {
        UserOperationValidator::new(ValidationConfig::default())
    }

    #[test]
    fn test_formats_well_formed_operation() {
        let op = user_operation(execute_call_data(TARGET, &[0xa9, 0x05, 0x9c, 0xbb, 0x01]));

        let formatted = validator().validate_and_format(&op).unwrap();

        assert_eq!(formatted.target, TARGET);
        assert_eq!(formatted.inner_selector, FixedBytes::<4>::from([0xa9, 0x05, 0x9c, 0xbb]));
        assert_eq!(formatted.declared_total_gas(), GasLimit::new(200_000 + 100_000 + 50_000));
        assert_eq!(unpack_u128_pair(formatted.packed.accountGasLimits), (100_000, 200_000));
        assert_eq!(
            unpack_u128_pair(formatted.packed.gasFees),
            (1_000_000_000, 1_000_000_000)
        );
        assert_eq!(formatted.packed.nonce, U256::from(1));

        // the target survives packing
        let decoded = ISmartAccountCalls::abi_decode(&formatted.packed.callData).unwrap();
        match decoded {
            ISmartAccountCalls::execute(call) => assert_eq!(EvmAddress::from(call.dest), TARGET),
            _ => panic!("expected execute"),
        }
    }

    #[test]
    fn test_missing_field_fails_first() {
        let mut op = user_operation("0xzz".to_string());
        op.signature = String::new();

        let error = validator().validate_and_format(&op).unwrap_err();

        assert_eq!(error, ValidationError::MissingField { field: "signature" });
        assert_eq!(error.kind(), crate::shared::ErrorKind::InvalidParams);
    }

    #[test]
    fn test_rejects_malformed_sender_and_hex() {
        let mut op = user_operation(execute_call_data(TARGET, &[]));
        op.sender = "0x1234".to_string();
        assert!(matches!(
            validator().validate_and_format(&op),
            Err(ValidationError::InvalidSender { .. })
        ));

        let mut op = user_operation(execute_call_data(TARGET, &[]));
        op.paymaster_and_data = "abcd".to_string();
        assert_eq!(
            validator().validate_and_format(&op).unwrap_err(),
            ValidationError::InvalidHexField { field: "paymasterAndData" }
        );
    }

    #[test]
    fn test_rejects_undecodable_call_data() {
        let op = user_operation("0x12345678aabb".to_string());

        assert!(matches!(
            validator().validate_and_format(&op),
            Err(ValidationError::InvalidCallData { .. })
        ));
    }

    #[test]
    fn test_rejects_oversized_call_data() {
        let config = ValidationConfig { max_call_data_size: 16, ..Default::default() };
        let op = user_operation(execute_call_data(TARGET, &[]));

        assert!(matches!(
            UserOperationValidator::new(config).validate_and_format(&op),
            Err(ValidationError::CallDataTooLarge { max: 16, .. })
        ));
    }

    #[test]
    fn test_rejects_banned_target_in_batch() {
        let banned = EvmAddress::new(address!("0x2222222222222222222222222222222222222222"));
        let call = ISmartAccount::executeBatchCall {
            dest: vec![TARGET.into_address(), banned.into_address()],
            value: vec![U256::ZERO, U256::ZERO],
            func: vec![Bytes::new(), Bytes::new()],
        };
        let op = user_operation(format!("0x{}", hex::encode(call.abi_encode())));
        let config =
            ValidationConfig { banned_addresses: HashSet::from([banned]), ..Default::default() };

        let error = UserOperationValidator::new(config).validate_and_format(&op).unwrap_err();

        assert_eq!(error, ValidationError::BannedAddress { address: banned });
        assert_eq!(error.kind().code(), -32301);
    }

    #[test]
    fn test_rejects_empty_batch() {
        let call = ISmartAccount::executeBatchCall { dest: vec![], value: vec![], func: vec![] };
        let op = user_operation(format!("0x{}", hex::encode(call.abi_encode())));

        assert!(matches!(
            validator().validate_and_format(&op),
            Err(ValidationError::InvalidCallData { .. })
        ));
    }

    #[test]
    fn test_verification_gas_bounds() {
        let mut op = user_operation(execute_call_data(TARGET, &[]));
        op.verification_gas_limit = "39999".to_string();
        assert!(matches!(
            validator().validate_and_format(&op),
            Err(ValidationError::VerificationGasOutOfRange { value: 39_999, .. })
        ));

        op.verification_gas_limit = "5000001".to_string();
        let error = validator().validate_and_format(&op).unwrap_err();
        assert_eq!(error.kind(), crate::shared::ErrorKind::InvalidGasParameters);

        op.verification_gas_limit = "40000".to_string();
        assert!(validator().validate_and_format(&op).is_ok());
    }

    #[test]
    fn test_numeric_fields() {
        let mut op = user_operation(execute_call_data(TARGET, &[]));
        op.nonce = "0xnothex".to_string();
        assert_eq!(
            validator().validate_and_format(&op).unwrap_err(),
            ValidationError::InvalidNumericField { field: "nonce", value: "0xnothex".to_string() }
        );

        let mut op = user_operation(execute_call_data(TARGET, &[]));
        op.max_fee_per_gas = format!("0x1{}", "0".repeat(32));
        assert_eq!(
            validator().validate_and_format(&op).unwrap_err(),
            ValidationError::ValueTooWide { field: "maxFeePerGas" }
        );
    }

    #[test]
    fn test_total_gas_and_fee_ordering() {
        let mut op = user_operation(execute_call_data(TARGET, &[]));
        op.call_gas_limit = "9950000".to_string();
        assert!(matches!(
            validator().validate_and_format(&op),
            Err(ValidationError::TotalGasTooHigh { total: 10_100_000, max: 10_000_000 })
        ));

        let mut op = user_operation(execute_call_data(TARGET, &[]));
        op.max_priority_fee_per_gas = "0x3b9aca01".to_string();
        assert!(matches!(
            validator().validate_and_format(&op),
            Err(ValidationError::PriorityFeeAboveMaxFee { .. })
        ));
    }
}
