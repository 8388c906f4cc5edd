use serde_json::{json, Value};
use thiserror::Error;

use crate::shared::{common_types::EvmAddress, ErrorKind};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required UserOperation field: {field}")]
    MissingField { field: &'static str },

    #[error("Invalid sender address format: {value}")]
    InvalidSender { value: String },

    #[error("Field {field} must be in hex format")]
    InvalidHexField { field: &'static str },

    #[error("Calldata size {size} exceeds maximum allowed ({max} bytes)")]
    CallDataTooLarge { size: usize, max: usize },

    #[error("Invalid callData: {reason}")]
    InvalidCallData { reason: String },

    #[error("Banned address: {address}")]
    BannedAddress { address: EvmAddress },

    #[error("Verification gas limit {value} outside allowed range [{min}, {max}]")]
    VerificationGasOutOfRange { value: u128, min: u128, max: u128 },

    #[error("Invalid numeric value in UserOperation field {field}: {value}")]
    InvalidNumericField { field: &'static str, value: String },

    #[error("Field {field} does not fit in 128 bits")]
    ValueTooWide { field: &'static str },

    #[error("Total gas {total} exceeds maximum allowed ({max})")]
    TotalGasTooHigh { total: u128, max: u128 },

    #[error("maxPriorityFeePerGas {priority_fee} exceeds maxFeePerGas {max_fee}")]
    PriorityFeeAboveMaxFee { priority_fee: u128, max_fee: u128 },

    #[error("Unsupported entry point: {entry_point}")]
    UnsupportedEntryPoint { entry_point: String },
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::BannedAddress { .. } => ErrorKind::BannedAddress,
            ValidationError::VerificationGasOutOfRange { .. }
            | ValidationError::ValueTooWide { .. }
            | ValidationError::TotalGasTooHigh { .. }
            | ValidationError::PriorityFeeAboveMaxFee { .. } => ErrorKind::InvalidGasParameters,
            _ => ErrorKind::InvalidParams,
        }
    }

    pub fn data(&self) -> Value {
        match self {
            ValidationError::MissingField { field }
            | ValidationError::InvalidHexField { field }
            | ValidationError::ValueTooWide { field } => json!({ "field": field }),
            ValidationError::InvalidSender { value } => json!({ "field": "sender", "value": value }),
            ValidationError::CallDataTooLarge { size, max } => {
                json!({ "size": size, "maxSize": max })
            }
            ValidationError::InvalidCallData { reason } => json!({ "reason": reason }),
            ValidationError::BannedAddress { address } => json!({ "address": address }),
            ValidationError::VerificationGasOutOfRange { value, min, max } => json!({
                "verificationGasLimit": value.to_string(),
                "min": min.to_string(),
                "max": max.to_string(),
            }),
            ValidationError::InvalidNumericField { field, value } => {
                json!({ "field": field, "value": value })
            }
            ValidationError::TotalGasTooHigh { total, max } => json!({
                "totalGas": total.to_string(),
                "max": max.to_string(),
            }),
            ValidationError::PriorityFeeAboveMaxFee { priority_fee, max_fee } => json!({
                "maxPriorityFeePerGas": priority_fee.to_string(),
                "maxFeePerGas": max_fee.to_string(),
            }),
            ValidationError::UnsupportedEntryPoint { entry_point } => {
                json!({ "entryPoint": entry_point })
            }
        }
    }
}
