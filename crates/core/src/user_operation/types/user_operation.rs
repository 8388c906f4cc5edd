use serde::{Deserialize, Serialize};

use crate::shared::serializers::deserialize_quantity;

/// UserOperation as received over JSON-RPC, every field still in its wire (string) form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    #[serde(default)]
    pub sender: String,
    #[serde(default, deserialize_with = "deserialize_quantity")]
    pub nonce: String,
    #[serde(default)]
    pub init_code: String,
    #[serde(default)]
    pub call_data: String,
    #[serde(default, deserialize_with = "deserialize_quantity")]
    pub call_gas_limit: String,
    #[serde(default, deserialize_with = "deserialize_quantity")]
    pub verification_gas_limit: String,
    #[serde(default, deserialize_with = "deserialize_quantity")]
    pub pre_verification_gas: String,
    #[serde(default, deserialize_with = "deserialize_quantity")]
    pub max_fee_per_gas: String,
    #[serde(default, deserialize_with = "deserialize_quantity")]
    pub max_priority_fee_per_gas: String,
    #[serde(default)]
    pub paymaster_and_data: String,
    #[serde(default)]
    pub signature: String,
}

impl UserOperation {
    /// Field name / value pairs in validation order.
    pub fn required_fields(&self) -> [(&'static str, &str); 11] {
        [
            ("sender", &self.sender),
            ("nonce", &self.nonce),
            ("initCode", &self.init_code),
            ("callData", &self.call_data),
            ("callGasLimit", &self.call_gas_limit),
            ("verificationGasLimit", &self.verification_gas_limit),
            ("preVerificationGas", &self.pre_verification_gas),
            ("maxFeePerGas", &self.max_fee_per_gas),
            ("maxPriorityFeePerGas", &self.max_priority_fee_per_gas),
            ("paymasterAndData", &self.paymaster_and_data),
            ("signature", &self.signature),
        ]
    }
}
