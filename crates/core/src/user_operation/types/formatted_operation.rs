use alloy::primitives::{Bytes, FixedBytes};
use alloy::sol_types::SolCall;

use crate::{
    gas::types::GasLimit,
    shared::common_types::EvmAddress,
    user_operation::contracts::{IEntryPoint, PackedUserOperation},
};

/// A validated UserOperation in EntryPoint v0.7 wire shape, plus the values derived while
/// validating it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedOperation {
    pub packed: PackedUserOperation,
    /// First destination decoded from the account call.
    pub target: EvmAddress,
    pub call_gas_limit: GasLimit,
    pub verification_gas_limit: GasLimit,
    pub pre_verification_gas: GasLimit,
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
    /// Selector of the account call (`execute` / `executeBatch`).
    pub account_selector: FixedBytes<4>,
    /// Selector of the call the account forwards to `target`, zero when it carries no data.
    pub inner_selector: FixedBytes<4>,
}

impl FormattedOperation {
    pub fn declared_total_gas(&self) -> GasLimit {
        self.call_gas_limit + self.verification_gas_limit + self.pre_verification_gas
    }

    /// `handleOps([op], beneficiary)` calldata.
    pub fn handle_ops_call_data(&self, beneficiary: &EvmAddress) -> Bytes {
        IEntryPoint::handleOpsCall {
            ops: vec![self.packed.clone()],
            beneficiary: beneficiary.into_address(),
        }
        .abi_encode()
        .into()
    }
}
