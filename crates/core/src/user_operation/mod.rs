pub mod contracts;

mod pack;
pub use pack::{pack_u128_pair, unpack_u128_pair};

pub mod types;

mod validation_error;
pub use validation_error::ValidationError;

mod validator;
pub use validator::{UserOperationValidator, ValidationConfig};

#[cfg(test)]
pub(crate) use validator::tests as fixtures;
