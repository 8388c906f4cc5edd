pub mod common_types;

mod errors;
pub use errors::{BundlerError, ErrorKind};

pub mod serializers;
