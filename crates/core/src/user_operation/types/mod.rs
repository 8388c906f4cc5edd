mod formatted_operation;
pub use formatted_operation::FormattedOperation;

mod user_operation;
pub use user_operation::UserOperation;
