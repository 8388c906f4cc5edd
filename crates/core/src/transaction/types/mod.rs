mod transaction_hash;
pub use transaction_hash::TransactionHash;

mod transaction_nonce;
pub use transaction_nonce::TransactionNonce;

mod transaction_status;
pub use transaction_status::TransactionStatus;
