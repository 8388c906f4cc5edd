mod chain_client;
pub use chain_client::{ChainClient, ChainClientError, ReceiptStatus};

mod evm_provider;
pub use evm_provider::{
    create_retry_client, BundlerProvider, EvmProvider, EvmProviderNewError, RetryClientError,
};

#[cfg(test)]
pub(crate) mod mock_chain_client;
