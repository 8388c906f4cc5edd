use std::{sync::Arc, time::Duration};

use alloy::{
    eips::{eip2718::Encodable2718, BlockId, BlockNumberOrTag},
    network::{EthereumWallet, TransactionBuilder},
    primitives::{TxHash, U256},
    providers::{Provider, RootProvider},
    rpc::{client::ClientBuilder, types::TransactionRequest},
    signers::local::PrivateKeySigner,
    transports::{layers::RetryBackoffLayer, RpcError, TransportErrorKind},
};
use async_trait::async_trait;
use rand::{thread_rng, Rng};
use reqwest::Url;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::chain_client::{ChainClient, ChainClientError, ReceiptStatus};
use crate::{
    gas::types::GasLimit,
    rbundler_info,
    shared::common_types::EvmAddress,
    transaction::types::{TransactionHash, TransactionNonce},
};

pub type BundlerProvider = RootProvider;

/// Consecutive receipt lookups allowed to fail before `wait_for_receipt` gives up.
const MAX_RECEIPT_POLL_ERRORS: u32 = 5;

#[derive(Error, Debug)]
pub enum RetryClientError {
    #[error("http provider cant be created for {0}: {1}")]
    HttpProviderCantBeCreated(String, String),
}

pub fn create_retry_client(rpc_url: &str) -> Result<Arc<BundlerProvider>, RetryClientError> {
    let url = Url::parse(rpc_url).map_err(|e| {
        RetryClientError::HttpProviderCantBeCreated(rpc_url.to_string(), e.to_string())
    })?;

    let retry_layer = RetryBackoffLayer::new(10, 500, 660);
    let client = ClientBuilder::default().layer(retry_layer).http(url);

    Ok(Arc::new(RootProvider::new(client)))
}

#[derive(Error, Debug)]
pub enum EvmProviderNewError {
    #[error("no provider urls configured")]
    NoProviderUrls,

    #[error("http provider cant be created for {0}: {1}")]
    HttpProviderCantBeCreated(String, String),

    #[error("configured chain id {configured} does not match node chain id {actual}")]
    ChainIdMismatch { configured: u64, actual: u64 },

    #[error("{0}")]
    ProviderError(RpcError<TransportErrorKind>),
}

fn to_chain_client_error(error: RpcError<TransportErrorKind>) -> ChainClientError {
    ChainClientError::classify(error.to_string())
}

/// alloy backed [`ChainClient`] spreading reads over every configured provider url.
#[derive(Clone)]
pub struct EvmProvider {
    rpc_clients: Vec<Arc<BundlerProvider>>,
    pub chain_id: u64,
    pub provider_urls: Vec<String>,
    receipt_poll_interval: Duration,
}

impl EvmProvider {
    pub async fn new(
        provider_urls: &[String],
        chain_id: Option<u64>,
        receipt_poll_interval: Duration,
    ) -> Result<Self, EvmProviderNewError> {
        if provider_urls.is_empty() {
            return Err(EvmProviderNewError::NoProviderUrls);
        }

        let mut rpc_clients = Vec::with_capacity(provider_urls.len());
        for url in provider_urls {
            rpc_clients.push(create_retry_client(url).map_err(|e| {
                EvmProviderNewError::HttpProviderCantBeCreated(url.clone(), e.to_string())
            })?);
        }

        let actual = rpc_clients[0].get_chain_id().await.map_err(EvmProviderNewError::ProviderError)?;
        if let Some(configured) = chain_id {
            if configured != actual {
                return Err(EvmProviderNewError::ChainIdMismatch { configured, actual });
            }
        }

        rbundler_info!("Connected to chain {} through {} provider(s)", actual, rpc_clients.len());

        Ok(EvmProvider {
            rpc_clients,
            chain_id: actual,
            provider_urls: provider_urls.to_vec(),
            receipt_poll_interval,
        })
    }

    pub fn rpc_client(&self) -> Arc<BundlerProvider> {
        let mut rng = thread_rng();
        let index = rng.gen_range(0..self.rpc_clients.len());
        self.rpc_clients[index].clone()
    }

    async fn pending_nonce(&self, address: &EvmAddress) -> Result<u64, ChainClientError> {
        self.rpc_client()
            .get_transaction_count(address.into_address())
            .block_id(BlockId::Number(BlockNumberOrTag::Pending))
            .await
            .map_err(to_chain_client_error)
    }
}

#[async_trait]
impl ChainClient for EvmProvider {
    async fn get_balance(&self, address: &EvmAddress) -> Result<U256, ChainClientError> {
        self.rpc_client().get_balance(address.into_address()).await.map_err(to_chain_client_error)
    }

    async fn get_transaction_count(
        &self,
        address: &EvmAddress,
    ) -> Result<TransactionNonce, ChainClientError> {
        self.pending_nonce(address).await.map(TransactionNonce::new)
    }

    async fn estimate_gas(&self, request: &TransactionRequest) -> Result<GasLimit, ChainClientError> {
        let result =
            self.rpc_client().estimate_gas(request.clone()).await.map_err(to_chain_client_error)?;

        Ok(GasLimit::from(result))
    }

    async fn send_transaction(
        &self,
        signer: &PrivateKeySigner,
        request: TransactionRequest,
    ) -> Result<TransactionHash, ChainClientError> {
        let from = EvmAddress::new(signer.address());
        let mut request = request.with_from(from.into_address()).with_chain_id(self.chain_id);

        if request.nonce.is_none() {
            let nonce = self.pending_nonce(&from).await?;
            request.set_nonce(nonce);
        }

        let wallet = EthereumWallet::from(signer.clone());
        let envelope = request
            .build(&wallet)
            .await
            .map_err(|e| ChainClientError::TransactionBuilder(e.to_string()))?;

        let pending = self
            .rpc_client()
            .send_raw_transaction(&envelope.encoded_2718())
            .await
            .map_err(to_chain_client_error)?;

        Ok(TransactionHash::from(*pending.tx_hash()))
    }

    async fn wait_for_receipt(
        &self,
        hash: &TransactionHash,
    ) -> Result<ReceiptStatus, ChainClientError> {
        let mut consecutive_errors = 0;

        loop {
            match self.rpc_client().get_transaction_receipt(TxHash::from(*hash)).await {
                Ok(Some(receipt)) => {
                    return Ok(if receipt.status() {
                        ReceiptStatus::Success
                    } else {
                        ReceiptStatus::Reverted
                    });
                }
                Ok(None) => {
                    consecutive_errors = 0;
                    debug!("Receipt for {} not available yet", hash);
                }
                Err(e) => {
                    consecutive_errors += 1;
                    warn!(
                        "Receipt lookup for {} failed ({}/{}): {}",
                        hash, consecutive_errors, MAX_RECEIPT_POLL_ERRORS, e
                    );
                    if consecutive_errors >= MAX_RECEIPT_POLL_ERRORS {
                        return Err(to_chain_client_error(e));
                    }
                }
            }

            sleep(self.receipt_poll_interval).await;
        }
    }
}
