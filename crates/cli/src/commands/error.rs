use rbundler_core::{provider::EvmProviderNewError, ReadYamlError};
use thiserror::Error;

/// Errors that can occur while locating and reading the project config
#[derive(Error, Debug)]
pub enum ProjectLocationError {
    #[error("No rbundler project found in {0}, run `rbundler init` first")]
    NotInitialized(String),

    #[error("Failed to read config: {0}")]
    ProjectConfig(#[from] ReadYamlError),
}

/// Errors that can occur during project initialization
#[derive(Error, Debug)]
pub enum InitError {
    #[error("Project directory {0} already exists")]
    AlreadyExists(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Terminal interaction failed: {0}")]
    Terminal(#[from] dialoguer::Error),
}

/// Errors that can occur during project startup operations
#[derive(Error, Debug)]
pub enum ProjectStartupError {
    #[error("{0}")]
    ProjectLocation(#[from] ProjectLocationError),

    #[error("Core startup error: {0}")]
    CoreStartup(#[from] rbundler_core::StartError),
}

/// Errors that can occur while inspecting the relay wallets
#[derive(Error, Debug)]
pub enum WalletsError {
    #[error("{0}")]
    ProjectLocation(#[from] ProjectLocationError),

    #[error("Provider error: {0}")]
    Provider(#[from] EvmProviderNewError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] rbundler_core::wallet::WalletError),

    #[error("Failed to query chain: {0}")]
    QueryFailed(#[from] rbundler_core::provider::ChainClientError),
}
