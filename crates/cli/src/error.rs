use thiserror::Error;

use crate::commands::error::{InitError, ProjectStartupError, WalletsError};

/// Top-level CLI error that composes all module-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Initialization error: {0}")]
    Init(#[from] InitError),

    #[error("Project startup error: {0}")]
    ProjectStartup(#[from] ProjectStartupError),

    #[error("Wallets error: {0}")]
    Wallets(#[from] WalletsError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<String> for CliError {
    fn from(err: String) -> Self {
        CliError::Internal(err)
    }
}
