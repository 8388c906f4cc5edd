mod app_state;
pub use app_state::AppState;
mod background_tasks;
mod environment;
pub use environment::load_env_from_project_path;
pub mod gas;
mod logger;
pub use logger::{mark_shutdown_started, setup_info_logger, setup_logger};
pub mod provider;
pub use provider::{create_retry_client, ChainClient, EvmProvider};
pub mod rpc;
mod shared;
pub use shared::{common_types, serializers, BundlerError, ErrorKind};
mod startup;
pub use startup::{create_router, start, StartError};
pub mod transaction;
pub mod user_operation;
pub mod wallet;
pub mod wallet_pool;
mod yaml;
pub use yaml::{
    parse, read, ApiConfig, BundlerConfig, ReadYamlError, SubmissionSetupConfig,
    ValidationSetupConfig, WalletPoolSetupConfig, CONFIG_FILE_NAME, DEFAULT_ENTRY_POINT,
};

pub use tracing::{error as rbundler_error, info as rbundler_info};
