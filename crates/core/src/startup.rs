use std::{net::SocketAddr, path::Path, sync::Arc, time::Instant};

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware,
    middleware::Next,
    response::Response,
    routing::get,
    Json, Router,
};
use thiserror::Error;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info};

use crate::{
    app_state::AppState,
    background_tasks::run_background_tasks,
    environment::load_env_from_project_path,
    gas::GasEstimator,
    logger::mark_shutdown_started,
    provider::{ChainClient, EvmProvider, EvmProviderNewError},
    read,
    rpc::create_rpc_routes,
    setup_info_logger, setup_logger,
    transaction::{SubmissionOrchestrator, TransactionTracker},
    user_operation::UserOperationValidator,
    wallet::{signers_from_keys, WalletError},
    wallet_pool::{WalletPool, WalletPoolLoadError},
    yaml::{ApiConfig, ReadYamlError, CONFIG_FILE_NAME},
};

#[derive(Error, Debug)]
pub enum StartApiError {
    #[error("Failed to start the API: {0}")]
    ApiStartupError(#[from] std::io::Error),
}

async fn health_check() -> Json<String> {
    Json("healthy".to_string())
}

async fn activity_logger(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    let duration = start.elapsed();
    if status.is_client_error() || status.is_server_error() {
        error!("{} {} responded with {} after {:?}", method, uri, status, duration);
    } else {
        info!("{} {} responded with {} after {:?}", method, uri, status, duration);
    }

    response
}

fn cors_layer(api_config: &ApiConfig) -> CorsLayer {
    let allow_origin = match &api_config.allowed_origins {
        Some(origins) if !origins.is_empty() => AllowOrigin::list(
            origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok())
                .collect::<Vec<HeaderValue>>(),
        ),
        _ => AllowOrigin::any(),
    };

    CorsLayer::new().allow_origin(allow_origin).allow_methods(Any).allow_headers(Any)
}

pub fn create_router(app_state: Arc<AppState>, api_config: &ApiConfig) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(create_rpc_routes())
        .layer(middleware::from_fn(activity_logger))
        .layer(cors_layer(api_config))
        .with_state(app_state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }

    mark_shutdown_started();
    info!("Shutdown signal received, stopping rbundler");
}

async fn start_api(api_config: ApiConfig, app_state: Arc<AppState>) -> Result<(), StartApiError> {
    let app = create_router(app_state, &api_config)
        .into_make_service_with_connect_info::<SocketAddr>();

    let address = format!("{}:{}", api_config.host, api_config.port);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("rbundler is up on http://{}", address);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    Ok(())
}

#[derive(Error, Debug)]
pub enum StartError {
    #[error("Failed to find {0} in the project directory")]
    NoYamlFileFound(String),

    #[error("{0}")]
    ReadYamlError(#[from] ReadYamlError),

    #[error("Failed to connect to the chain: {0}")]
    ProviderError(#[from] EvmProviderNewError),

    #[error("{0}")]
    WalletError(#[from] WalletError),

    #[error("Failed to load relay wallets: {0}")]
    WalletPoolLoadError(#[from] WalletPoolLoadError),

    #[error("Failed to start the API: {0}")]
    ApiStartupError(#[from] StartApiError),
}

pub async fn start(project_path: &Path) -> Result<(), StartError> {
    let env_file = load_env_from_project_path(project_path);

    let yaml_path = project_path.join(CONFIG_FILE_NAME);
    if !yaml_path.exists() {
        setup_info_logger();
        error!("Could not find {} in {}", CONFIG_FILE_NAME, project_path.display());
        return Err(StartError::NoYamlFileFound(CONFIG_FILE_NAME.to_string()));
    }

    let config = read(&yaml_path, false).inspect_err(|_| setup_info_logger())?;
    setup_logger(config.log_level()?);

    info!("Starting up rbundler {}", config.name);
    if let Some(env_file) = env_file {
        info!("Loaded environment from {}", env_file.display());
    }

    let provider = EvmProvider::new(
        &config.provider_urls,
        config.chain_id,
        config.submission.receipt_poll_interval(),
    )
    .await?;
    let chain_id = provider.chain_id;
    let chain_client: Arc<dyn ChainClient> = Arc::new(provider);

    let signers = signers_from_keys(&config.signing_keys)?;
    let pool = Arc::new(
        WalletPool::load(signers, config.wallet_pool.to_pool_config(), chain_client.clone())
            .await?,
    );
    info!("Wallet pool ready with {} relay wallet(s)", pool.wallet_snapshots().await.len());

    let orchestrator = SubmissionOrchestrator::new(
        pool.clone(),
        UserOperationValidator::new(config.validation.to_validation_config()),
        GasEstimator::new(
            chain_client.clone(),
            config.entry_point,
            config.submission.gas_margin_percent,
        ),
        TransactionTracker::new(
            pool.clone(),
            chain_client.clone(),
            config.submission.confirmation_timeout(),
        ),
        chain_client,
        config.submission.to_submission_config(config.entry_point),
    );

    run_background_tasks(pool, config.submission.record_retention()).await;

    let app_state = Arc::new(AppState { orchestrator: Arc::new(orchestrator), chain_id });

    start_api(config.api.clone(), app_state).await?;

    Ok(())
}
