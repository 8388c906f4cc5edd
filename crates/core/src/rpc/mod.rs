mod handlers;
pub use handlers::{dispatch, handle_rpc};

mod types;
pub use types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};

use std::sync::Arc;

use axum::{routing::post, Router};

use crate::app_state::AppState;

pub fn create_rpc_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", post(handle_rpc))
}
