use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::types::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
};
use crate::{
    app_state::AppState,
    shared::{common_types::EvmAddress, BundlerError},
    user_operation::{types::UserOperation, ValidationError},
};

/// `POST /`
pub async fn handle_rpc(State(state): State<Arc<AppState>>, body: String) -> Json<JsonRpcResponse> {
    let request: JsonRpcRequest = match serde_json::from_str::<Value>(&body) {
        Ok(value) => {
            let id = value.get("id").cloned().unwrap_or(Value::Null);
            match serde_json::from_value(value) {
                Ok(request) => request,
                Err(e) => {
                    return Json(JsonRpcResponse::error(
                        id,
                        JsonRpcError::new(INVALID_REQUEST, format!("Invalid request: {}", e)),
                    ))
                }
            }
        }
        Err(e) => {
            return Json(JsonRpcResponse::error(
                Value::Null,
                JsonRpcError::new(PARSE_ERROR, format!("Parse error: {}", e)),
            ))
        }
    };

    Json(dispatch(&state, request).await)
}

pub async fn dispatch(state: &AppState, request: JsonRpcRequest) -> JsonRpcResponse {
    let id = request.id.clone();

    if request.jsonrpc != "2.0" {
        return JsonRpcResponse::error(
            id,
            JsonRpcError::new(INVALID_REQUEST, "Invalid request: jsonrpc must be \"2.0\""),
        );
    }

    let result = match request.method.as_str() {
        "eth_sendUserOperation" => send_user_operation(state, &request).await,
        "eth_supportedEntryPoints" => Ok(json!([state.orchestrator.entry_point()])),
        "eth_chainId" => Ok(json!(format!("0x{:x}", state.chain_id))),
        method => Err(JsonRpcError::new(METHOD_NOT_FOUND, format!("Method not found: {}", method))),
    };

    match result {
        Ok(result) => JsonRpcResponse::result(id, result),
        Err(error) => JsonRpcResponse::error(id, error),
    }
}

async fn send_user_operation(
    state: &AppState,
    request: &JsonRpcRequest,
) -> Result<Value, JsonRpcError> {
    let operation: UserOperation = serde_json::from_value(request.param(0).clone())
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid UserOperation: {}", e)))?;

    let entry_point = request
        .param(1)
        .as_str()
        .ok_or_else(|| JsonRpcError::invalid_params("Missing entry point parameter"))?;

    let supported = state.orchestrator.entry_point();
    if entry_point.parse::<EvmAddress>().ok().as_ref() != Some(supported) {
        let error = BundlerError::from(ValidationError::UnsupportedEntryPoint {
            entry_point: entry_point.to_string(),
        });
        return Err(JsonRpcError::from(&error));
    }

    // a dropped request must not cut a broadcast short
    let orchestrator = state.orchestrator.clone();
    let submitted = operation.clone();
    let sent = tokio::spawn(async move { orchestrator.send_operation(&submitted).await })
        .await
        .unwrap_or_else(|e| Err(BundlerError::Internal(format!("submission task failed: {}", e))));

    match sent {
        Ok(hash) => {
            info!("eth_sendUserOperation from {} broadcast as {}", operation.sender, hash);
            Ok(json!(hash))
        }
        Err(error) => {
            warn!("eth_sendUserOperation from {} failed: {}", operation.sender, error);
            Err(JsonRpcError::from(&error))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use alloy::signers::local::PrivateKeySigner;

    use super::*;
    use crate::{
        gas::GasEstimator,
        provider::mock_chain_client::MockChainClient,
        transaction::{
            types::TransactionNonce, SubmissionConfig, SubmissionOrchestrator, TransactionTracker,
        },
        user_operation::{
            fixtures::{execute_call_data, user_operation, TARGET},
            UserOperationValidator, ValidationConfig,
        },
        wallet_pool::{RelayWallet, WalletPool, WalletPoolConfig},
        yaml::DEFAULT_ENTRY_POINT,
    };

    fn state() -> (AppState, Arc<MockChainClient>) {
        let client = Arc::new(MockChainClient::new());
        let pool = Arc::new(WalletPool::new(
            vec![RelayWallet::new(PrivateKeySigner::random(), TransactionNonce::new(0))],
            WalletPoolConfig::default(),
            client.clone(),
        ));
        let orchestrator = SubmissionOrchestrator::new(
            pool.clone(),
            UserOperationValidator::new(ValidationConfig::default()),
            GasEstimator::new(client.clone(), DEFAULT_ENTRY_POINT, 10),
            TransactionTracker::new(pool, client.clone(), Duration::from_secs(300)),
            client.clone(),
            SubmissionConfig::new(DEFAULT_ENTRY_POINT),
        );

        (AppState { orchestrator: Arc::new(orchestrator), chain_id: 31337 }, client)
    }

    fn request(method: &str, params: Value) -> JsonRpcRequest {
        serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_send_user_operation_returns_hash() {
        let (state, client) = state();
        let operation = serde_json::to_value(user_operation(execute_call_data(TARGET, &[]))).unwrap();

        let response = dispatch(
            &state,
            request("eth_sendUserOperation", json!([operation, DEFAULT_ENTRY_POINT.hex()])),
        )
        .await;

        assert!(response.error.is_none(), "{:?}", response.error);
        let hash = client.broadcasts()[0].hash;
        assert_eq!(response.result, Some(json!(hash)));
        assert_eq!(response.id, json!(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_request_still_completes_broadcast() {
        let (state, client) = state();
        let operation = serde_json::to_value(user_operation(execute_call_data(TARGET, &[]))).unwrap();

        let dropped = tokio::time::timeout(
            Duration::ZERO,
            dispatch(
                &state,
                request("eth_sendUserOperation", json!([operation, DEFAULT_ENTRY_POINT.hex()])),
            ),
        )
        .await;
        assert!(dropped.is_err());

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(client.broadcasts().len(), 1);
        let pool = state.orchestrator.pool();
        let hash = client.broadcasts()[0].hash;
        assert!(pool.transaction(&client.broadcasts()[0].from, &hash).await.is_some());
    }

    #[tokio::test]
    async fn test_rejects_unsupported_entry_point() {
        let (state, client) = state();
        let operation = serde_json::to_value(user_operation(execute_call_data(TARGET, &[]))).unwrap();

        let response = dispatch(
            &state,
            request(
                "eth_sendUserOperation",
                json!([operation, "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789"]),
            ),
        )
        .await;

        let error = response.error.unwrap();
        assert_eq!(error.code, -32602);
        assert_eq!(error.data.unwrap()["kind"], "InvalidParams");
        assert!(client.broadcasts().is_empty());
    }

    #[tokio::test]
    async fn test_validation_errors_carry_kind_and_context() {
        let (state, _) = state();
        let mut operation = user_operation(execute_call_data(TARGET, &[]));
        operation.verification_gas_limit = "0x1".to_string();

        let response = dispatch(
            &state,
            request(
                "eth_sendUserOperation",
                json!([serde_json::to_value(operation).unwrap(), DEFAULT_ENTRY_POINT.hex()]),
            ),
        )
        .await;

        let error = response.error.unwrap();
        assert_eq!(error.code, -32205);
        let data = error.data.unwrap();
        assert_eq!(data["kind"], "InvalidGasParameters");
        assert_eq!(data["verificationGasLimit"], "1");
    }

    #[tokio::test]
    async fn test_malformed_user_operation_is_invalid_params() {
        let (state, _) = state();

        let response = dispatch(
            &state,
            request("eth_sendUserOperation", json!(["not an object", DEFAULT_ENTRY_POINT.hex()])),
        )
        .await;

        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn test_metadata_methods() {
        let (state, _) = state();

        let chain_id = dispatch(&state, request("eth_chainId", json!([]))).await;
        assert_eq!(chain_id.result, Some(json!("0x7a69")));

        let entry_points = dispatch(&state, request("eth_supportedEntryPoints", json!([]))).await;
        assert_eq!(entry_points.result, Some(json!([DEFAULT_ENTRY_POINT])));
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let (state, _) = state();

        let unknown = dispatch(&state, request("eth_estimateUserOperationGas", json!([]))).await;
        assert_eq!(unknown.error.unwrap().code, -32601);

        let mut wrong_version = request("eth_chainId", json!([]));
        wrong_version.jsonrpc = "1.0".to_string();
        assert_eq!(dispatch(&state, wrong_version).await.error.unwrap().code, -32600);
    }

    #[tokio::test]
    async fn test_unparseable_body() {
        let (state, _) = state();

        let Json(response) = handle_rpc(State(Arc::new(state)), "{not json".to_string()).await;

        assert_eq!(response.error.unwrap().code, -32700);
    }
}
