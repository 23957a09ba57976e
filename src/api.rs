// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP routes over [`LedgerGateway`].
//!
//! Successful responses are the JSON the ledger returned (or a small
//! envelope around it). Failures are `{"error": "<message>"}` with a status
//! derived from the [`GatewayError`] variant.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::errors::{CacheError, GatewayError, LedgerError, ResolveError};
use crate::gateway::{
    CallRequest, LedgerGateway, MintRequest, TransferRequest, ViewNftRequest, ViewRequest,
};

/// Header telling clients whether `/view` was served from cache.
pub const CACHE_STATUS_HEADER: &str = "x-cache-status";

type ApiResult<T> = Result<T, GatewayError>;

impl GatewayError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Resolve(ResolveError::MissingSigner | ResolveError::MalformedKey { .. }) => {
                StatusCode::BAD_REQUEST
            }
            Self::Resolve(ResolveError::UnknownAccount { .. }) => StatusCode::NOT_FOUND,
            Self::Resolve(ResolveError::Store(_)) | Self::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::InvalidAccountId(_)
            | Self::InvalidKey(_)
            | Self::InvalidRequest { .. }
            | Self::NftContractNotConfigured => StatusCode::BAD_REQUEST,
            Self::TokenNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Cache(CacheError::FetchTimeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            Self::Cache(CacheError::Upstream(e)) => ledger_status(e),
            Self::Ledger(e) => ledger_status(e),
            Self::TransactionFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Cache(CacheError::FetchAborted) | Self::MasterAccountNotConfigured => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

fn ledger_status(error: &LedgerError) -> StatusCode {
    match error {
        LedgerError::Encode { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Unwraps a JSON body, turning extractor rejections into `400 {"error": ..}`.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| GatewayError::InvalidRequest {
            reason: rejection.body_text(),
        })
}

async fn welcome(State(gateway): State<Arc<LedgerGateway>>) -> Json<Value> {
    Json(json!({ "text": gateway.welcome() }))
}

async fn view(
    State(gateway): State<Arc<LedgerGateway>>,
    payload: Result<Json<ViewRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let request = body(payload)?;
    let cached = gateway
        .view(&request.contract, &request.method, &request.params)
        .await?;

    Ok((
        [(CACHE_STATUS_HEADER, cached.status.as_header_value())],
        Json(cached.value),
    )
        .into_response())
}

async fn call(
    State(gateway): State<Arc<LedgerGateway>>,
    payload: Result<Json<CallRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let outcome = gateway.call(body(payload)?).await?;
    Ok(Json(outcome).into_response())
}

async fn view_nft_by_path(
    State(gateway): State<Arc<LedgerGateway>>,
    Path(token_id): Path<String>,
) -> ApiResult<Response> {
    let cached = gateway.view_nft(&token_id, None).await?;
    Ok((
        [(CACHE_STATUS_HEADER, cached.status.as_header_value())],
        Json(cached.value),
    )
        .into_response())
}

async fn view_nft(
    State(gateway): State<Arc<LedgerGateway>>,
    payload: Result<Json<ViewNftRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let request = body(payload)?;
    let cached = gateway
        .view_nft(&request.token_id, request.contract.as_ref())
        .await?;
    Ok((
        [(CACHE_STATUS_HEADER, cached.status.as_header_value())],
        Json(cached.value),
    )
        .into_response())
}

async fn mint_nft(
    State(gateway): State<Arc<LedgerGateway>>,
    payload: Result<Json<MintRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let minted = gateway.mint_nft(body(payload)?).await?;
    Ok(Json(minted).into_response())
}

async fn transfer_nft(
    State(gateway): State<Arc<LedgerGateway>>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let token = gateway.transfer_nft(body(payload)?).await?;
    Ok(Json(token).into_response())
}

#[derive(Debug, Deserialize)]
struct CreateUserRequest {
    name: String,
}

async fn create_user(
    State(gateway): State<Arc<LedgerGateway>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let request = body(payload)?;
    let created = gateway.create_user(&request.name).await?;
    Ok(Json(created).into_response())
}

#[derive(Debug, Deserialize)]
struct SeedPhraseRequest {
    seed_phrase: String,
}

async fn parse_seed_phrase(
    State(gateway): State<Arc<LedgerGateway>>,
    payload: Result<Json<SeedPhraseRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let request = body(payload)?;
    let keys = gateway.parse_seed_phrase(&request.seed_phrase)?;
    Ok(Json(keys).into_response())
}

async fn cache_stats(State(gateway): State<Arc<LedgerGateway>>) -> Json<Value> {
    let stats = gateway.cache_stats().await;
    Json(json!({
        "stats": stats,
        "hit_rate": stats.hit_rate(),
    }))
}

/// Builds the router.
pub fn router(gateway: Arc<LedgerGateway>) -> Router {
    Router::new()
        .route("/", get(welcome))
        .route("/view", post(view))
        .route("/call", post(call))
        .route("/view_nft/:token_id", get(view_nft_by_path))
        .route("/view_nft", post(view_nft))
        .route("/mint_nft", post(mint_nft))
        .route("/transfer_nft", post(transfer_nft))
        .route("/create_user", post(create_user))
        .route("/parse_seed_phrase", post(parse_seed_phrase))
        .route("/cache_stats", get(cache_stats))
        .with_state(gateway)
}

/// Serves the API until ctrl-c.
pub async fn serve_api(listener: TcpListener, gateway: Arc<LedgerGateway>) -> anyhow::Result<()> {
    let app = router(gateway);
    let addr = listener.local_addr()?;

    info!(address = %addr, "Starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for ctrl-c, serving until killed");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
