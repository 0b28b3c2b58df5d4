use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use prdrop_sdk::ClaimRequest;

use crate::error::{AppError, ClaimResponse};
use crate::state::AppState;

/// `POST /claim-airdrop`.
pub(crate) async fn claim_airdrop(
    State(state): State<AppState>,
    body: Result<Json<ClaimRequest>, JsonRejection>,
) -> Result<Json<ClaimResponse>, AppError> {
    let Json(request) = body?;
    state.protocol().process(request).await?;
    Ok(Json(ClaimResponse::claimed()))
}

/// Any other method on the claim route.
pub(crate) async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// `GET /health/liveness`.
pub(crate) async fn liveness() -> &'static str {
    "ok"
}
