use axum::{
    extract::{Path, State},
    Json,
};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app_state::AppState,
    error::{EngineError, Result},
    models::{
        common::{GasPriceKind, SuccessResponse},
        contract::{ContractResponse, ContractView, IssueContractRequest},
        redemption::{RedeemRequest, RedemptionHistoryResponse, RedemptionResponse},
    },
};

/// POST /api/v1/contracts
#[instrument(skip(state, request))]
pub async fn issue_contract(
    State(state): State<AppState>,
    Json(request): Json<IssueContractRequest>,
) -> Result<Json<ContractResponse>> {
    request
        .validate()
        .map_err(|e| EngineError::BadRequest(format!("Validation error: {}", e)))?;

    let contract = state
        .issuer
        .issue_at(
            &request.owner,
            request.term_days,
            request.total_credits,
            request.price_kind.unwrap_or(GasPriceKind::Reference),
            OffsetDateTime::now_utc(),
        )
        .await?;

    Ok(Json(SuccessResponse::new(ContractView::from(contract))))
}

/// GET /api/v1/contracts/{id}
#[instrument(skip(state))]
pub async fn get_contract(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ContractResponse>> {
    let contract = state.ledger.get(id)?;
    Ok(Json(SuccessResponse::new(ContractView::from(contract))))
}

/// GET /api/v1/contracts/{id}/redemptions
#[instrument(skip(state))]
pub async fn list_redemptions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RedemptionHistoryResponse>> {
    let records = state.ledger.redemptions(id)?;
    Ok(Json(SuccessResponse::new(records)))
}

/// POST /api/v1/contracts/{id}/redeem
#[instrument(skip(state, request))]
pub async fn redeem(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RedeemRequest>,
) -> Result<Json<RedemptionResponse>> {
    let outcome = state
        .redemption_processor
        .redeem(id, request.requested_credits, OffsetDateTime::now_utc())
        .await?;

    Ok(Json(SuccessResponse::new(outcome)))
}
