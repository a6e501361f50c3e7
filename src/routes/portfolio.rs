use axum::{
    extract::{Path, State},
    Json,
};
use time::OffsetDateTime;
use tracing::instrument;

use crate::{
    app_state::AppState,
    error::Result,
    models::{
        common::SuccessResponse,
        contract::{ContractListResponse, ContractView},
        portfolio::{MarketResponse, PortfolioResponse},
    },
};

/// GET /api/v1/owners/{owner}/contracts
#[instrument(skip(state))]
pub async fn list_owner_contracts(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<Json<ContractListResponse>> {
    let contracts = state
        .ledger
        .list_by_owner(&owner)
        .iter()
        .map(ContractView::from)
        .collect();

    Ok(Json(SuccessResponse::new(contracts)))
}

/// GET /api/v1/owners/{owner}/portfolio
#[instrument(skip(state))]
pub async fn get_portfolio(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<Json<PortfolioResponse>> {
    let summary = state
        .portfolio_service
        .summary(&owner, OffsetDateTime::now_utc())?;

    Ok(Json(SuccessResponse::new(summary)))
}

/// GET /api/v1/market
#[instrument(skip(state))]
pub async fn get_market(State(state): State<AppState>) -> Result<Json<MarketResponse>> {
    let snapshot = state
        .portfolio_service
        .market_snapshot(OffsetDateTime::now_utc())
        .await?;

    Ok(Json(SuccessResponse::new(snapshot)))
}
