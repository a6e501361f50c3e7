// Route modules
pub mod contracts;
pub mod portfolio;

use crate::{app_state::AppState, middleware::logging_middleware};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_v1_routes())
        // Dashboard front end is served from a different origin
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API v1 routes
fn api_v1_routes() -> Router<AppState> {
    let contract_routes = Router::new()
        .route("/contracts", post(contracts::issue_contract))
        .route("/contracts/{id}", get(contracts::get_contract))
        .route("/contracts/{id}/redemptions", get(contracts::list_redemptions))
        .route("/contracts/{id}/redeem", post(contracts::redeem));

    let portfolio_routes = Router::new()
        .route("/owners/{owner}/contracts", get(portfolio::list_owner_contracts))
        .route("/owners/{owner}/portfolio", get(portfolio::get_portfolio))
        .route("/market", get(portfolio::get_market));

    Router::new()
        .merge(contract_routes)
        .merge(portfolio_routes)
        .layer(middleware::from_fn(logging_middleware))
}
