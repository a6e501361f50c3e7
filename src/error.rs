use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::models::{common::Amount, contract::InactiveReason};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Contract not found: {0}")]
    NotFound(Uuid),

    #[error("Contract {0} already exists")]
    DuplicateId(Uuid),

    #[error("Invalid term: {0} days (expected 30, 60 or 90)")]
    InvalidTerm(i64),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Exposure cap exceeded: outstanding {outstanding} + requested {requested} > cap {cap}")]
    ExposureExceeded {
        outstanding: Amount,
        requested: Amount,
        cap: Amount,
    },

    #[error("Insufficient credits on {contract_id}: requested {requested}, remaining {remaining}")]
    InsufficientCredits {
        contract_id: Uuid,
        requested: i64,
        remaining: i64,
    },

    #[error("Contract {contract_id} is not active: {reason}")]
    ContractNotActive {
        contract_id: Uuid,
        reason: InactiveReason,
    },

    #[error("Price oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("Contract {0} was modified concurrently")]
    ConcurrentModification(Uuid),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl EngineError {
    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::DuplicateId(_) => "DUPLICATE_ID",
            EngineError::InvalidTerm(_) => "INVALID_TERM",
            EngineError::InvalidQuantity(_) => "INVALID_QUANTITY",
            EngineError::ExposureExceeded { .. } => "EXPOSURE_EXCEEDED",
            EngineError::InsufficientCredits { .. } => "INSUFFICIENT_CREDITS",
            EngineError::ContractNotActive {
                reason: InactiveReason::Expired,
                ..
            } => "CONTRACT_EXPIRED",
            EngineError::ContractNotActive {
                reason: InactiveReason::Depleted,
                ..
            } => "CONTRACT_DEPLETED",
            EngineError::OracleUnavailable(_) => "ORACLE_UNAVAILABLE",
            EngineError::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            EngineError::BadRequest(_) => "BAD_REQUEST",
            EngineError::Database(_) => "DATABASE_ERROR",
            EngineError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match self {
            EngineError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal database error occurred".to_string(),
                )
            }
            EngineError::Internal(ref e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            EngineError::OracleUnavailable(ref msg) => {
                tracing::warn!("Price oracle unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Gas price feed temporarily unavailable".to_string(),
                )
            }
            EngineError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            EngineError::InvalidTerm(_)
            | EngineError::InvalidQuantity(_)
            | EngineError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            EngineError::ExposureExceeded { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            EngineError::DuplicateId(_)
            | EngineError::InsufficientCredits { .. }
            | EngineError::ContractNotActive { .. }
            | EngineError::ConcurrentModification(_) => (StatusCode::CONFLICT, self.to_string()),
        };

        let body = json!({
            "success": false,
            "error": {
                "code": code,
                "message": message,
            }
        });

        (status, Json(body)).into_response()
    }
}

// Helper type for results
pub type Result<T> = std::result::Result<T, EngineError>;
