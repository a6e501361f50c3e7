use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::common::{Amount, ContractStatus, Price, SuccessResponse};
use super::contract::{Contract, ContractId};

/// One settled redemption against a contract. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionRecord {
    pub id: Uuid,
    pub contract_id: ContractId,
    pub owner: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub credits_consumed: i64,
    pub market_price_at_time: Price,
    pub locked_price_at_time: Price,
    pub savings: Amount,
}

impl RedemptionRecord {
    /// Record for consuming `credits` of `contract` while the market sits at
    /// `market_price`. `None` only if the savings overflow.
    pub fn new(
        contract: &Contract,
        credits: i64,
        market_price: Price,
        timestamp: OffsetDateTime,
    ) -> Option<Self> {
        let savings = Amount::savings(credits, market_price, contract.locked_price)?;
        Some(Self {
            id: Uuid::new_v4(),
            contract_id: contract.id,
            owner: contract.owner.clone(),
            timestamp,
            credits_consumed: credits,
            market_price_at_time: market_price,
            locked_price_at_time: contract.locked_price,
            savings,
        })
    }
}

/// What a single `redeem` call settled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionOutcome {
    pub contract_id: ContractId,
    pub record_id: Uuid,
    pub credits_consumed: i64,
    /// Requested credits the contract could not cover; charged at market
    /// price by the caller
    pub uncovered_credits: i64,
    pub remaining_credits: i64,
    pub market_price: Price,
    pub locked_price: Price,
    pub savings: Amount,
    pub new_status: ContractStatus,
}

/// Request body for `POST /contracts/{id}/redeem`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRequest {
    pub requested_credits: i64,
}

pub type RedemptionResponse = SuccessResponse<RedemptionOutcome>;
pub type RedemptionHistoryResponse = SuccessResponse<Vec<RedemptionRecord>>;
