use serde::Serialize;
use time::OffsetDateTime;

use super::common::{Amount, Price, SuccessResponse};
use super::redemption::RedemptionRecord;

/// Aggregate figures for an owner's dashboard
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub owner: String,
    pub active_contracts: usize,
    pub depleted_contracts: usize,
    pub expired_contracts: usize,
    /// Credits issued across active contracts
    pub active_total_credits: i64,
    /// Credits still redeemable across active contracts
    pub remaining_credits: i64,
    /// Credits consumed across all contracts
    pub used_credits: i64,
    /// `used / total` over every contract, percent with 2 decimals
    pub utilization_percent: f64,
    pub total_savings: Amount,
    pub recent_redemptions: Vec<RedemptionRecord>,
}

/// Current prices on both gas series
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub reference_price: Price,
    pub storage_price: Price,
    #[serde(with = "time::serde::rfc3339")]
    pub observed_at: OffsetDateTime,
}

pub type PortfolioResponse = SuccessResponse<PortfolioSummary>;
pub type MarketResponse = SuccessResponse<MarketSnapshot>;
