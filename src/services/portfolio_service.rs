use anyhow::anyhow;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::instrument;

use crate::{
    error::{EngineError, Result},
    models::{
        common::{Amount, ContractStatus, GasPriceKind},
        portfolio::{MarketSnapshot, PortfolioSummary},
    },
    services::{credit_ledger::CreditLedger, price_oracle::BoundedOracle},
};

const RECENT_REDEMPTIONS: usize = 20;

/// Read-only aggregates for dashboard and portfolio views
pub struct PortfolioService {
    ledger: Arc<CreditLedger>,
    oracle: Arc<BoundedOracle>,
}

impl PortfolioService {
    pub fn new(ledger: Arc<CreditLedger>, oracle: Arc<BoundedOracle>) -> Self {
        Self { ledger, oracle }
    }

    #[instrument(skip(self))]
    pub fn summary(&self, owner: &str, now: OffsetDateTime) -> Result<PortfolioSummary> {
        let mut summary = PortfolioSummary {
            owner: owner.to_string(),
            active_contracts: 0,
            depleted_contracts: 0,
            expired_contracts: 0,
            active_total_credits: 0,
            remaining_credits: 0,
            used_credits: 0,
            utilization_percent: 0.0,
            total_savings: Amount::ZERO,
            recent_redemptions: Vec::new(),
        };

        let mut issued_credits: i64 = 0;
        for contract in self.ledger.list_by_owner_at(owner, now).iter() {
            issued_credits += contract.total_credits;
            summary.used_credits += contract.used_credits;

            match contract.status {
                ContractStatus::Active => {
                    summary.active_contracts += 1;
                    summary.active_total_credits += contract.total_credits;
                    summary.remaining_credits += contract.remaining_credits();
                }
                ContractStatus::Depleted => summary.depleted_contracts += 1,
                ContractStatus::Expired => summary.expired_contracts += 1,
            }
        }

        if issued_credits > 0 {
            let ratio = summary.used_credits as f64 / issued_credits as f64 * 100.0;
            summary.utilization_percent = (ratio * 100.0).round() / 100.0;
        }

        let redemptions = self.ledger.redemptions_by_owner(owner);
        summary.total_savings = Amount::checked_sum(redemptions.iter().map(|r| r.savings))
            .ok_or_else(|| EngineError::Internal(anyhow!("Savings total overflow")))?;
        summary.recent_redemptions = redemptions.into_iter().take(RECENT_REDEMPTIONS).collect();

        Ok(summary)
    }

    #[instrument(skip(self))]
    pub async fn market_snapshot(&self, now: OffsetDateTime) -> Result<MarketSnapshot> {
        let reference_price = self.oracle.quote(GasPriceKind::Reference, now).await?;
        let storage_price = self.oracle.quote(GasPriceKind::Storage, now).await?;

        Ok(MarketSnapshot {
            reference_price,
            storage_price,
            observed_at: now,
        })
    }
}
