use anyhow::anyhow;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::{
    error::{EngineError, Result},
    models::{
        contract::ContractId,
        redemption::{RedemptionOutcome, RedemptionRecord},
    },
    services::{credit_ledger::CreditLedger, price_oracle::BoundedOracle},
};

/// Settles a transaction's gas cost against a contract's locked credits
pub struct RedemptionProcessor {
    ledger: Arc<CreditLedger>,
    oracle: Arc<BoundedOracle>,
}

impl RedemptionProcessor {
    pub fn new(ledger: Arc<CreditLedger>, oracle: Arc<BoundedOracle>) -> Self {
        Self { ledger, oracle }
    }

    /// Consume up to `requested_credits` from the contract.
    ///
    /// Whatever the contract cannot cover comes back as `uncovered_credits`
    /// for the caller to pay at market price. The status check, the clamp to
    /// the remaining credits and the write are one step under the
    /// contract's lock, so racing redemptions can never overdraw it.
    #[instrument(skip(self))]
    pub async fn redeem(
        &self,
        contract_id: ContractId,
        requested_credits: i64,
        now: OffsetDateTime,
    ) -> Result<RedemptionOutcome> {
        if requested_credits <= 0 {
            return Err(EngineError::InvalidQuantity(format!(
                "requested credits must be positive, got {}",
                requested_credits
            )));
        }

        // Cheap rejection before paying for an oracle round trip
        let snapshot = self.ledger.get_at(contract_id, now)?;
        if let Some(reason) = snapshot.inactive_reason_at(now) {
            return Err(EngineError::ContractNotActive {
                contract_id,
                reason,
            });
        }

        let market_price = self.oracle.quote(snapshot.price_kind, now).await?;

        let (contract, record) = self
            .ledger
            .consume_with(contract_id, now, |contract| {
                let credits = requested_credits.min(contract.remaining_credits());
                let record = RedemptionRecord::new(contract, credits, market_price, now)
                    .ok_or_else(|| EngineError::Internal(anyhow!("Savings overflow")))?;
                Ok((credits, record))
            })
            .await?;

        let outcome = RedemptionOutcome {
            contract_id,
            record_id: record.id,
            credits_consumed: record.credits_consumed,
            uncovered_credits: requested_credits - record.credits_consumed,
            remaining_credits: contract.remaining_credits(),
            market_price,
            locked_price: record.locked_price_at_time,
            savings: record.savings,
            new_status: contract.status,
        };

        info!(
            contract_id = %contract_id,
            consumed = outcome.credits_consumed,
            uncovered = outcome.uncovered_credits,
            savings = %outcome.savings,
            status = outcome.new_status.as_str(),
            "Redeemed gas credits"
        );

        Ok(outcome)
    }
}
