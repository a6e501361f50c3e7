use anyhow::anyhow;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::{
    config::IssuanceConfig,
    error::{EngineError, Result},
    models::{
        common::{Amount, GasPriceKind, Term},
        contract::Contract,
    },
    services::{credit_ledger::CreditLedger, price_oracle::BoundedOracle},
};

/// Validates and creates new contracts at the current oracle price
pub struct ContractIssuer {
    ledger: Arc<CreditLedger>,
    oracle: Arc<BoundedOracle>,
    config: IssuanceConfig,
    // Exposure check and ledger insert must not interleave across issuances
    issuance_lock: Mutex<()>,
}

impl ContractIssuer {
    pub fn new(
        ledger: Arc<CreditLedger>,
        oracle: Arc<BoundedOracle>,
        config: &IssuanceConfig,
    ) -> Self {
        Self {
            ledger,
            oracle,
            config: config.clone(),
            issuance_lock: Mutex::new(()),
        }
    }

    /// Issue a contract on the reference gas price, starting now
    pub async fn issue(&self, owner: &str, term_days: i64, total_credits: i64) -> Result<Contract> {
        self.issue_at(
            owner,
            term_days,
            total_credits,
            GasPriceKind::Reference,
            OffsetDateTime::now_utc(),
        )
        .await
    }

    /// Issue a contract locking the current `price_kind` price.
    ///
    /// Checks, in order: term, quantity bounds, owner, oracle quote and the
    /// optional exposure cap.
    #[instrument(skip(self))]
    pub async fn issue_at(
        &self,
        owner: &str,
        term_days: i64,
        total_credits: i64,
        price_kind: GasPriceKind,
        now: OffsetDateTime,
    ) -> Result<Contract> {
        let term = Term::from_days(term_days).ok_or(EngineError::InvalidTerm(term_days))?;

        if total_credits <= 0
            || total_credits < self.config.min_credits
            || total_credits > self.config.max_credits
        {
            return Err(EngineError::InvalidQuantity(format!(
                "total credits must be between {} and {}, got {}",
                self.config.min_credits, self.config.max_credits, total_credits
            )));
        }

        let owner = owner.trim();
        if owner.is_empty() {
            return Err(EngineError::BadRequest("owner must not be empty".to_string()));
        }

        // Locked once here and never re-quoted for this contract
        let locked_price = self.oracle.quote(price_kind, now).await?;

        let _guard = self.issuance_lock.lock().await;

        if let Some(cap) = self.config.exposure_cap {
            let requested = Amount::cost(total_credits, locked_price)
                .ok_or_else(|| EngineError::Internal(anyhow!("Contract cost overflow")))?;
            let outstanding = self.ledger.outstanding_liability(now)?;
            let projected = outstanding
                .checked_add(requested)
                .ok_or_else(|| EngineError::Internal(anyhow!("Exposure overflow")))?;

            if projected > cap {
                return Err(EngineError::ExposureExceeded {
                    outstanding,
                    requested,
                    cap,
                });
            }
        }

        let contract = Contract::new(owner, price_kind, locked_price, total_credits, term, now);
        let contract = self.ledger.create(contract).await?;

        info!(
            contract_id = %contract.id,
            owner = %contract.owner,
            term_days = term.days(),
            total_credits,
            locked_price = %contract.locked_price,
            "Issued gas futures contract"
        );

        Ok(contract)
    }
}
