//! Conversions between ledger models and the persisted entities
//!
//! The entities in entity/src mirror the ledger field set one to one; prices
//! and savings are stored as nano-unit integers.
use anyhow::anyhow;
use sea_orm::ActiveValue::Set;

use super::common::{Amount, Price, Term};
use super::contract::Contract;
use super::redemption::RedemptionRecord;
use crate::error::{EngineError, Result};

impl From<&Contract> for entity::gas_contracts::ActiveModel {
    fn from(contract: &Contract) -> Self {
        Self {
            id: Set(contract.id),
            owner: Set(contract.owner.clone()),
            price_kind: Set(contract.price_kind),
            locked_price_nanos: Set(contract.locked_price.nanos()),
            total_credits: Set(contract.total_credits),
            used_credits: Set(contract.used_credits),
            term_days: Set(contract.term.days() as i32),
            issued_at: Set(contract.issued_at),
            expires_at: Set(contract.expires_at),
            depleted_at: Set(contract.depleted_at),
            expired_at: Set(contract.expired_at),
            status: Set(contract.status),
            version: Set(contract.version),
        }
    }
}

impl TryFrom<entity::gas_contracts::Model> for Contract {
    type Error = EngineError;

    fn try_from(model: entity::gas_contracts::Model) -> Result<Self> {
        let term = Term::from_days(i64::from(model.term_days)).ok_or_else(|| {
            EngineError::Internal(anyhow!(
                "Stored contract {} has unsupported term {}",
                model.id,
                model.term_days
            ))
        })?;
        let locked_price = Price::from_nanos(model.locked_price_nanos).ok_or_else(|| {
            EngineError::Internal(anyhow!(
                "Stored contract {} has negative locked price",
                model.id
            ))
        })?;

        Ok(Contract {
            id: model.id,
            owner: model.owner,
            price_kind: model.price_kind,
            locked_price,
            total_credits: model.total_credits,
            used_credits: model.used_credits,
            term,
            issued_at: model.issued_at,
            expires_at: model.expires_at,
            depleted_at: model.depleted_at,
            expired_at: model.expired_at,
            status: model.status,
            version: model.version,
        })
    }
}

impl From<&RedemptionRecord> for entity::redemption_records::ActiveModel {
    fn from(record: &RedemptionRecord) -> Self {
        Self {
            id: Set(record.id),
            contract_id: Set(record.contract_id),
            owner: Set(record.owner.clone()),
            timestamp: Set(record.timestamp),
            credits_consumed: Set(record.credits_consumed),
            market_price_nanos: Set(record.market_price_at_time.nanos()),
            locked_price_nanos: Set(record.locked_price_at_time.nanos()),
            savings_nanos: Set(record.savings.nanos()),
        }
    }
}

impl TryFrom<entity::redemption_records::Model> for RedemptionRecord {
    type Error = EngineError;

    fn try_from(model: entity::redemption_records::Model) -> Result<Self> {
        let price = |nanos: i64| {
            Price::from_nanos(nanos).ok_or_else(|| {
                EngineError::Internal(anyhow!(
                    "Stored redemption {} has negative price",
                    model.id
                ))
            })
        };

        Ok(RedemptionRecord {
            id: model.id,
            contract_id: model.contract_id,
            market_price_at_time: price(model.market_price_nanos)?,
            locked_price_at_time: price(model.locked_price_nanos)?,
            owner: model.owner,
            timestamp: model.timestamp,
            credits_consumed: model.credits_consumed,
            savings: Amount::from_nanos(model.savings_nanos),
        })
    }
}
