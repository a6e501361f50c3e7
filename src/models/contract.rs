use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use super::common::{Amount, ContractStatus, GasPriceKind, Price, SuccessResponse, Term};

pub type ContractId = Uuid;

/// Why a contract refuses further redemptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InactiveReason {
    Expired,
    Depleted,
}

impl fmt::Display for InactiveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InactiveReason::Expired => f.write_str("expired"),
            InactiveReason::Depleted => f.write_str("depleted"),
        }
    }
}

/// A gas futures contract: prepaid gas credits at a locked per-credit price.
///
/// `status` is a cached value. Callers that care about a specific instant
/// must go through [`Contract::status_at`]; the ledger revalidates it on
/// every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: ContractId,
    pub owner: String,
    pub price_kind: GasPriceKind,
    pub locked_price: Price,
    pub total_credits: i64,
    pub used_credits: i64,
    #[serde(rename = "termDays")]
    pub term: Term,
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub depleted_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expired_at: Option<OffsetDateTime>,
    pub status: ContractStatus,
    pub version: i64,
}

impl Contract {
    /// Build a fresh `Active` contract with nothing consumed
    pub fn new(
        owner: impl Into<String>,
        price_kind: GasPriceKind,
        locked_price: Price,
        total_credits: i64,
        term: Term,
        issued_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            price_kind,
            locked_price,
            total_credits,
            used_credits: 0,
            term,
            issued_at,
            expires_at: issued_at + term.duration(),
            depleted_at: None,
            expired_at: None,
            status: ContractStatus::Active,
            version: 0,
        }
    }

    pub fn remaining_credits(&self) -> i64 {
        self.total_credits - self.used_credits
    }

    /// Status at `now`, derived from consumption, expiry and any
    /// previously materialized terminal state.
    pub fn status_at(&self, now: OffsetDateTime) -> ContractStatus {
        // Consumption is refused at or after expiry, so a fully used
        // contract was necessarily depleted before it expired.
        if self.used_credits >= self.total_credits {
            return ContractStatus::Depleted;
        }
        if self.status == ContractStatus::Expired || now >= self.expires_at {
            return ContractStatus::Expired;
        }
        ContractStatus::Active
    }

    pub fn inactive_reason_at(&self, now: OffsetDateTime) -> Option<InactiveReason> {
        match self.status_at(now) {
            ContractStatus::Active => None,
            ContractStatus::Depleted => Some(InactiveReason::Depleted),
            ContractStatus::Expired => Some(InactiveReason::Expired),
        }
    }

    /// Copy with `status` recomputed for `now`
    pub fn revalidated(&self, now: OffsetDateTime) -> Contract {
        let mut contract = self.clone();
        contract.status = self.status_at(now);
        contract
    }

    /// Outstanding locked-price liability (zero once terminal)
    pub fn liability_at(&self, now: OffsetDateTime) -> Option<Amount> {
        match self.status_at(now) {
            ContractStatus::Active => Amount::cost(self.remaining_credits(), self.locked_price),
            _ => Some(Amount::ZERO),
        }
    }

    /// Consumption beyond the issued quantity means per-contract exclusion
    /// was broken somewhere. There is no safe way to continue.
    pub fn assert_within_bounds(&self) {
        assert!(
            self.used_credits >= 0 && self.used_credits <= self.total_credits,
            "contract {} violates credit bounds: used {} of {}",
            self.id,
            self.used_credits,
            self.total_credits
        );
    }
}

/// Request to issue a new contract
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IssueContractRequest {
    #[validate(length(min = 1, max = 128))]
    pub owner: String,

    pub term_days: i64,

    pub total_credits: i64,

    #[serde(default)]
    pub price_kind: Option<GasPriceKind>,
}

/// Contract as returned by the API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractView {
    #[serde(flatten)]
    pub contract: Contract,
    pub remaining_credits: i64,
}

impl From<Contract> for ContractView {
    fn from(contract: Contract) -> Self {
        let remaining_credits = contract.remaining_credits();
        Self {
            contract,
            remaining_credits,
        }
    }
}

pub type ContractResponse = SuccessResponse<ContractView>;
pub type ContractListResponse = SuccessResponse<Vec<ContractView>>;
