use gasfutures::{
    models::common::{ContractStatus, GasPriceKind, Term},
    models::{contract::Contract, redemption::RedemptionRecord},
    services::{CreditLedger, ExpirationSweeper, LedgerStore, SweepReport, VolatileStore},
    EngineError, Result,
};
use std::sync::Arc;
use time::{Duration, OffsetDateTime};

use crate::support::{harness, harness_with, issuance_config, price, t0, Harness, LOCKED};

/// Store that refuses status updates for one owner's contracts
struct RefusingStore {
    owner: &'static str,
}

#[async_trait::async_trait]
impl LedgerStore for RefusingStore {
    async fn load_all(&self) -> Result<Vec<(Contract, Vec<RedemptionRecord>)>> {
        Ok(Vec::new())
    }

    async fn insert_contract(&self, _contract: &Contract) -> Result<()> {
        Ok(())
    }

    async fn record_consumption(
        &self,
        _contract: &Contract,
        _record: &RedemptionRecord,
    ) -> Result<()> {
        Ok(())
    }

    async fn update_status(&self, contract: &Contract) -> Result<()> {
        if contract.owner == self.owner {
            return Err(EngineError::Database(sea_orm::DbErr::Custom(
                "row locked".to_string(),
            )));
        }
        Ok(())
    }
}

async fn issue(h: &Harness, term_days: i64, credits: i64) -> Contract {
    h.issuer
        .issue_at("0xalice", term_days, credits, GasPriceKind::Reference, t0())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_sweep_expires_only_lapsed_contracts_with_credits_left() {
    let h = harness();
    let lapsed = issue(&h, 30, 10_000).await;
    let partly_used = issue(&h, 30, 10_000).await;
    let depleted = issue(&h, 30, 1_000).await;
    let running = issue(&h, 90, 10_000).await;

    let during = t0() + Duration::days(10);
    h.processor.redeem(partly_used.id, 4_000, during).await.unwrap();
    h.processor.redeem(depleted.id, 1_000, during).await.unwrap();

    let at = t0() + Duration::days(31);
    let report = h.sweeper.sweep_at(at).await.unwrap();
    assert_eq!(
        report,
        SweepReport {
            scanned: 2,
            expired: 2,
            failed: 0
        }
    );

    for id in [lapsed.id, partly_used.id] {
        let contract = h.ledger.get_at(id, at).unwrap();
        assert_eq!(contract.status, ContractStatus::Expired);
        assert_eq!(contract.expired_at, Some(at));
    }
    // Forfeited credits stay unconsumed
    assert_eq!(h.ledger.get_at(partly_used.id, at).unwrap().used_credits, 4_000);

    let depleted = h.ledger.get_at(depleted.id, at).unwrap();
    assert_eq!(depleted.status, ContractStatus::Depleted);
    assert_eq!(depleted.expired_at, None);

    assert_eq!(
        h.ledger.get_at(running.id, at).unwrap().status,
        ContractStatus::Active
    );
}

#[tokio::test]
async fn test_second_sweep_finds_nothing() {
    let h = harness();
    let contract = h
        .issuer
        .issue_at("0xalice", 30, 10_000, GasPriceKind::Reference, t0())
        .await
        .unwrap();

    let at = t0() + Duration::days(30);
    assert_eq!(h.sweeper.sweep_at(at).await.unwrap().expired, 1);

    let again = h.sweeper.sweep_at(at + Duration::hours(1)).await.unwrap();
    assert_eq!(again, SweepReport::default());

    let stored = h.ledger.get_at(contract.id, at + Duration::hours(1)).unwrap();
    assert_eq!(stored.expired_at, Some(at));
}

#[tokio::test]
async fn test_sweep_before_any_expiry_is_empty() {
    let h = harness();
    h.issuer
        .issue_at("0xalice", 30, 10_000, GasPriceKind::Reference, t0())
        .await
        .unwrap();

    let report = h.sweeper.sweep_at(t0() + Duration::days(29)).await.unwrap();

    assert_eq!(report, SweepReport::default());
}

#[tokio::test]
async fn test_spawned_sweeper_materializes_expiry() {
    let ledger = Arc::new(CreditLedger::new(Arc::new(VolatileStore)));

    // Issued long enough ago that its term is already over
    let issued_at = OffsetDateTime::now_utc() - Duration::days(31);
    let contract = Contract::new(
        "0xalice",
        GasPriceKind::Reference,
        price(LOCKED),
        10_000,
        Term::ThirtyDays,
        issued_at,
    );
    let contract = ledger.create(contract).await.unwrap();

    let sweeper = Arc::new(ExpirationSweeper::new(ledger.clone()));
    let handle = sweeper.spawn(std::time::Duration::from_millis(50));

    let mut expired_at = None;
    for _ in 0..40 {
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
        if let Some(at) = ledger.get(contract.id).unwrap().expired_at {
            expired_at = Some(at);
            break;
        }
    }
    handle.abort();

    assert!(expired_at.is_some(), "sweeper never expired the contract");
    assert_eq!(
        ledger.get(contract.id).unwrap().status,
        ContractStatus::Expired
    );
}

#[tokio::test]
async fn test_sweep_continues_past_store_failures() {
    let h = harness_with(issuance_config(), Arc::new(RefusingStore { owner: "0xbad" }));

    let bad = h
        .issuer
        .issue_at("0xbad", 30, 10_000, GasPriceKind::Reference, t0())
        .await
        .unwrap();
    let mut good = Vec::new();
    for _ in 0..19 {
        good.push(issue(&h, 30, 10_000).await.id);
    }

    let at = t0() + Duration::days(31);
    let report = h.sweeper.sweep_at(at).await.unwrap();
    assert_eq!(
        report,
        SweepReport {
            scanned: 20,
            expired: 19,
            failed: 1
        }
    );

    for id in good {
        assert_eq!(h.ledger.get_at(id, at).unwrap().expired_at, Some(at));
    }

    // Still expired on read, and picked up again by the next sweep
    let stuck = h.ledger.get_at(bad.id, at).unwrap();
    assert_eq!(stuck.status, ContractStatus::Expired);
    assert_eq!(stuck.expired_at, None);
    let again = h.sweeper.sweep_at(at).await.unwrap();
    assert_eq!(again.scanned, 1);
    assert_eq!(again.failed, 1);
}
