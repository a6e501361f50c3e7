use gasfutures::{
    models::{
        common::{ContractStatus, GasPriceKind},
        contract::{Contract, InactiveReason},
    },
    services::{BoundedOracle, RedemptionProcessor},
    EngineError,
};
use std::sync::Arc;
use time::Duration;

use crate::support::{harness, price, t0, Harness, StalledOracle, LOCKED};

async fn issued(h: &Harness, total: i64) -> Contract {
    h.issuer
        .issue_at("0xalice", 30, total, GasPriceKind::Reference, t0())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_redeem_records_savings_against_locked_price() {
    let h = harness();
    let contract = issued(&h, 10_000).await;
    h.oracle.set("0.00025");

    let at = t0() + Duration::days(3);
    let outcome = h.processor.redeem(contract.id, 7_500, at).await.unwrap();

    assert_eq!(outcome.credits_consumed, 7_500);
    assert_eq!(outcome.uncovered_credits, 0);
    assert_eq!(outcome.remaining_credits, 2_500);
    assert_eq!(outcome.market_price, price("0.00025"));
    assert_eq!(outcome.locked_price, price(LOCKED));
    // 7,500 * (0.00025 - 0.00022)
    assert_eq!(outcome.savings.to_string(), "0.225");
    assert_eq!(outcome.new_status, ContractStatus::Active);

    let records = h.ledger.redemptions(contract.id).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, outcome.record_id);
    assert_eq!(records[0].timestamp, at);
    assert_eq!(records[0].owner, "0xalice");
    assert_eq!(records[0].savings, outcome.savings);
}

#[tokio::test]
async fn test_redeem_beyond_remaining_partially_covers_and_depletes() {
    let h = harness();
    let contract = issued(&h, 10_000).await;
    h.oracle.set("0.00025");

    let at = t0() + Duration::days(3);
    h.processor.redeem(contract.id, 7_500, at).await.unwrap();
    let outcome = h.processor.redeem(contract.id, 3_000, at).await.unwrap();

    assert_eq!(outcome.credits_consumed, 2_500);
    assert_eq!(outcome.uncovered_credits, 500);
    assert_eq!(outcome.remaining_credits, 0);
    assert_eq!(outcome.new_status, ContractStatus::Depleted);

    let stored = h.ledger.get_at(contract.id, at).unwrap();
    assert_eq!(stored.used_credits, 10_000);
    assert_eq!(stored.depleted_at, Some(at));

    // A depleted contract fails fast without a price lookup
    let calls = h.oracle.calls();
    let err = h.processor.redeem(contract.id, 1, at).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::ContractNotActive {
            reason: InactiveReason::Depleted,
            ..
        }
    ));
    assert_eq!(err.code(), "CONTRACT_DEPLETED");
    assert_eq!(h.oracle.calls(), calls);
}

#[tokio::test]
async fn test_redeem_below_locked_price_records_negative_savings() {
    let h = harness();
    let contract = issued(&h, 10_000).await;
    h.oracle.set("0.0002");

    let outcome = h
        .processor
        .redeem(contract.id, 1_000, t0() + Duration::days(1))
        .await
        .unwrap();

    assert_eq!(outcome.savings.to_string(), "-0.02");
}

#[tokio::test]
async fn test_redeem_after_expiry_is_refused() {
    let h = harness();
    let contract = issued(&h, 10_000).await;

    let err = h
        .processor
        .redeem(contract.id, 100, t0() + Duration::days(30))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::ContractNotActive {
            reason: InactiveReason::Expired,
            ..
        }
    ));
    assert_eq!(err.code(), "CONTRACT_EXPIRED");
    assert!(h.ledger.redemptions(contract.id).unwrap().is_empty());
}

#[tokio::test]
async fn test_redeem_rejects_non_positive_request() {
    let h = harness();
    let contract = issued(&h, 10_000).await;

    for requested in [0, -100] {
        let err = h
            .processor
            .redeem(contract.id, requested, t0() + Duration::days(1))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidQuantity(_)));
    }
    assert_eq!(
        h.ledger.get_at(contract.id, t0()).unwrap().used_credits,
        0
    );
}

#[tokio::test]
async fn test_redeem_unknown_contract() {
    let h = harness();
    let id = uuid::Uuid::new_v4();

    let err = h.processor.redeem(id, 100, t0()).await.unwrap_err();

    assert!(matches!(err, EngineError::NotFound(missing) if missing == id));
}

#[tokio::test]
async fn test_redeem_with_unavailable_oracle_consumes_nothing() {
    let h = harness();
    let contract = issued(&h, 10_000).await;
    h.oracle.go_down();

    let err = h
        .processor
        .redeem(contract.id, 500, t0() + Duration::days(1))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::OracleUnavailable(_)));
    assert_eq!(
        h.ledger.get_at(contract.id, t0()).unwrap().used_credits,
        0
    );
}

#[tokio::test(start_paused = true)]
async fn test_redeem_times_out_on_stalled_oracle() {
    let h = harness();
    let contract = issued(&h, 10_000).await;
    let stalled = Arc::new(BoundedOracle::new(
        Arc::new(StalledOracle),
        std::time::Duration::from_millis(500),
    ));
    let processor = RedemptionProcessor::new(h.ledger.clone(), stalled);

    let err = processor
        .redeem(contract.id, 500, t0() + Duration::days(1))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::OracleUnavailable(_)));
    assert!(h.ledger.redemptions(contract.id).unwrap().is_empty());
}

#[tokio::test]
async fn test_storage_contract_redeems_at_storage_price() {
    let h = harness();
    let contract = h
        .issuer
        .issue_at("0xalice", 30, 10_000, GasPriceKind::Storage, t0())
        .await
        .unwrap();
    h.oracle
        .prices
        .set_price(GasPriceKind::Storage, price("0.0000086"));

    let outcome = h
        .processor
        .redeem(contract.id, 10_000, t0() + Duration::days(1))
        .await
        .unwrap();

    assert_eq!(outcome.market_price, price("0.0000086"));
    assert_eq!(outcome.savings.to_string(), "0.01");
    assert_eq!(outcome.new_status, ContractStatus::Depleted);
}
