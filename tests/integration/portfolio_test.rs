use gasfutures::{
    models::{
        common::{Amount, GasPriceKind},
        redemption::RedemptionRecord,
    },
    services::{BoundedOracle, FixedPriceOracle, PortfolioService},
    EngineError,
};
use std::{sync::Arc, time::Duration as StdDuration};
use time::Duration;

use crate::support::{harness, price, t0, Harness, LOCKED};

fn portfolio(h: &Harness) -> PortfolioService {
    let oracle = Arc::new(BoundedOracle::new(
        Arc::new(FixedPriceOracle::new(price(LOCKED), price("0.0000076"))),
        StdDuration::from_millis(500),
    ));
    PortfolioService::new(h.ledger.clone(), oracle)
}

#[tokio::test]
async fn test_summary_aggregates_owner_contracts() {
    let h = harness();
    let a = h
        .issuer
        .issue_at("0xalice", 30, 10_000, GasPriceKind::Reference, t0())
        .await
        .unwrap();
    let b = h
        .issuer
        .issue_at("0xalice", 30, 2_000, GasPriceKind::Reference, t0())
        .await
        .unwrap();
    h.issuer
        .issue_at("0xbob", 30, 5_000, GasPriceKind::Reference, t0())
        .await
        .unwrap();

    let at = t0() + Duration::days(2);
    h.oracle.set("0.00025");
    h.processor.redeem(a.id, 7_500, at).await.unwrap();
    h.oracle.set("0.0002");
    h.processor.redeem(b.id, 2_000, at).await.unwrap();

    let summary = portfolio(&h).summary("0xalice", at).unwrap();

    assert_eq!(summary.active_contracts, 1);
    assert_eq!(summary.depleted_contracts, 1);
    assert_eq!(summary.expired_contracts, 0);
    assert_eq!(summary.active_total_credits, 10_000);
    assert_eq!(summary.remaining_credits, 2_500);
    assert_eq!(summary.used_credits, 9_500);
    assert_eq!(summary.utilization_percent, 79.17);
    // 0.225 gained, 0.04 lost
    assert_eq!(summary.total_savings.to_string(), "0.185");
    assert_eq!(summary.recent_redemptions.len(), 2);
}

#[tokio::test]
async fn test_summary_reports_savings_overflow() {
    let h = harness();
    let c = h
        .issuer
        .issue_at("0xalice", 30, 10_000, GasPriceKind::Reference, t0())
        .await
        .unwrap();

    for day in 1..=2 {
        let at = t0() + Duration::days(day);
        let mut rec = RedemptionRecord::new(&c, 100, price("0.00025"), at).unwrap();
        rec.savings = Amount::from_nanos(i64::MAX / 2 + 1);
        h.ledger.apply_consumption(c.id, 100, rec).await.unwrap();
    }

    let err = portfolio(&h)
        .summary("0xalice", t0() + Duration::days(3))
        .unwrap_err();

    assert!(matches!(err, EngineError::Internal(_)));
}
