use gasfutures::{
    config::{
        Config, DatabaseConfig, IssuanceConfig, OracleConfig, OracleSource, ServerConfig,
        SweeperConfig,
    },
    models::common::{GasPriceKind, Price},
    services::{
        BoundedOracle, ContractIssuer, CreditLedger, ExpirationSweeper, FixedPriceOracle,
        LedgerStore, PriceOracle, RedemptionProcessor, VolatileStore,
    },
    EngineError, Result,
};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use time::{macros::datetime, OffsetDateTime};

pub const LOCKED: &str = "0.00022";

pub fn price(s: &str) -> Price {
    s.parse().expect("valid test price")
}

/// Fixed clock instant every test starts from
pub fn t0() -> OffsetDateTime {
    datetime!(2024-05-16 00:00 UTC)
}

pub fn issuance_config() -> IssuanceConfig {
    IssuanceConfig {
        min_credits: 1_000,
        max_credits: 100_000,
        exposure_cap: None,
    }
}

pub fn test_config(issuance: IssuanceConfig) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig::default(),
        oracle: OracleConfig {
            source: OracleSource::Fixed,
            request_timeout_ms: 500,
            http_base_url: None,
            fixed_reference_price: price(LOCKED),
            fixed_storage_price: price("0.0000076"),
        },
        issuance,
        sweeper: SweeperConfig {
            enabled: false,
            interval_secs: 60,
        },
    }
}

/// Oracle that counts calls and can be switched off
pub struct CountingOracle {
    pub prices: FixedPriceOracle,
    pub calls: AtomicUsize,
    pub down: std::sync::atomic::AtomicBool,
}

impl CountingOracle {
    pub fn new(reference: Price) -> Self {
        Self {
            prices: FixedPriceOracle::new(reference, price("0.0000076")),
            calls: AtomicUsize::new(0),
            down: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub fn set(&self, reference: &str) {
        self.prices.set_price(GasPriceKind::Reference, price(reference));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn go_down(&self) {
        self.down.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl PriceOracle for CountingOracle {
    async fn current_price(&self, kind: GasPriceKind, at: OffsetDateTime) -> Result<Price> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(EngineError::OracleUnavailable("feed offline".to_string()));
        }
        self.prices.current_price(kind, at).await
    }
}

/// Oracle that never answers in time
pub struct StalledOracle;

#[async_trait::async_trait]
impl PriceOracle for StalledOracle {
    async fn current_price(&self, _kind: GasPriceKind, _at: OffsetDateTime) -> Result<Price> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(price(LOCKED))
    }
}

pub struct Harness {
    pub ledger: Arc<CreditLedger>,
    pub oracle: Arc<CountingOracle>,
    pub issuer: ContractIssuer,
    pub processor: RedemptionProcessor,
    pub sweeper: ExpirationSweeper,
}

pub fn harness() -> Harness {
    harness_with(issuance_config(), Arc::new(VolatileStore))
}

pub fn harness_with(issuance: IssuanceConfig, store: Arc<dyn LedgerStore>) -> Harness {
    let ledger = Arc::new(CreditLedger::new(store));
    let oracle = Arc::new(CountingOracle::new(price(LOCKED)));
    let bounded = Arc::new(BoundedOracle::new(
        oracle.clone(),
        Duration::from_millis(500),
    ));

    Harness {
        issuer: ContractIssuer::new(ledger.clone(), bounded.clone(), &issuance),
        processor: RedemptionProcessor::new(ledger.clone(), bounded),
        sweeper: ExpirationSweeper::new(ledger.clone()),
        ledger,
        oracle,
    }
}
