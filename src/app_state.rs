use crate::{
    config::Config,
    services::{
        BoundedOracle, ContractIssuer, CreditLedger, ExpirationSweeper, LedgerStore,
        PortfolioService, PostgresStore, RedemptionProcessor, VolatileStore,
    },
};
use migration::{Migrator, MigratorTrait};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<CreditLedger>,
    pub oracle: Arc<BoundedOracle>,
    pub issuer: Arc<ContractIssuer>,
    pub redemption_processor: Arc<RedemptionProcessor>,
    pub sweeper: Arc<ExpirationSweeper>,
    pub portfolio_service: Arc<PortfolioService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        // Pick the ledger's backing store
        let store: Arc<dyn LedgerStore> = match config.database.url.as_deref() {
            Some(url) => {
                let db = sea_orm::Database::connect(url).await?;
                Migrator::up(&db, None).await?;
                Arc::new(PostgresStore::new(db))
            }
            None => {
                tracing::warn!("No database configured; ledger state will not survive restarts");
                Arc::new(VolatileStore)
            }
        };

        let ledger = Arc::new(CreditLedger::hydrate(store).await?);
        let oracle = Arc::new(BoundedOracle::from_config(&config.oracle)?);

        Ok(Self::from_parts(config, ledger, oracle))
    }

    /// Wire services around an existing ledger and oracle
    pub fn from_parts(config: Config, ledger: Arc<CreditLedger>, oracle: Arc<BoundedOracle>) -> Self {
        let issuer = Arc::new(ContractIssuer::new(
            ledger.clone(),
            oracle.clone(),
            &config.issuance,
        ));
        let redemption_processor = Arc::new(RedemptionProcessor::new(ledger.clone(), oracle.clone()));
        let sweeper = Arc::new(ExpirationSweeper::new(ledger.clone()));
        let portfolio_service = Arc::new(PortfolioService::new(ledger.clone(), oracle.clone()));

        Self {
            ledger,
            oracle,
            issuer,
            redemption_processor,
            sweeper,
            portfolio_service,
            config: Arc::new(config),
        }
    }
}
