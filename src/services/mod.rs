// Service modules
pub mod contract_issuer;
pub mod credit_ledger;
pub mod expiration_sweeper;
pub mod ledger_store;
pub mod portfolio_service;
pub mod price_oracle;
pub mod redemption_processor;

pub use contract_issuer::ContractIssuer;
pub use credit_ledger::{CreditLedger, OwnerContracts};
pub use expiration_sweeper::{ExpirationSweeper, SweepReport};
pub use ledger_store::{LedgerStore, PostgresStore, VolatileStore};
pub use portfolio_service::PortfolioService;
pub use price_oracle::{BoundedOracle, FixedPriceOracle, HttpPriceOracle, PriceOracle};
pub use redemption_processor::RedemptionProcessor;
