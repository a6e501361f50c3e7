pub use super::gas_contracts::Entity as GasContracts;
pub use super::redemption_records::Entity as RedemptionRecords;
