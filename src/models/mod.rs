// Ledger models and request/response types
pub mod common;
pub mod contract;
pub mod contract_ext; // Conversions to/from entity::gas_contracts and entity::redemption_records
pub mod portfolio;
pub mod redemption;
