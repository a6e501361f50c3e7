pub mod prelude;

pub mod gas_contracts;
pub mod redemption_records;
pub mod sea_orm_active_enums;
