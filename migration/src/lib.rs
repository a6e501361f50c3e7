pub use sea_orm_migration::prelude::*;

mod m20250601_000001_create_gas_contracts;
mod m20250601_000002_create_redemption_records;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_gas_contracts::Migration),
            Box::new(m20250601_000002_create_redemption_records::Migration),
        ]
    }
}
