use sea_orm_migration::prelude::*;

use super::m20250601_000001_create_gas_contracts::GasContracts;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Append-only audit trail, one row per settled redemption
        manager
            .create_table(
                Table::create()
                    .table(RedemptionRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RedemptionRecords::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RedemptionRecords::ContractId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RedemptionRecords::Owner).string().not_null())
                    .col(
                        ColumnDef::new(RedemptionRecords::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RedemptionRecords::CreditsConsumed)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RedemptionRecords::MarketPriceNanos)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RedemptionRecords::LockedPriceNanos)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RedemptionRecords::SavingsNanos)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_redemption_records_contract_id")
                            .from(RedemptionRecords::Table, RedemptionRecords::ContractId)
                            .to(GasContracts::Table, GasContracts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_redemption_records_contract_ts")
                    .table(RedemptionRecords::Table)
                    .col(RedemptionRecords::ContractId)
                    .col(RedemptionRecords::Timestamp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_redemption_records_owner")
                    .table(RedemptionRecords::Table)
                    .col(RedemptionRecords::Owner)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RedemptionRecords::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum RedemptionRecords {
    Table,
    Id,
    ContractId,
    Owner,
    Timestamp,
    CreditsConsumed,
    MarketPriceNanos,
    LockedPriceNanos,
    SavingsNanos,
}
