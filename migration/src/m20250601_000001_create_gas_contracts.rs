use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GasContracts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GasContracts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GasContracts::Owner).string().not_null())
                    .col(
                        ColumnDef::new(GasContracts::PriceKind)
                            .string_len(16)
                            .not_null()
                            .default("reference"),
                    )
                    .col(
                        ColumnDef::new(GasContracts::LockedPriceNanos)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GasContracts::TotalCredits)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GasContracts::UsedCredits)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(GasContracts::TermDays).integer().not_null())
                    .col(
                        ColumnDef::new(GasContracts::IssuedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GasContracts::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GasContracts::DepletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GasContracts::ExpiredAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GasContracts::Status)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(GasContracts::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    // The ledger never lets consumption run past the issued quantity
                    .check(Expr::col(GasContracts::UsedCredits).gte(0))
                    .check(
                        Expr::col(GasContracts::UsedCredits)
                            .lte(Expr::col(GasContracts::TotalCredits)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_gas_contracts_owner")
                    .table(GasContracts::Table)
                    .col(GasContracts::Owner)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_gas_contracts_expires_at")
                    .table(GasContracts::Table)
                    .col(GasContracts::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GasContracts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum GasContracts {
    Table,
    Id,
    Owner,
    PriceKind,
    LockedPriceNanos,
    TotalCredits,
    UsedCredits,
    TermDays,
    IssuedAt,
    ExpiresAt,
    DepletedAt,
    ExpiredAt,
    Status,
    Version,
}
