use async_trait::async_trait;
use sea_orm::{
    entity::*, query::*, sea_query::Expr, ConnectionTrait, DatabaseConnection, DbErr, SqlErr,
    TransactionTrait,
};
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::{
    error::{EngineError, Result},
    models::{
        contract::{Contract, ContractId},
        redemption::RedemptionRecord,
    },
};

/// Durable backing for the credit ledger.
///
/// Every write is called from inside the ledger's per-contract critical
/// section, before the new state becomes visible. A write that returns an
/// error must leave the store unchanged.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Every contract together with its redemption log, oldest record first
    async fn load_all(&self) -> Result<Vec<(Contract, Vec<RedemptionRecord>)>>;

    async fn insert_contract(&self, contract: &Contract) -> Result<()>;

    /// Persist `contract` (already carrying the increased `used_credits` and
    /// bumped `version`) together with `record`, atomically.
    async fn record_consumption(&self, contract: &Contract, record: &RedemptionRecord)
        -> Result<()>;

    /// Persist a status transition (`version` already bumped)
    async fn update_status(&self, contract: &Contract) -> Result<()>;

    /// Current stored state of one contract, used to resync after losing a
    /// compare-and-swap. Stores nobody else writes to have nothing newer
    /// than the ledger and return `None`.
    async fn load_contract(
        &self,
        _id: ContractId,
    ) -> Result<Option<(Contract, Vec<RedemptionRecord>)>> {
        Ok(None)
    }
}

/// Store that keeps nothing beyond the ledger's own memory
#[derive(Debug, Default)]
pub struct VolatileStore;

#[async_trait]
impl LedgerStore for VolatileStore {
    async fn load_all(&self) -> Result<Vec<(Contract, Vec<RedemptionRecord>)>> {
        Ok(Vec::new())
    }

    async fn insert_contract(&self, _contract: &Contract) -> Result<()> {
        Ok(())
    }

    async fn record_consumption(
        &self,
        _contract: &Contract,
        _record: &RedemptionRecord,
    ) -> Result<()> {
        Ok(())
    }

    async fn update_status(&self, _contract: &Contract) -> Result<()> {
        Ok(())
    }
}

/// Postgres-backed store.
///
/// Contract rows carry a `version` column; every update is a compare-and-swap
/// on the previous version so two ledger processes pointed at the same
/// database cannot both win a race on one contract.
pub struct PostgresStore {
    db: DatabaseConnection,
}

impl PostgresStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn compare_and_swap<C: ConnectionTrait>(conn: &C, contract: &Contract) -> Result<()> {
        use entity::gas_contracts::Column;

        let result = entity::gas_contracts::Entity::update_many()
            .col_expr(Column::UsedCredits, Expr::value(contract.used_credits))
            .col_expr(Column::Status, Expr::value(contract.status.as_str()))
            .col_expr(Column::DepletedAt, Expr::value(contract.depleted_at))
            .col_expr(Column::ExpiredAt, Expr::value(contract.expired_at))
            .col_expr(Column::Version, Expr::value(contract.version))
            .filter(Column::Id.eq(contract.id))
            .filter(Column::Version.eq(contract.version - 1))
            .exec(conn)
            .await?;

        if result.rows_affected != 1 {
            return Err(EngineError::ConcurrentModification(contract.id));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PostgresStore {
    #[instrument(skip(self))]
    async fn load_all(&self) -> Result<Vec<(Contract, Vec<RedemptionRecord>)>> {
        let contracts = entity::gas_contracts::Entity::find()
            .order_by_asc(entity::gas_contracts::Column::IssuedAt)
            .all(&self.db)
            .await?;

        let records = entity::redemption_records::Entity::find()
            .order_by_asc(entity::redemption_records::Column::Timestamp)
            .all(&self.db)
            .await?;

        let mut logs: HashMap<ContractId, Vec<RedemptionRecord>> = HashMap::new();
        for record in records {
            let record = RedemptionRecord::try_from(record)?;
            logs.entry(record.contract_id).or_default().push(record);
        }

        let loaded = contracts
            .into_iter()
            .map(|model| {
                let contract = Contract::try_from(model)?;
                let log = logs.remove(&contract.id).unwrap_or_default();
                Ok((contract, log))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(contracts = loaded.len(), "Loaded ledger from database");
        Ok(loaded)
    }

    #[instrument(skip(self, contract), fields(contract_id = %contract.id))]
    async fn insert_contract(&self, contract: &Contract) -> Result<()> {
        let model: entity::gas_contracts::ActiveModel = contract.into();

        match entity::gas_contracts::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(EngineError::DuplicateId(contract.id)),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, contract, record), fields(contract_id = %contract.id))]
    async fn record_consumption(
        &self,
        contract: &Contract,
        record: &RedemptionRecord,
    ) -> Result<()> {
        let txn = self.db.begin().await?;

        if let Err(e) = Self::compare_and_swap(&txn, contract).await {
            txn.rollback().await?;
            return Err(e);
        }

        let record_model: entity::redemption_records::ActiveModel = record.into();
        entity::redemption_records::Entity::insert(record_model)
            .exec_without_returning(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, contract), fields(contract_id = %contract.id))]
    async fn update_status(&self, contract: &Contract) -> Result<()> {
        Self::compare_and_swap(&self.db, contract).await
    }

    #[instrument(skip(self))]
    async fn load_contract(
        &self,
        id: ContractId,
    ) -> Result<Option<(Contract, Vec<RedemptionRecord>)>> {
        let Some(model) = entity::gas_contracts::Entity::find_by_id(id)
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let records = entity::redemption_records::Entity::find()
            .filter(entity::redemption_records::Column::ContractId.eq(id))
            .order_by_asc(entity::redemption_records::Column::Timestamp)
            .all(&self.db)
            .await?
            .into_iter()
            .map(RedemptionRecord::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(Some((Contract::try_from(model)?, records)))
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
