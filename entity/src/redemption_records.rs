use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "redemption_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub contract_id: Uuid,
    pub owner: String,
    pub timestamp: TimeDateTimeWithTimeZone,
    pub credits_consumed: i64,
    pub market_price_nanos: i64,
    pub locked_price_nanos: i64,
    pub savings_nanos: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::gas_contracts::Entity",
        from = "Column::ContractId",
        to = "super::gas_contracts::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    GasContracts,
}

impl Related<super::gas_contracts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GasContracts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
