use super::sea_orm_active_enums::{ContractStatus, GasPriceKind};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "gas_contracts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner: String,
    pub price_kind: GasPriceKind,
    pub locked_price_nanos: i64,
    pub total_credits: i64,
    pub used_credits: i64,
    pub term_days: i32,
    pub issued_at: TimeDateTimeWithTimeZone,
    pub expires_at: TimeDateTimeWithTimeZone,
    pub depleted_at: Option<TimeDateTimeWithTimeZone>,
    pub expired_at: Option<TimeDateTimeWithTimeZone>,
    pub status: ContractStatus,
    pub version: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::redemption_records::Entity")]
    RedemptionRecords,
}

impl Related<super::redemption_records::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RedemptionRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
