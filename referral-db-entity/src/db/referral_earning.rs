use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "referral_earnings", schema_name = "public")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub beneficiary_user_id: String,
    pub source_user_id: String,
    pub level: i32,
    pub base_amount: Decimal,
    // copy of the table value at computation time
    pub percentage: Decimal,
    pub commission_amount: Decimal,
    pub status: String,
    pub source_event_id: String,
    pub event_kind: String,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
