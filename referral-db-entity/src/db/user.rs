use sea_orm::entity::prelude::*;

/// Referral-relevant projection of the platform's user record.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users", schema_name = "public")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    // immediate upline
    pub referred_by: Option<String>,
    pub is_active_referral: bool,
    #[sea_orm(unique)]
    pub referral_code: Option<String>,
    pub total_referral_earnings: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
