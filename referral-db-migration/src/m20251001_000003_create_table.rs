use referral_db_entity::db::*;
use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20251001_000003_create_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(referral_earning::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(referral_earning::Column::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(referral_earning::Column::BeneficiaryUserId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(referral_earning::Column::SourceUserId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(referral_earning::Column::Level)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(referral_earning::Column::BaseAmount)
                            .decimal()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(referral_earning::Column::Percentage)
                            .decimal()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(referral_earning::Column::CommissionAmount)
                            .decimal()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(referral_earning::Column::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(referral_earning::Column::SourceEventId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(referral_earning::Column::EventKind)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(referral_earning::Column::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(referral_earning::Entity).to_owned())
            .await
    }
}
