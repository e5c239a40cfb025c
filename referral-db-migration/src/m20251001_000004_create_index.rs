use referral_db_entity::db::*;
use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20251001_000004_create_index"
    }
}

const IDX_BENEFICIARY_CREATED: &str = "idx_referral_earnings_beneficiary_created_at";
const IDX_LEVEL: &str = "idx_referral_earnings_level";
const IDX_STATUS: &str = "idx_referral_earnings_status";
const IDX_SOURCE_EVENT: &str = "idx_referral_earnings_source_event_id";
const IDX_USER_REFERRED_BY: &str = "idx_users_referred_by";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name(IDX_BENEFICIARY_CREATED)
                    .table(referral_earning::Entity)
                    .col(referral_earning::Column::BeneficiaryUserId)
                    .col(referral_earning::Column::CreatedAt)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name(IDX_LEVEL)
                    .table(referral_earning::Entity)
                    .col(referral_earning::Column::Level)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name(IDX_STATUS)
                    .table(referral_earning::Entity)
                    .col(referral_earning::Column::Status)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name(IDX_SOURCE_EVENT)
                    .table(referral_earning::Entity)
                    .col(referral_earning::Column::SourceEventId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name(IDX_USER_REFERRED_BY)
                    .table(user::Entity)
                    .col(user::Column::ReferredBy)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            IDX_BENEFICIARY_CREATED,
            IDX_LEVEL,
            IDX_STATUS,
            IDX_SOURCE_EVENT,
        ] {
            manager
                .drop_index(
                    Index::drop()
                        .name(name)
                        .table(referral_earning::Entity)
                        .to_owned(),
                )
                .await?;
        }
        manager
            .drop_index(
                Index::drop()
                    .name(IDX_USER_REFERRED_BY)
                    .table(user::Entity)
                    .to_owned(),
            )
            .await
    }
}
