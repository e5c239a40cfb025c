use sea_orm_migration::{
    prelude::*,
    sea_orm::{ConnectionTrait, DbBackend, Statement},
};

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20251001_000005_create_constraint"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        let balance_statement =
            Statement::from_string(DbBackend::Postgres, ADD_BALANCE_CHECK.to_string());
        match conn.execute(balance_statement).await {
            Ok(_) => {
                let status_statement =
                    Statement::from_string(DbBackend::Postgres, ADD_STATUS_CHECK.to_string());
                match conn.execute(status_statement).await {
                    Ok(_) => Ok(()),
                    Err(error) => Err(error),
                }
            }
            Err(error) => Err(error),
        }
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();
        conn.execute(Statement::from_string(
            DbBackend::Postgres,
            DROP_STATUS_CHECK.to_string(),
        ))
        .await?;
        conn.execute(Statement::from_string(
            DbBackend::Postgres,
            DROP_BALANCE_CHECK.to_string(),
        ))
        .await?;
        Ok(())
    }
}

const ADD_BALANCE_CHECK: &str = r#"ALTER TABLE public.wallets
    ADD CONSTRAINT chk_wallets_balance_non_negative CHECK (balance >= 0);"#;

const ADD_STATUS_CHECK: &str = r#"ALTER TABLE public.referral_earnings
    ADD CONSTRAINT chk_referral_earnings_status
    CHECK (status IN ('pending', 'credited', 'failed'));"#;

const DROP_BALANCE_CHECK: &str =
    r#"ALTER TABLE public.wallets DROP CONSTRAINT IF EXISTS chk_wallets_balance_non_negative;"#;

const DROP_STATUS_CHECK: &str = r#"ALTER TABLE public.referral_earnings
    DROP CONSTRAINT IF EXISTS chk_referral_earnings_status;"#;
