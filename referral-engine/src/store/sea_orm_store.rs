use crate::error::ReferralError;
use crate::model::{
    EarningStatus, EarningsFilter, LevelTotals, NewEarning, ReferralEarning, ReferralUser,
};
use crate::sql_stmt::{DB_BACKEND, LEVEL_TOTALS};
use crate::store::{EarningsStore, UserDirectory, WalletStore};
use async_trait::async_trait;
use chrono::Utc;
use referral_db_entity::db::referral_earning::{
    ActiveModel as EarningActiveModel, Column as EarningColumn, Entity as Earning,
};
use referral_db_entity::db::user::{Column as UserColumn, Entity as User};
use referral_db_entity::db::wallet::{Column as WalletColumn, Entity as Wallet};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue, ColumnTrait, Condition, DatabaseConnection,
    EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Statement,
};
use tracing::debug;

/// Postgres-backed stores over a shared connection pool.
#[derive(Clone, Debug)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

#[derive(Debug, FromQueryResult)]
struct SumRow {
    total: Option<Decimal>,
}

#[derive(Debug, FromQueryResult)]
struct LevelTotalsRow {
    level: i32,
    earnings_count: i64,
    total_amount: Option<Decimal>,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        SeaOrmStore { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn into_inner(self) -> DatabaseConnection {
        self.db
    }
}

fn filter_condition(filter: &EarningsFilter) -> Condition {
    Condition::all()
        .add_option(
            filter
                .beneficiary_user_id
                .as_ref()
                .map(|b| EarningColumn::BeneficiaryUserId.eq(b.to_owned())),
        )
        .add_option(filter.level.map(|l| EarningColumn::Level.eq(l as i32)))
        .add_option(
            filter
                .status
                .map(|s| EarningColumn::Status.eq(s.to_string())),
        )
        .add_option(
            filter
                .created_from
                .map(|from| EarningColumn::CreatedAt.gte(from)),
        )
        .add_option(filter.created_to.map(|to| EarningColumn::CreatedAt.lt(to)))
        .add_option(
            filter
                .source_event_id
                .as_ref()
                .map(|e| EarningColumn::SourceEventId.eq(e.to_owned())),
        )
}

#[async_trait]
impl UserDirectory for SeaOrmStore {
    async fn find_user(&self, user_id: &str) -> Result<Option<ReferralUser>, ReferralError> {
        let user = User::find_by_id(user_id.to_owned()).one(&self.db).await?;
        Ok(user.map(ReferralUser::from))
    }

    async fn find_by_referral_code(
        &self,
        referral_code: &str,
    ) -> Result<Option<ReferralUser>, ReferralError> {
        let user = User::find()
            .filter(UserColumn::ReferralCode.eq(referral_code))
            .one(&self.db)
            .await?;
        Ok(user.map(ReferralUser::from))
    }

    async fn direct_referrals(&self, user_id: &str) -> Result<Vec<ReferralUser>, ReferralError> {
        let users = User::find()
            .filter(UserColumn::ReferredBy.eq(user_id))
            .order_by_asc(UserColumn::Id)
            .all(&self.db)
            .await?;
        Ok(users.into_iter().map(ReferralUser::from).collect())
    }

    async fn add_referral_earnings(
        &self,
        user_id: &str,
        amount: Decimal,
    ) -> Result<bool, ReferralError> {
        let result = User::update_many()
            .col_expr(
                UserColumn::TotalReferralEarnings,
                Expr::col(UserColumn::TotalReferralEarnings).add(amount),
            )
            .filter(UserColumn::Id.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl WalletStore for SeaOrmStore {
    async fn increment_balance(
        &self,
        user_id: &str,
        amount: Decimal,
    ) -> Result<bool, ReferralError> {
        // single UPDATE so concurrent credits never read a stale balance
        let result = Wallet::update_many()
            .col_expr(
                WalletColumn::Balance,
                Expr::col(WalletColumn::Balance).add(amount),
            )
            .col_expr(WalletColumn::UpdatedAt, Expr::value(Utc::now().timestamp()))
            .filter(WalletColumn::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        debug!(
            "Wallet increment for {}: {} row(s)",
            user_id, result.rows_affected
        );
        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl EarningsStore for SeaOrmStore {
    async fn insert(&self, entry: NewEarning) -> Result<ReferralEarning, ReferralError> {
        let earning = EarningActiveModel {
            id: ActiveValue::NotSet,
            beneficiary_user_id: ActiveValue::Set(entry.beneficiary_user_id),
            source_user_id: ActiveValue::Set(entry.source_user_id),
            level: ActiveValue::Set(entry.level as i32),
            base_amount: ActiveValue::Set(entry.base_amount),
            percentage: ActiveValue::Set(entry.percentage),
            commission_amount: ActiveValue::Set(entry.commission_amount),
            status: ActiveValue::Set(EarningStatus::Pending.to_string()),
            source_event_id: ActiveValue::Set(entry.source_event_id),
            event_kind: ActiveValue::Set(entry.event_kind.to_string()),
            created_at: ActiveValue::Set(entry.created_at),
        };
        let model = earning.insert(&self.db).await?;
        ReferralEarning::try_from(model)
    }

    async fn find(&self, id: i64) -> Result<Option<ReferralEarning>, ReferralError> {
        match Earning::find_by_id(id).one(&self.db).await? {
            Some(model) => Ok(Some(ReferralEarning::try_from(model)?)),
            None => Ok(None),
        }
    }

    async fn set_status_if(
        &self,
        id: i64,
        expected: EarningStatus,
        status: EarningStatus,
    ) -> Result<bool, ReferralError> {
        let result = Earning::update_many()
            .col_expr(EarningColumn::Status, Expr::value(status.to_string()))
            .filter(EarningColumn::Id.eq(id))
            .filter(EarningColumn::Status.eq(expected.to_string()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn list(
        &self,
        filter: &EarningsFilter,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<ReferralEarning>, u64), ReferralError> {
        let paginator = Earning::find()
            .filter(filter_condition(filter))
            .order_by_desc(EarningColumn::CreatedAt)
            .order_by_desc(EarningColumn::Id)
            .paginate(&self.db, page_size);
        let total_items = paginator.num_items().await?;
        let rows = paginator.fetch_page(page).await?;
        let items = rows
            .into_iter()
            .map(ReferralEarning::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((items, total_items))
    }

    async fn sum(&self, filter: &EarningsFilter) -> Result<Decimal, ReferralError> {
        let row = Earning::find()
            .select_only()
            .column_as(Expr::col(EarningColumn::CommissionAmount).sum(), "total")
            .filter(filter_condition(filter))
            .into_model::<SumRow>()
            .one(&self.db)
            .await?;
        Ok(row.and_then(|r| r.total).unwrap_or(Decimal::ZERO))
    }

    async fn level_totals(
        &self,
        beneficiary_user_id: &str,
    ) -> Result<Vec<LevelTotals>, ReferralError> {
        let rows = LevelTotalsRow::find_by_statement(Statement::from_sql_and_values(
            DB_BACKEND,
            LEVEL_TOTALS,
            vec![beneficiary_user_id.to_owned().into()],
        ))
        .all(&self.db)
        .await?;
        rows.into_iter()
            .map(|row| {
                Ok(LevelTotals {
                    level: u32::try_from(row.level).map_err(|_| {
                        ReferralError::Storage(format!("negative level {}", row.level))
                    })?,
                    count: row.earnings_count.max(0) as u64,
                    total_amount: row.total_amount.unwrap_or(Decimal::ZERO),
                })
            })
            .collect()
    }

    async fn exists_for_event(&self, source_event_id: &str) -> Result<bool, ReferralError> {
        let count = Earning::find()
            .filter(EarningColumn::SourceEventId.eq(source_event_id))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }
}
