//! Storage seams of the engine.
//!
//! Every mutation the engine performs goes through these narrow contracts.
//! Balance and earnings counters are only ever changed by atomic increments,
//! and ledger status only by a compare-and-swap on the current status.

use crate::error::ReferralError;
use crate::model::{
    EarningStatus, EarningsFilter, LevelTotals, NewEarning, ReferralEarning, ReferralUser,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub mod memory;
pub mod sea_orm_store;

pub use memory::MemoryStore;
pub use sea_orm_store::SeaOrmStore;

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, user_id: &str) -> Result<Option<ReferralUser>, ReferralError>;

    /// Exact match; codes are stored upper case.
    async fn find_by_referral_code(
        &self,
        referral_code: &str,
    ) -> Result<Option<ReferralUser>, ReferralError>;

    /// Users whose `referred_by` is `user_id`, ordered by id.
    async fn direct_referrals(&self, user_id: &str) -> Result<Vec<ReferralUser>, ReferralError>;

    /// Adds `amount` to the user's running referral earnings.
    /// Returns `false` when the user does not exist.
    async fn add_referral_earnings(
        &self,
        user_id: &str,
        amount: Decimal,
    ) -> Result<bool, ReferralError>;
}

#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Atomically adds `amount` to the wallet balance of `user_id`.
    /// Returns `false` when the user has no wallet.
    async fn increment_balance(&self, user_id: &str, amount: Decimal)
        -> Result<bool, ReferralError>;
}

#[async_trait]
pub trait EarningsStore: Send + Sync {
    async fn insert(&self, entry: NewEarning) -> Result<ReferralEarning, ReferralError>;

    async fn find(&self, id: i64) -> Result<Option<ReferralEarning>, ReferralError>;

    /// Moves entry `id` to `status` only if it is currently `expected`.
    async fn set_status_if(
        &self,
        id: i64,
        expected: EarningStatus,
        status: EarningStatus,
    ) -> Result<bool, ReferralError>;

    /// Newest first. `page` is zero based.
    async fn list(
        &self,
        filter: &EarningsFilter,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<ReferralEarning>, u64), ReferralError>;

    async fn sum(&self, filter: &EarningsFilter) -> Result<Decimal, ReferralError>;

    /// Only levels that have at least one row, ascending.
    async fn level_totals(
        &self,
        beneficiary_user_id: &str,
    ) -> Result<Vec<LevelTotals>, ReferralError>;

    async fn exists_for_event(&self, source_event_id: &str) -> Result<bool, ReferralError>;
}

/// The three stores the engine is wired with.
#[derive(Clone)]
pub struct ReferralStores {
    pub users: Arc<dyn UserDirectory>,
    pub wallets: Arc<dyn WalletStore>,
    pub earnings: Arc<dyn EarningsStore>,
}

impl ReferralStores {
    pub fn sea_orm(db: DatabaseConnection) -> Self {
        let store = Arc::new(SeaOrmStore::new(db));
        ReferralStores {
            users: store.clone(),
            wallets: store.clone(),
            earnings: store,
        }
    }

    pub fn memory(store: Arc<MemoryStore>) -> Self {
        ReferralStores {
            users: store.clone(),
            wallets: store.clone(),
            earnings: store,
        }
    }
}
