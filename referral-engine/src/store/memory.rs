use crate::error::ReferralError;
use crate::model::{
    EarningStatus, EarningsFilter, LevelTotals, NewEarning, ReferralEarning, ReferralUser,
};
use crate::store::{EarningsStore, UserDirectory, WalletStore};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<String, ReferralUser>,
    wallets: HashMap<String, Decimal>,
    earnings: Vec<ReferralEarning>,
    next_earning_id: i64,
}

/// In-process implementation of all three stores.
///
/// Every operation runs under one mutex, so increments and status
/// transitions have the same atomicity as their SQL counterparts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // a panicking writer cannot leave a half-applied increment behind
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn upsert_user(&self, user: ReferralUser) {
        self.state().users.insert(user.id.to_owned(), user);
    }

    pub fn open_wallet(&self, user_id: &str, balance: Decimal) {
        self.state().wallets.insert(user_id.to_owned(), balance);
    }

    pub fn user(&self, user_id: &str) -> Option<ReferralUser> {
        self.state().users.get(user_id).cloned()
    }

    pub fn balance(&self, user_id: &str) -> Option<Decimal> {
        self.state().wallets.get(user_id).copied()
    }

    pub fn earnings(&self) -> Vec<ReferralEarning> {
        self.state().earnings.clone()
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_user(&self, user_id: &str) -> Result<Option<ReferralUser>, ReferralError> {
        Ok(self.user(user_id))
    }

    async fn find_by_referral_code(
        &self,
        referral_code: &str,
    ) -> Result<Option<ReferralUser>, ReferralError> {
        Ok(self
            .state()
            .users
            .values()
            .find(|u| u.referral_code.as_deref() == Some(referral_code))
            .cloned())
    }

    async fn direct_referrals(&self, user_id: &str) -> Result<Vec<ReferralUser>, ReferralError> {
        let mut referrals: Vec<ReferralUser> = self
            .state()
            .users
            .values()
            .filter(|u| u.referred_by.as_deref() == Some(user_id))
            .cloned()
            .collect();
        referrals.sort_unstable_by(|a, b| a.id.cmp(&b.id));
        Ok(referrals)
    }

    async fn add_referral_earnings(
        &self,
        user_id: &str,
        amount: Decimal,
    ) -> Result<bool, ReferralError> {
        match self.state().users.get_mut(user_id) {
            Some(user) => {
                user.total_referral_earnings += amount;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    async fn increment_balance(
        &self,
        user_id: &str,
        amount: Decimal,
    ) -> Result<bool, ReferralError> {
        match self.state().wallets.get_mut(user_id) {
            Some(balance) => {
                *balance += amount;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl EarningsStore for MemoryStore {
    async fn insert(&self, entry: NewEarning) -> Result<ReferralEarning, ReferralError> {
        let mut state = self.state();
        state.next_earning_id += 1;
        let earning = ReferralEarning::from_new(state.next_earning_id, entry);
        state.earnings.push(earning.clone());
        Ok(earning)
    }

    async fn find(&self, id: i64) -> Result<Option<ReferralEarning>, ReferralError> {
        Ok(self.state().earnings.iter().find(|e| e.id == id).cloned())
    }

    async fn set_status_if(
        &self,
        id: i64,
        expected: EarningStatus,
        status: EarningStatus,
    ) -> Result<bool, ReferralError> {
        let mut state = self.state();
        match state
            .earnings
            .iter_mut()
            .find(|e| e.id == id && e.status == expected)
        {
            Some(earning) => {
                earning.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(
        &self,
        filter: &EarningsFilter,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<ReferralEarning>, u64), ReferralError> {
        let mut matching: Vec<ReferralEarning> = self
            .state()
            .earnings
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        matching.sort_unstable_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total_items = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(page.saturating_mul(page_size)).unwrap_or(usize::MAX))
            .take(usize::try_from(page_size).unwrap_or(usize::MAX))
            .collect();
        Ok((items, total_items))
    }

    async fn sum(&self, filter: &EarningsFilter) -> Result<Decimal, ReferralError> {
        Ok(self
            .state()
            .earnings
            .iter()
            .filter(|e| filter.matches(e))
            .map(|e| e.commission_amount)
            .sum())
    }

    async fn level_totals(
        &self,
        beneficiary_user_id: &str,
    ) -> Result<Vec<LevelTotals>, ReferralError> {
        let mut totals: BTreeMap<u32, LevelTotals> = BTreeMap::new();
        for earning in self
            .state()
            .earnings
            .iter()
            .filter(|e| e.beneficiary_user_id == beneficiary_user_id)
        {
            let entry = totals.entry(earning.level).or_insert(LevelTotals {
                level: earning.level,
                count: 0,
                total_amount: Decimal::ZERO,
            });
            entry.count += 1;
            entry.total_amount += earning.commission_amount;
        }
        Ok(totals.into_values().collect())
    }

    async fn exists_for_event(&self, source_event_id: &str) -> Result<bool, ReferralError> {
        Ok(self
            .state()
            .earnings
            .iter()
            .any(|e| e.source_event_id == source_event_id))
    }
}
