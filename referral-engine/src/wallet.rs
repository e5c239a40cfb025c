use crate::error::ReferralError;
use crate::store::{UserDirectory, WalletStore};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditOutcome {
    Credited,
    WalletNotFound,
}

/// Applies commissions to beneficiary wallets.
#[derive(Clone)]
pub struct WalletCrediting {
    wallets: Arc<dyn WalletStore>,
    users: Arc<dyn UserDirectory>,
}

impl WalletCrediting {
    pub fn new(wallets: Arc<dyn WalletStore>, users: Arc<dyn UserDirectory>) -> Self {
        WalletCrediting { wallets, users }
    }

    /// Adds `amount` to the wallet of `user_id` with a single atomic increment,
    /// then bumps the user's referral earnings total. The total is best effort:
    /// failing to update it never undoes the wallet credit.
    pub async fn credit(&self, user_id: &str, amount: Decimal) -> Result<CreditOutcome, ReferralError> {
        if amount <= Decimal::ZERO {
            return Err(ReferralError::InvalidInput(format!(
                "credit amount must be positive, got {}",
                amount
            )));
        }
        if !self.wallets.increment_balance(user_id, amount).await? {
            warn!("Wallet not found for user {}", user_id);
            return Ok(CreditOutcome::WalletNotFound);
        }
        info!("Credited wallet for user {}: +{}", user_id, amount);

        match self.users.add_referral_earnings(user_id, amount).await {
            Ok(true) => {}
            Ok(false) => warn!(
                "User {} missing while updating referral earnings total",
                user_id
            ),
            Err(error) => warn!(
                "Could not update referral earnings total for {}: {}",
                user_id, error
            ),
        }
        Ok(CreditOutcome::Credited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReferralUser;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    fn crediting(store: &Arc<MemoryStore>) -> WalletCrediting {
        WalletCrediting::new(store.clone(), store.clone())
    }

    #[tokio::test]
    async fn credits_wallet_and_earnings_total() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_user(ReferralUser::new("alice", None, true));
        store.open_wallet("alice", dec!(10));

        let outcome = crediting(&store).credit("alice", dec!(2.5)).await.unwrap();
        assert_eq!(outcome, CreditOutcome::Credited);
        assert_eq!(store.balance("alice"), Some(dec!(12.5)));
        assert_eq!(
            store.user("alice").unwrap().total_referral_earnings,
            dec!(2.5)
        );
    }

    #[tokio::test]
    async fn missing_wallet_is_reported_not_raised() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_user(ReferralUser::new("alice", None, true));

        let outcome = crediting(&store).credit("alice", dec!(5)).await.unwrap();
        assert_eq!(outcome, CreditOutcome::WalletNotFound);
        assert_eq!(
            store.user("alice").unwrap().total_referral_earnings,
            Decimal::ZERO
        );
    }

    #[tokio::test]
    async fn rejects_non_positive_amounts() {
        let store = Arc::new(MemoryStore::new());
        store.open_wallet("alice", dec!(10));

        assert!(crediting(&store).credit("alice", Decimal::ZERO).await.is_err());
        assert!(crediting(&store).credit("alice", dec!(-1)).await.is_err());
        assert_eq!(store.balance("alice"), Some(dec!(10)));
    }

    struct BrokenDirectory;

    #[async_trait]
    impl UserDirectory for BrokenDirectory {
        async fn find_user(&self, _: &str) -> Result<Option<ReferralUser>, ReferralError> {
            Err(ReferralError::Storage("directory offline".to_owned()))
        }

        async fn add_referral_earnings(&self, _: &str, _: Decimal) -> Result<bool, ReferralError> {
            Err(ReferralError::Storage("directory offline".to_owned()))
        }

        async fn find_by_referral_code(
            &self,
            _: &str,
        ) -> Result<Option<ReferralUser>, ReferralError> {
            Err(ReferralError::Storage("directory offline".to_owned()))
        }

        async fn direct_referrals(&self, _: &str) -> Result<Vec<ReferralUser>, ReferralError> {
            Err(ReferralError::Storage("directory offline".to_owned()))
        }
    }

    #[tokio::test]
    async fn earnings_total_failure_keeps_credit() {
        let store = Arc::new(MemoryStore::new());
        store.open_wallet("alice", dec!(0));
        let crediting = WalletCrediting::new(store.clone(), Arc::new(BrokenDirectory));

        let outcome = crediting.credit("alice", dec!(7)).await.unwrap();
        assert_eq!(outcome, CreditOutcome::Credited);
        assert_eq!(store.balance("alice"), Some(dec!(7)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_credits_never_lose_an_increment() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_user(ReferralUser::new("alice", None, true));
        store.open_wallet("alice", dec!(100));
        let crediting = crediting(&store);

        let mut handles = Vec::new();
        for i in 0..200 {
            let crediting = crediting.clone();
            // alternate A = 1.5 and B = 2.25
            let amount = if i % 2 == 0 { dec!(1.5) } else { dec!(2.25) };
            handles.push(tokio::spawn(async move {
                crediting.credit("alice", amount).await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), CreditOutcome::Credited);
        }

        // 100 + 100 * 1.5 + 100 * 2.25
        assert_eq!(store.balance("alice"), Some(dec!(475)));
        assert_eq!(
            store.user("alice").unwrap().total_referral_earnings,
            dec!(375)
        );
    }
}
