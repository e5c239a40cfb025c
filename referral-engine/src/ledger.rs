use crate::commission::CommissionTable;
use crate::error::ReferralError;
use crate::model::{
    EarningStatus, EarningsFilter, EarningsPage, LevelBreakdown, NewEarning, ReferralEarning,
};
use crate::store::EarningsStore;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub const MAX_PAGE_SIZE: u64 = 100;

/// Append-only record of commission payments.
///
/// Entries are created `pending` and move exactly once, to `credited` or
/// `failed`. Repeating the same terminal transition is a no-op; switching
/// between terminal states is rejected.
#[derive(Clone)]
pub struct EarningsLedger {
    store: Arc<dyn EarningsStore>,
    table: Arc<CommissionTable>,
}

impl EarningsLedger {
    pub fn new(store: Arc<dyn EarningsStore>, table: Arc<CommissionTable>) -> Self {
        EarningsLedger { store, table }
    }

    pub async fn record(&self, entry: NewEarning) -> Result<i64, ReferralError> {
        if entry.level == 0 {
            return Err(ReferralError::InvalidInput(
                "ledger levels start at 1".to_owned(),
            ));
        }
        let earning = self.store.insert(entry).await?;
        debug!(
            "Recorded referral earning {} for {} at level {}",
            earning.id, earning.beneficiary_user_id, earning.level
        );
        Ok(earning.id)
    }

    pub async fn mark_credited(&self, earning_id: i64) -> Result<(), ReferralError> {
        self.transition(earning_id, EarningStatus::Credited).await
    }

    pub async fn mark_failed(&self, earning_id: i64) -> Result<(), ReferralError> {
        self.transition(earning_id, EarningStatus::Failed).await
    }

    async fn transition(&self, earning_id: i64, target: EarningStatus) -> Result<(), ReferralError> {
        if self
            .store
            .set_status_if(earning_id, EarningStatus::Pending, target)
            .await?
        {
            return Ok(());
        }
        match self.store.find(earning_id).await? {
            Some(earning) if earning.status == target => Ok(()),
            Some(earning) if earning.status.is_terminal() => {
                warn!(
                    "Referral earning {} is already {}, refusing {}",
                    earning_id, earning.status, target
                );
                Err(ReferralError::InvalidTransition {
                    id: earning_id,
                    from: earning.status,
                    to: target,
                })
            }
            Some(_) => Err(ReferralError::Storage(format!(
                "status update of referral earning {} was not applied",
                earning_id
            ))),
            None => Err(ReferralError::EarningNotFound(earning_id)),
        }
    }

    pub async fn get(&self, earning_id: i64) -> Result<Option<ReferralEarning>, ReferralError> {
        self.store.find(earning_id).await
    }

    pub async fn has_event(&self, source_event_id: &str) -> Result<bool, ReferralError> {
        self.store.exists_for_event(source_event_id).await
    }

    /// Page `page` (starting at 1) of one beneficiary's earnings, newest first.
    pub async fn list_earnings(
        &self,
        beneficiary_user_id: &str,
        filter: &EarningsFilter,
        page: u64,
        page_size: u64,
    ) -> Result<EarningsPage, ReferralError> {
        if page == 0 {
            return Err(ReferralError::InvalidInput("'page' starts at 1".to_owned()));
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ReferralError::InvalidInput(format!(
                "'limit' must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        // sql OFFSET is a signed bigint
        let in_range = (page - 1)
            .checked_mul(page_size)
            .map_or(false, |offset| offset <= i64::MAX as u64);
        if !in_range {
            return Err(ReferralError::InvalidInput("'page' is out of range".to_owned()));
        }
        let filter = EarningsFilter {
            beneficiary_user_id: Some(beneficiary_user_id.to_owned()),
            ..filter.clone()
        };
        let (items, total_items) = self.store.list(&filter, page - 1, page_size).await?;
        Ok(EarningsPage::new(items, page, page_size, total_items))
    }

    /// Total commission matching `filter`, for one beneficiary or everyone.
    pub async fn sum_earnings(
        &self,
        beneficiary_user_id: Option<&str>,
        filter: &EarningsFilter,
    ) -> Result<Decimal, ReferralError> {
        let filter = EarningsFilter {
            beneficiary_user_id: beneficiary_user_id
                .map(|b| b.to_owned())
                .or_else(|| filter.beneficiary_user_id.clone()),
            ..filter.clone()
        };
        self.store.sum(&filter).await
    }

    /// One row per table level, including levels with no earnings yet.
    /// Rows recorded under levels the current table no longer has are kept
    /// at the end with a zero percentage.
    pub async fn level_breakdown(
        &self,
        beneficiary_user_id: &str,
    ) -> Result<Vec<LevelBreakdown>, ReferralError> {
        let mut totals: HashMap<u32, _> = self
            .store
            .level_totals(beneficiary_user_id)
            .await?
            .into_iter()
            .map(|t| (t.level, t))
            .collect();

        let mut breakdown: Vec<LevelBreakdown> = self
            .table
            .levels()
            .map(|(level, percentage)| {
                let (count, total_amount) = match totals.remove(&level) {
                    Some(t) => (t.count, t.total_amount),
                    None => (0, Decimal::ZERO),
                };
                LevelBreakdown {
                    level,
                    percentage,
                    count,
                    total_amount,
                }
            })
            .collect();

        let mut leftover: Vec<LevelBreakdown> = totals
            .into_values()
            .map(|t| LevelBreakdown {
                level: t.level,
                percentage: Decimal::ZERO,
                count: t.count,
                total_amount: t.total_amount,
            })
            .collect();
        leftover.sort_unstable_by_key(|b| b.level);
        breakdown.extend(leftover);
        Ok(breakdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CommissionEventKind;
    use crate::store::MemoryStore;
    use rust_decimal_macros::dec;

    fn ledger() -> (Arc<MemoryStore>, EarningsLedger) {
        let store = Arc::new(MemoryStore::new());
        let ledger = EarningsLedger::new(store.clone(), Arc::new(CommissionTable::canonical()));
        (store, ledger)
    }

    fn entry(beneficiary: &str, level: u32, amount: Decimal, created_at: i64) -> NewEarning {
        NewEarning {
            beneficiary_user_id: beneficiary.to_owned(),
            source_user_id: "downline".to_owned(),
            level,
            base_amount: dec!(1000),
            percentage: dec!(5),
            commission_amount: amount,
            source_event_id: format!("event-{}", created_at),
            event_kind: CommissionEventKind::TradeWin,
            created_at,
        }
    }

    #[tokio::test]
    async fn records_pending_entries() {
        let (store, ledger) = ledger();
        let id = ledger.record(entry("alice", 1, dec!(50), 100)).await.unwrap();

        let earning = ledger.get(id).await.unwrap().unwrap();
        assert_eq!(earning.status, EarningStatus::Pending);
        assert_eq!(earning.commission_amount, dec!(50));
        assert_eq!(store.earnings().len(), 1);
    }

    #[tokio::test]
    async fn rejects_level_zero() {
        let (_, ledger) = ledger();
        assert!(matches!(
            ledger.record(entry("alice", 0, dec!(50), 100)).await,
            Err(ReferralError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn terminal_states_are_final() {
        let (_, ledger) = ledger();
        let credited = ledger.record(entry("alice", 1, dec!(50), 100)).await.unwrap();
        let failed = ledger.record(entry("bob", 2, dec!(25), 101)).await.unwrap();

        ledger.mark_credited(credited).await.unwrap();
        // same target again is a no-op
        ledger.mark_credited(credited).await.unwrap();
        assert!(matches!(
            ledger.mark_failed(credited).await,
            Err(ReferralError::InvalidTransition {
                from: EarningStatus::Credited,
                to: EarningStatus::Failed,
                ..
            })
        ));

        ledger.mark_failed(failed).await.unwrap();
        ledger.mark_failed(failed).await.unwrap();
        assert!(ledger.mark_credited(failed).await.is_err());

        assert_eq!(
            ledger.get(credited).await.unwrap().unwrap().status,
            EarningStatus::Credited
        );
        assert_eq!(
            ledger.get(failed).await.unwrap().unwrap().status,
            EarningStatus::Failed
        );
    }

    #[tokio::test]
    async fn unknown_entry_cannot_transition() {
        let (_, ledger) = ledger();
        assert!(matches!(
            ledger.mark_credited(404).await,
            Err(ReferralError::EarningNotFound(404))
        ));
    }

    #[tokio::test]
    async fn lists_newest_first_with_filters() {
        let (_, ledger) = ledger();
        for (i, level) in [1u32, 2, 1, 3, 1].iter().enumerate() {
            let id = ledger
                .record(entry("alice", *level, dec!(10), 100 + i as i64))
                .await
                .unwrap();
            if *level == 1 {
                ledger.mark_credited(id).await.unwrap();
            }
        }
        ledger.record(entry("bob", 1, dec!(99), 200)).await.unwrap();

        let page = ledger
            .list_earnings("alice", &EarningsFilter::default(), 1, 2)
            .await
            .unwrap();
        assert_eq!(page.total_items, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(
            page.items.iter().map(|e| e.created_at).collect::<Vec<_>>(),
            vec![104, 103]
        );

        let last = ledger
            .list_earnings("alice", &EarningsFilter::default(), 3, 2)
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);

        let level_one = ledger
            .list_earnings(
                "alice",
                &EarningsFilter::default().with_level(1),
                1,
                10,
            )
            .await
            .unwrap();
        assert_eq!(level_one.total_items, 3);

        let pending = EarningsFilter::default().with_status(EarningStatus::Pending);
        let pending_page = ledger.list_earnings("alice", &pending, 1, 10).await.unwrap();
        assert_eq!(pending_page.total_items, 2);

        let window = EarningsFilter::default().created_between(Some(101), Some(103));
        let window_page = ledger.list_earnings("alice", &window, 1, 10).await.unwrap();
        assert_eq!(window_page.total_items, 2);
    }

    #[tokio::test]
    async fn rejects_bad_pages() {
        let (_, ledger) = ledger();
        let filter = EarningsFilter::default();
        assert!(ledger.list_earnings("alice", &filter, 0, 10).await.is_err());
        assert!(ledger.list_earnings("alice", &filter, 1, 0).await.is_err());
        assert!(ledger
            .list_earnings("alice", &filter, 1, MAX_PAGE_SIZE + 1)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn rejects_pages_past_the_offset_range() {
        let (_, ledger) = ledger();
        ledger.record(entry("alice", 1, dec!(10), 100)).await.unwrap();
        let filter = EarningsFilter::default();

        for page in [u64::MAX / 50, u64::MAX, (i64::MAX as u64) / 100 + 2] {
            assert!(matches!(
                ledger.list_earnings("alice", &filter, page, 100).await,
                Err(ReferralError::InvalidInput(_))
            ));
        }

        // far past the data but still addressable: an empty page
        let empty = ledger
            .list_earnings("alice", &filter, 1_000_000, 100)
            .await
            .unwrap();
        assert!(empty.items.is_empty());
        assert_eq!(empty.total_items, 1);
    }

    #[tokio::test]
    async fn sums_for_one_or_all_beneficiaries() {
        let (_, ledger) = ledger();
        let a = ledger.record(entry("alice", 1, dec!(50), 100)).await.unwrap();
        ledger.record(entry("alice", 2, dec!(25), 101)).await.unwrap();
        ledger.record(entry("bob", 1, dec!(12.5), 102)).await.unwrap();
        ledger.mark_credited(a).await.unwrap();

        let all = EarningsFilter::default();
        assert_eq!(ledger.sum_earnings(Some("alice"), &all).await.unwrap(), dec!(75));
        assert_eq!(ledger.sum_earnings(None, &all).await.unwrap(), dec!(87.5));

        let credited = EarningsFilter::default().with_status(EarningStatus::Credited);
        assert_eq!(
            ledger.sum_earnings(None, &credited).await.unwrap(),
            dec!(50)
        );
        assert_eq!(
            ledger.sum_earnings(Some("carol"), &all).await.unwrap(),
            Decimal::ZERO
        );
    }

    #[tokio::test]
    async fn breakdown_covers_every_level() {
        let (_, ledger) = ledger();
        ledger.record(entry("alice", 1, dec!(50), 100)).await.unwrap();
        ledger.record(entry("alice", 1, dec!(5), 101)).await.unwrap();
        ledger.record(entry("alice", 3, dec!(25), 102)).await.unwrap();
        ledger.record(entry("alice", 25, dec!(1), 103)).await.unwrap();

        let breakdown = ledger.level_breakdown("alice").await.unwrap();
        assert_eq!(breakdown.len(), 21);
        assert_eq!(breakdown[0].level, 1);
        assert_eq!(breakdown[0].percentage, dec!(5));
        assert_eq!(breakdown[0].count, 2);
        assert_eq!(breakdown[0].total_amount, dec!(55));
        assert_eq!(breakdown[1].count, 0);
        assert_eq!(breakdown[1].total_amount, Decimal::ZERO);
        assert_eq!(breakdown[2].total_amount, dec!(25));
        assert_eq!(breakdown[20].level, 25);
        assert_eq!(breakdown[20].percentage, Decimal::ZERO);
    }
}
