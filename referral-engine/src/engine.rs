use crate::commission::{CommissionCalculator, CommissionTable};
use crate::config::EngineConfig;
use crate::error::ReferralError;
use crate::ledger::EarningsLedger;
use crate::locks::EventLocks;
use crate::model::{
    CommissionEvent, DirectReferral, EarningsFilter, NewEarning, ReferralSummary, ReferralUser,
};
use crate::report::{LevelOutcome, LevelReport, ProcessingReport};
use crate::store::{ReferralStores, UserDirectory};
use crate::upline::{UplineMember, UplineResolver};
use crate::wallet::{CreditOutcome, WalletCrediting};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Earnings shown in a referral summary.
pub const RECENT_EARNINGS: u64 = 10;

/// Multi-level referral commission engine.
///
/// One instance is shared by every triggering flow. Each event walks the
/// source user's upline and pays every level independently: a failure at
/// one level is recorded in the report and never stops the others.
pub struct ReferralEngine {
    config: EngineConfig,
    resolver: UplineResolver,
    calculator: CommissionCalculator,
    ledger: EarningsLedger,
    crediting: WalletCrediting,
    locks: EventLocks,
    users: Arc<dyn UserDirectory>,
}

impl ReferralEngine {
    pub fn new(config: EngineConfig, stores: ReferralStores) -> Self {
        ReferralEngine {
            resolver: UplineResolver::new(stores.users.clone()),
            calculator: CommissionCalculator::new(config.table.clone(), config.currency_scale),
            ledger: EarningsLedger::new(stores.earnings, config.table.clone()),
            crediting: WalletCrediting::new(stores.wallets, stores.users.clone()),
            locks: EventLocks::new(),
            users: stores.users,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn commission_table(&self) -> &CommissionTable {
        &self.config.table
    }

    /// Read surface over the earnings ledger.
    pub fn ledger(&self) -> &EarningsLedger {
        &self.ledger
    }

    pub fn resolver(&self) -> &UplineResolver {
        &self.resolver
    }

    /// Referral overview of `user_id`, or `None` for an unknown user.
    pub async fn referral_summary(
        &self,
        user_id: &str,
    ) -> Result<Option<ReferralSummary>, ReferralError> {
        let user = match self.users.find_user(user_id).await? {
            Some(user) => user,
            None => return Ok(None),
        };
        let direct_referrals: Vec<DirectReferral> = self
            .users
            .direct_referrals(user_id)
            .await?
            .into_iter()
            .map(DirectReferral::from)
            .collect();
        let recent = self
            .ledger
            .list_earnings(user_id, &EarningsFilter::default(), 1, RECENT_EARNINGS)
            .await?;
        let earnings_by_level = self.ledger.level_breakdown(user_id).await?;

        Ok(Some(ReferralSummary {
            user_id: user.id,
            referral_code: user.referral_code,
            total_referrals: direct_referrals.len() as u64,
            total_referral_earnings: user.total_referral_earnings,
            direct_referrals,
            recent_earnings: recent.items,
            earnings_by_level,
        }))
    }

    /// Looks up the owner of a referral code. Codes are matched upper case.
    pub async fn validate_referral_code(
        &self,
        referral_code: &str,
    ) -> Result<Option<ReferralUser>, ReferralError> {
        let referral_code = referral_code.trim().to_uppercase();
        if referral_code.is_empty() {
            return Err(ReferralError::InvalidInput(
                "referral code is required".to_owned(),
            ));
        }
        let referrer = self.users.find_by_referral_code(&referral_code).await?;
        if referrer.is_none() {
            info!("Invalid referral code {}", referral_code);
        }
        Ok(referrer)
    }

    /// Pays commissions for one stake or winning trade.
    ///
    /// Only [`ReferralError::InvalidInput`] is returned as an error; every
    /// other failure is absorbed into the report.
    #[instrument(
        skip(self, event),
        fields(
            source_user_id = %event.source_user_id,
            source_event_id = %event.source_event_id,
            kind = %event.kind
        )
    )]
    pub async fn process_commission_event(
        &self,
        event: &CommissionEvent,
    ) -> Result<ProcessingReport, ReferralError> {
        validate(event)?;

        let _event_guard = self.locks.acquire(&event.source_event_id).await;
        let mut report = ProcessingReport::new(event);

        if self.config.dedupe_source_events {
            match self.ledger.has_event(&event.source_event_id).await {
                Ok(false) => {}
                Ok(true) => {
                    warn!(
                        "Commission event {} already processed, skipping",
                        event.source_event_id
                    );
                    report.duplicate = true;
                    return Ok(report);
                }
                Err(error) => {
                    error!(
                        "Could not check commission event {}: {}",
                        event.source_event_id, error
                    );
                    report.chain_error = Some(error.to_string());
                    return Ok(report);
                }
            }
        }

        let mut walk = self
            .resolver
            .walk(&event.source_user_id, self.config.max_depth);
        loop {
            let member = match walk.next().await {
                Ok(Some(member)) => member,
                Ok(None) => break,
                Err(error) => {
                    error!(
                        "Upline lookup failed above {} after {} level(s): {}",
                        event.source_user_id,
                        walk.depth(),
                        error
                    );
                    report.chain_error = Some(error.to_string());
                    break;
                }
            };
            let level = self.process_level(event, &member).await;
            report.push(level);
        }

        if report.chain_length == 0 {
            info!("No referral chain found for user {}", event.source_user_id);
        }
        info!(
            "Processed referral earnings for user {}, amount: {}, levels: {}, credited: {}, failed: {}, distributed: {}",
            event.source_user_id,
            event.base_amount,
            report.chain_length,
            report.levels_credited,
            report.levels_failed,
            report.total_distributed
        );
        Ok(report)
    }

    async fn process_level(&self, event: &CommissionEvent, member: &UplineMember) -> LevelReport {
        let percentage = self.calculator.table().percentage_for_level(member.level);
        let commission = self.calculator.compute(event.base_amount, member.level);
        let mut level = LevelReport::new(member, percentage, commission);
        if commission.is_zero() {
            return level;
        }

        let entry = NewEarning {
            beneficiary_user_id: member.user_id.to_owned(),
            source_user_id: event.source_user_id.to_owned(),
            level: member.level,
            base_amount: event.base_amount,
            percentage,
            commission_amount: commission,
            source_event_id: event.source_event_id.to_owned(),
            event_kind: event.kind,
            created_at: Utc::now().timestamp(),
        };
        let earning_id = match self.ledger.record(entry).await {
            Ok(id) => id,
            Err(error) => {
                error!(
                    "Could not record level {} earning for {}: {}",
                    member.level, member.user_id, error
                );
                level.outcome = LevelOutcome::Error(error.to_string());
                return level;
            }
        };
        level.earning_id = Some(earning_id);

        level.outcome = match self.settle(earning_id, &member.user_id, commission).await {
            Ok(outcome) => outcome,
            Err(error) => {
                error!(
                    "Level {} payout to {} (earning {}) failed: {}",
                    member.level, member.user_id, earning_id, error
                );
                LevelOutcome::Error(error.to_string())
            }
        };
        level
    }

    async fn settle(
        &self,
        earning_id: i64,
        beneficiary_user_id: &str,
        commission: Decimal,
    ) -> Result<LevelOutcome, ReferralError> {
        match self.crediting.credit(beneficiary_user_id, commission).await {
            Ok(CreditOutcome::Credited) => {
                self.ledger.mark_credited(earning_id).await?;
                Ok(LevelOutcome::Credited)
            }
            Ok(CreditOutcome::WalletNotFound) => {
                self.ledger.mark_failed(earning_id).await?;
                Ok(LevelOutcome::Failed)
            }
            Err(error) => {
                // the wallet was not updated, so the entry must not stay pending
                if let Err(mark_error) = self.ledger.mark_failed(earning_id).await {
                    error!(
                        "Could not mark earning {} failed: {}",
                        earning_id, mark_error
                    );
                }
                Err(error)
            }
        }
    }
}

fn validate(event: &CommissionEvent) -> Result<(), ReferralError> {
    if event.source_user_id.trim().is_empty() {
        return Err(ReferralError::InvalidInput(
            "source user id is required".to_owned(),
        ));
    }
    if event.source_event_id.trim().is_empty() {
        return Err(ReferralError::InvalidInput(
            "source event id is required".to_owned(),
        ));
    }
    if event.base_amount <= Decimal::ZERO {
        return Err(ReferralError::InvalidInput(format!(
            "base amount must be positive, got {}",
            event.base_amount
        )));
    }
    Ok(())
}
