use crate::error::ReferralError;
use referral_db_entity::db::{referral_earning, user};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum_macros::{Display, EnumString};

/// Referral view of a platform user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferralUser {
    pub id: String,
    pub referred_by: Option<String>,
    pub is_active_referral: bool,
    pub referral_code: Option<String>,
    pub total_referral_earnings: Decimal,
}

impl ReferralUser {
    pub fn new(id: &str, referred_by: Option<&str>, is_active_referral: bool) -> Self {
        ReferralUser {
            id: id.to_owned(),
            referred_by: referred_by.map(|r| r.to_owned()),
            is_active_referral,
            referral_code: None,
            total_referral_earnings: Decimal::ZERO,
        }
    }
}

impl From<user::Model> for ReferralUser {
    fn from(model: user::Model) -> Self {
        ReferralUser {
            id: model.id,
            referred_by: model.referred_by.filter(|r| !r.is_empty()),
            is_active_referral: model.is_active_referral,
            referral_code: model.referral_code,
            total_referral_earnings: model.total_referral_earnings,
        }
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EarningStatus {
    Pending,
    Credited,
    Failed,
}

impl EarningStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, EarningStatus::Pending)
    }
}

/// What kind of platform activity produced the commission base.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CommissionEventKind {
    /// base = staked amount
    Stake,
    /// base = winning payout of a settled trade
    TradeWin,
}

/// Inbound trigger for one commission payout across the upline.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CommissionEvent {
    pub source_user_id: String,
    pub base_amount: Decimal,
    pub source_event_id: String,
    pub kind: CommissionEventKind,
}

impl CommissionEvent {
    pub fn new(
        source_user_id: &str,
        base_amount: Decimal,
        source_event_id: &str,
        kind: CommissionEventKind,
    ) -> Self {
        CommissionEvent {
            source_user_id: source_user_id.to_owned(),
            base_amount,
            source_event_id: source_event_id.to_owned(),
            kind,
        }
    }

    pub fn stake(source_user_id: &str, staked_amount: Decimal, stake_id: &str) -> Self {
        Self::new(
            source_user_id,
            staked_amount,
            stake_id,
            CommissionEventKind::Stake,
        )
    }

    pub fn trade_win(source_user_id: &str, winning_amount: Decimal, trade_id: &str) -> Self {
        Self::new(
            source_user_id,
            winning_amount,
            trade_id,
            CommissionEventKind::TradeWin,
        )
    }
}

/// Ledger entry before it is stored. Always recorded as `pending`.
#[derive(Clone, Debug, PartialEq)]
pub struct NewEarning {
    pub beneficiary_user_id: String,
    pub source_user_id: String,
    pub level: u32,
    pub base_amount: Decimal,
    pub percentage: Decimal,
    pub commission_amount: Decimal,
    pub source_event_id: String,
    pub event_kind: CommissionEventKind,
    pub created_at: i64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ReferralEarning {
    pub id: i64,
    pub beneficiary_user_id: String,
    pub source_user_id: String,
    pub level: u32,
    pub base_amount: Decimal,
    pub percentage: Decimal,
    pub commission_amount: Decimal,
    pub status: EarningStatus,
    pub source_event_id: String,
    pub event_kind: CommissionEventKind,
    pub created_at: i64,
}

impl ReferralEarning {
    pub fn from_new(id: i64, entry: NewEarning) -> Self {
        ReferralEarning {
            id,
            beneficiary_user_id: entry.beneficiary_user_id,
            source_user_id: entry.source_user_id,
            level: entry.level,
            base_amount: entry.base_amount,
            percentage: entry.percentage,
            commission_amount: entry.commission_amount,
            status: EarningStatus::Pending,
            source_event_id: entry.source_event_id,
            event_kind: entry.event_kind,
            created_at: entry.created_at,
        }
    }
}

impl TryFrom<referral_earning::Model> for ReferralEarning {
    type Error = ReferralError;

    fn try_from(model: referral_earning::Model) -> Result<Self, Self::Error> {
        let status = EarningStatus::from_str(&model.status).map_err(|_| {
            ReferralError::Storage(format!(
                "referral earning {} has unknown status '{}'",
                model.id, model.status
            ))
        })?;
        let event_kind = CommissionEventKind::from_str(&model.event_kind).map_err(|_| {
            ReferralError::Storage(format!(
                "referral earning {} has unknown event kind '{}'",
                model.id, model.event_kind
            ))
        })?;
        let level = u32::try_from(model.level).map_err(|_| {
            ReferralError::Storage(format!(
                "referral earning {} has negative level {}",
                model.id, model.level
            ))
        })?;
        Ok(ReferralEarning {
            id: model.id,
            beneficiary_user_id: model.beneficiary_user_id,
            source_user_id: model.source_user_id,
            level,
            base_amount: model.base_amount,
            percentage: model.percentage,
            commission_amount: model.commission_amount,
            status,
            source_event_id: model.source_event_id,
            event_kind,
            created_at: model.created_at,
        })
    }
}

/// Read-side filter over the ledger. `created_to` is exclusive.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct EarningsFilter {
    pub beneficiary_user_id: Option<String>,
    pub level: Option<u32>,
    pub status: Option<EarningStatus>,
    pub created_from: Option<i64>,
    pub created_to: Option<i64>,
    pub source_event_id: Option<String>,
}

impl EarningsFilter {
    pub fn for_beneficiary(beneficiary_user_id: &str) -> Self {
        EarningsFilter {
            beneficiary_user_id: Some(beneficiary_user_id.to_owned()),
            ..Default::default()
        }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_status(mut self, status: EarningStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn created_between(mut self, from: Option<i64>, to: Option<i64>) -> Self {
        self.created_from = from;
        self.created_to = to;
        self
    }

    pub fn matches(&self, earning: &ReferralEarning) -> bool {
        self.beneficiary_user_id
            .as_ref()
            .map_or(true, |b| *b == earning.beneficiary_user_id)
            && self.level.map_or(true, |l| l == earning.level)
            && self.status.map_or(true, |s| s == earning.status)
            && self.created_from.map_or(true, |f| earning.created_at >= f)
            && self.created_to.map_or(true, |t| earning.created_at < t)
            && self
                .source_event_id
                .as_ref()
                .map_or(true, |e| *e == earning.source_event_id)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct EarningsPage {
    pub items: Vec<ReferralEarning>,
    pub page: u64,
    pub page_size: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl EarningsPage {
    pub fn new(items: Vec<ReferralEarning>, page: u64, page_size: u64, total_items: u64) -> Self {
        let if_remainder = if total_items % page_size > 0 { 1 } else { 0 };
        EarningsPage {
            items,
            page,
            page_size,
            total_items,
            total_pages: (total_items / page_size) + if_remainder,
        }
    }
}

/// Aggregate of one beneficiary's ledger rows at a single level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelTotals {
    pub level: u32,
    pub count: u64,
    pub total_amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct LevelBreakdown {
    pub level: u32,
    pub percentage: Decimal,
    pub count: u64,
    pub total_amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct DirectReferral {
    pub user_id: String,
    pub is_active_referral: bool,
}

impl From<ReferralUser> for DirectReferral {
    fn from(user: ReferralUser) -> Self {
        DirectReferral {
            user_id: user.id,
            is_active_referral: user.is_active_referral,
        }
    }
}

/// One user's referral standing: code, cached total, downline and earnings.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ReferralSummary {
    pub user_id: String,
    pub referral_code: Option<String>,
    pub total_referrals: u64,
    pub total_referral_earnings: Decimal,
    pub direct_referrals: Vec<DirectReferral>,
    /// Newest first.
    pub recent_earnings: Vec<ReferralEarning>,
    pub earnings_by_level: Vec<LevelBreakdown>,
}
