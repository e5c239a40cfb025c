use crate::model::{CommissionEvent, CommissionEventKind};
use crate::upline::UplineMember;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum LevelOutcome {
    Credited,
    /// Beneficiary has no wallet; the ledger entry is `failed`.
    Failed,
    /// Commission truncated to zero; nothing recorded.
    SkippedZero,
    Error(String),
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct LevelReport {
    pub level: u32,
    pub beneficiary_user_id: String,
    pub percentage: Decimal,
    pub commission_amount: Decimal,
    pub earning_id: Option<i64>,
    pub outcome: LevelOutcome,
}

impl LevelReport {
    pub fn new(member: &UplineMember, percentage: Decimal, commission_amount: Decimal) -> Self {
        LevelReport {
            level: member.level,
            beneficiary_user_id: member.user_id.to_owned(),
            percentage,
            commission_amount,
            earning_id: None,
            outcome: LevelOutcome::SkippedZero,
        }
    }
}

/// Summary of one commission event, handed back to the triggering flow.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ProcessingReport {
    pub source_user_id: String,
    pub source_event_id: String,
    pub kind: CommissionEventKind,
    pub base_amount: Decimal,
    /// Upline members resolved, zero-commission levels included.
    pub chain_length: u32,
    /// Levels that reached the ledger.
    pub levels_processed: u32,
    pub levels_credited: u32,
    pub levels_failed: u32,
    /// Sum of credited commissions.
    pub total_distributed: Decimal,
    pub levels: Vec<LevelReport>,
    /// Skipped because the event id already has ledger entries.
    pub duplicate: bool,
    /// Upline lookup failure that cut the walk short.
    pub chain_error: Option<String>,
}

impl ProcessingReport {
    pub fn new(event: &CommissionEvent) -> Self {
        ProcessingReport {
            source_user_id: event.source_user_id.to_owned(),
            source_event_id: event.source_event_id.to_owned(),
            kind: event.kind,
            base_amount: event.base_amount,
            chain_length: 0,
            levels_processed: 0,
            levels_credited: 0,
            levels_failed: 0,
            total_distributed: Decimal::ZERO,
            levels: Vec::new(),
            duplicate: false,
            chain_error: None,
        }
    }

    pub fn push(&mut self, level: LevelReport) {
        self.chain_length += 1;
        if level.earning_id.is_some() {
            self.levels_processed += 1;
        }
        match level.outcome {
            LevelOutcome::Credited => {
                self.levels_credited += 1;
                self.total_distributed += level.commission_amount;
            }
            LevelOutcome::Failed => self.levels_failed += 1,
            LevelOutcome::SkippedZero | LevelOutcome::Error(_) => {}
        }
        self.levels.push(level);
    }

    pub fn errors(&self) -> impl Iterator<Item = &LevelReport> {
        self.levels
            .iter()
            .filter(|l| matches!(l.outcome, LevelOutcome::Error(_)))
    }

    /// Every resolved level was either credited or skipped as zero.
    pub fn is_clean(&self) -> bool {
        self.chain_error.is_none()
            && self
                .levels
                .iter()
                .all(|l| matches!(l.outcome, LevelOutcome::Credited | LevelOutcome::SkippedZero))
    }
}
