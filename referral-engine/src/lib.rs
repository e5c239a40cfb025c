//! Multi-level referral commission engine.
//!
//! A [`CommissionEvent`] (a stake or a winning trade) is paid out across the
//! source user's referrer chain by [`ReferralEngine::process_commission_event`].
//! Each level gets a fixed percentage of the base amount, is written to the
//! earnings ledger and credited to the beneficiary's wallet.

pub mod commission;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod locks;
pub mod model;
pub mod report;
pub mod sql_stmt;
pub mod store;
pub mod upline;
pub mod wallet;

pub use commission::{CommissionCalculator, CommissionTable};
pub use config::{EngineConfig, ReferralSettings};
pub use engine::ReferralEngine;
pub use error::ReferralError;
pub use ledger::EarningsLedger;
pub use model::{
    CommissionEvent, CommissionEventKind, DirectReferral, EarningStatus, EarningsFilter,
    EarningsPage, LevelBreakdown, ReferralEarning, ReferralSummary, ReferralUser,
};
pub use report::{LevelOutcome, LevelReport, ProcessingReport};
pub use store::{MemoryStore, ReferralStores, SeaOrmStore};
