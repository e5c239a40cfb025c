use crate::model::EarningStatus;
use sea_orm::DbErr;
use thiserror::Error;

/// Failures surfaced by the referral engine and its stores.
#[derive(Debug, Error)]
pub enum ReferralError {
    /// The triggering event was rejected before any chain work.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Database failure while reading or writing.
    #[error("persistence error: {0}")]
    Persistence(#[from] DbErr),

    #[error("referral earning {0} not found")]
    EarningNotFound(i64),

    /// A terminal ledger entry was asked to move to a different terminal state.
    #[error("referral earning {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: i64,
        from: EarningStatus,
        to: EarningStatus,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Stored data that does not map back onto the engine's types.
    #[error("storage error: {0}")]
    Storage(String),
}
