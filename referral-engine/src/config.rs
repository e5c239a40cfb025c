use crate::commission::{CommissionTable, CANONICAL_DEPTH, DEFAULT_CURRENCY_SCALE};
use crate::error::ReferralError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

// rust_decimal cannot represent more fractional digits than this
const MAX_CURRENCY_SCALE: u32 = 28;

/// Raw `[referral]` settings as they appear in the service configuration.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReferralSettings {
    pub max_depth: u32,
    pub currency_scale: u32,
    pub dedupe_source_events: bool,
    /// Overrides the canonical table, level 1 first.
    pub commission_levels: Option<Vec<Decimal>>,
}

impl Default for ReferralSettings {
    fn default() -> Self {
        ReferralSettings {
            max_depth: CANONICAL_DEPTH,
            currency_scale: DEFAULT_CURRENCY_SCALE,
            dedupe_source_events: false,
            commission_levels: None,
        }
    }
}

/// Validated engine configuration, built once at start-up.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub table: Arc<CommissionTable>,
    pub max_depth: u32,
    pub currency_scale: u32,
    pub dedupe_source_events: bool,
}

impl EngineConfig {
    pub fn canonical() -> Self {
        EngineConfig {
            table: Arc::new(CommissionTable::canonical()),
            max_depth: CANONICAL_DEPTH,
            currency_scale: DEFAULT_CURRENCY_SCALE,
            dedupe_source_events: false,
        }
    }

    pub fn from_settings(settings: &ReferralSettings) -> Result<Self, ReferralError> {
        let table = match &settings.commission_levels {
            Some(levels) => CommissionTable::new(levels.clone())?,
            None => CommissionTable::canonical(),
        };
        if settings.max_depth == 0 {
            return Err(ReferralError::Config("max_depth must be positive".to_owned()));
        }
        if settings.currency_scale > MAX_CURRENCY_SCALE {
            return Err(ReferralError::Config(format!(
                "currency_scale {} is above {}",
                settings.currency_scale, MAX_CURRENCY_SCALE
            )));
        }
        let max_depth = if settings.max_depth > table.depth() {
            warn!(
                "max_depth {} exceeds the commission table, walking {} levels",
                settings.max_depth,
                table.depth()
            );
            table.depth()
        } else {
            settings.max_depth
        };

        Ok(EngineConfig {
            table: Arc::new(table),
            max_depth,
            currency_scale: settings.currency_scale,
            dedupe_source_events: settings.dedupe_source_events,
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::canonical()
    }
}

impl TryFrom<&ReferralSettings> for EngineConfig {
    type Error = ReferralError;

    fn try_from(settings: &ReferralSettings) -> Result<Self, Self::Error> {
        Self::from_settings(settings)
    }
}
