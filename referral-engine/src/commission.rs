use crate::error::ReferralError;
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;

/// Depth of the canonical table, and the default chain walk bound.
pub const CANONICAL_DEPTH: u32 = 20;
/// Upper bound for configured tables.
pub const MAX_TABLE_LEVELS: usize = 100;
/// Decimal places of the platform's smallest currency unit.
pub const DEFAULT_CURRENCY_SCALE: u32 = 8;

// tenths of a percent, level 1 first
const CANONICAL_TENTHS: [i64; CANONICAL_DEPTH as usize] = [
    50, 25, 25, 25, 25, 15, 10, 5, 5, 5, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
];

/// Immutable level -> percentage lookup. Level 1 is the direct referrer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommissionTable {
    percentages: Vec<Decimal>,
}

impl CommissionTable {
    pub fn canonical() -> Self {
        CommissionTable {
            percentages: CANONICAL_TENTHS
                .iter()
                .map(|tenths| Decimal::new(*tenths, 1))
                .collect(),
        }
    }

    /// Builds a table from `percentages[0]` = level 1 onwards.
    pub fn new(percentages: Vec<Decimal>) -> Result<Self, ReferralError> {
        if percentages.is_empty() {
            return Err(ReferralError::Config(
                "commission table needs at least one level".to_owned(),
            ));
        }
        if percentages.len() > MAX_TABLE_LEVELS {
            return Err(ReferralError::Config(format!(
                "commission table has {} levels, at most {} are allowed",
                percentages.len(),
                MAX_TABLE_LEVELS
            )));
        }
        let hundred = Decimal::ONE_HUNDRED;
        for (index, percentage) in percentages.iter().enumerate() {
            if percentage.is_sign_negative() || *percentage > hundred {
                return Err(ReferralError::Config(format!(
                    "level {} percentage {} is outside 0..=100",
                    index + 1,
                    percentage
                )));
            }
        }
        Ok(CommissionTable { percentages })
    }

    /// Zero for level 0 and for any level past the end of the table.
    pub fn percentage_for_level(&self, level: u32) -> Decimal {
        if level == 0 {
            return Decimal::ZERO;
        }
        self.percentages
            .get((level - 1) as usize)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn depth(&self) -> u32 {
        self.percentages.len() as u32
    }

    pub fn levels(&self) -> impl Iterator<Item = (u32, Decimal)> + '_ {
        self.percentages
            .iter()
            .enumerate()
            .map(|(index, percentage)| (index as u32 + 1, *percentage))
    }
}

impl Default for CommissionTable {
    fn default() -> Self {
        Self::canonical()
    }
}

/// `base * percentage / 100`, truncated toward zero at `scale` decimal places.
///
/// Percentages are capped at 100, so the product never exceeds `base` and
/// cannot overflow. Non-positive inputs yield zero.
pub fn commission_for(base_amount: Decimal, percentage: Decimal, scale: u32) -> Decimal {
    if base_amount <= Decimal::ZERO || percentage <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let rate = percentage / Decimal::ONE_HUNDRED;
    (base_amount * rate)
        .round_dp_with_strategy(scale, RoundingStrategy::ToZero)
        .normalize()
}

#[derive(Clone, Debug)]
pub struct CommissionCalculator {
    table: Arc<CommissionTable>,
    scale: u32,
}

impl CommissionCalculator {
    pub fn new(table: Arc<CommissionTable>, scale: u32) -> Self {
        CommissionCalculator { table, scale }
    }

    pub fn table(&self) -> &CommissionTable {
        &self.table
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn compute(&self, base_amount: Decimal, level: u32) -> Decimal {
        commission_for(
            base_amount,
            self.table.percentage_for_level(level),
            self.scale,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn calculator(scale: u32) -> CommissionCalculator {
        CommissionCalculator::new(Arc::new(CommissionTable::canonical()), scale)
    }

    #[test]
    fn canonical_table_levels() {
        let table = CommissionTable::canonical();
        assert_eq!(table.depth(), 20);
        assert_eq!(table.percentage_for_level(1), dec!(5.0));
        assert_eq!(table.percentage_for_level(2), dec!(2.5));
        assert_eq!(table.percentage_for_level(5), dec!(2.5));
        assert_eq!(table.percentage_for_level(6), dec!(1.5));
        assert_eq!(table.percentage_for_level(7), dec!(1.0));
        assert_eq!(table.percentage_for_level(10), dec!(0.5));
        assert_eq!(table.percentage_for_level(11), dec!(0.4));
        assert_eq!(table.percentage_for_level(20), dec!(0.4));
    }

    #[test]
    fn levels_outside_table_are_zero() {
        let table = CommissionTable::canonical();
        assert_eq!(table.percentage_for_level(0), Decimal::ZERO);
        assert_eq!(table.percentage_for_level(21), Decimal::ZERO);
        assert_eq!(table.percentage_for_level(u32::MAX), Decimal::ZERO);
    }

    #[test]
    fn rejects_invalid_tables() {
        assert!(CommissionTable::new(vec![]).is_err());
        assert!(CommissionTable::new(vec![dec!(5), dec!(-0.1)]).is_err());
        assert!(CommissionTable::new(vec![dec!(100.01)]).is_err());
        assert!(CommissionTable::new(vec![dec!(1); MAX_TABLE_LEVELS + 1]).is_err());

        let table = CommissionTable::new(vec![dec!(10), dec!(0), dec!(100)]).unwrap();
        assert_eq!(table.depth(), 3);
        assert_eq!(table.percentage_for_level(2), Decimal::ZERO);
    }

    #[test]
    fn computes_scenario_amounts() {
        let calculator = calculator(DEFAULT_CURRENCY_SCALE);
        assert_eq!(calculator.compute(dec!(1000), 1), dec!(50));
        assert_eq!(calculator.compute(dec!(1000), 2), dec!(25));
        assert_eq!(calculator.compute(dec!(1000), 3), dec!(25));
        assert_eq!(calculator.compute(dec!(1000), 20), dec!(4));
        assert_eq!(calculator.compute(dec!(1000), 21), Decimal::ZERO);
    }

    #[test]
    fn truncates_toward_zero_at_scale() {
        // 3.33333333 * 2.5% = 0.08333333325
        assert_eq!(
            calculator(8).compute(dec!(3.33333333), 2),
            dec!(0.08333333)
        );
        // 19.99 * 5% = 0.9995, never rounded up to 1.00
        assert_eq!(calculator(2).compute(dec!(19.99), 1), dec!(0.99));
        // 1 * 0.4% = 0.004 is dust at two places
        assert_eq!(calculator(2).compute(dec!(1), 11), Decimal::ZERO);
    }

    #[test]
    fn non_positive_base_yields_nothing() {
        let calculator = calculator(DEFAULT_CURRENCY_SCALE);
        assert_eq!(calculator.compute(Decimal::ZERO, 1), Decimal::ZERO);
        assert_eq!(calculator.compute(dec!(-100), 1), Decimal::ZERO);
    }
}
