use sea_orm::DbBackend;

pub const DB_BACKEND: DbBackend = DbBackend::Postgres;

pub const LEVEL_TOTALS: &str = r#"SELECT referral_earnings.level,
    COUNT(*) AS earnings_count,
    SUM(referral_earnings.commission_amount) AS total_amount
    FROM referral_earnings
    WHERE beneficiary_user_id = $1
    GROUP BY referral_earnings.level
    ORDER BY referral_earnings.level ASC"#;
