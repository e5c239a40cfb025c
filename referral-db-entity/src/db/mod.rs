pub mod referral_earning;
pub mod user;
pub mod wallet;
