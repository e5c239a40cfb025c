use crate::dto::{
    earnings_filter, EarningsSum, ResponseData, RESPONSE_BAD_REQUEST, RESPONSE_NOT_FOUND,
};
use referral_engine::{EarningsPage, LevelBreakdown, ReferralEngine, ReferralSummary};
use rocket::{serde::json::Json, State};
use tracing::warn;

const DEFAULT_PAGE_SIZE: u64 = 15;

#[allow(clippy::too_many_arguments)]
#[get("/referral_earnings?<user_id>&<level>&<status>&<from>&<to>&<page>&<limit>")]
pub async fn list(
    engine: &State<ReferralEngine>,
    user_id: String,
    level: Option<u32>,
    status: Option<String>,
    from: Option<i64>,
    to: Option<i64>,
    page: Option<u64>,
    limit: Option<u64>,
) -> Json<ResponseData<EarningsPage>> {
    let filter = match earnings_filter(level, status.as_deref(), from, to) {
        Ok(filter) => filter,
        Err(message) => {
            warn!("{}", message);
            return Json(ResponseData::new(RESPONSE_BAD_REQUEST, message, None));
        }
    };

    match engine
        .ledger()
        .list_earnings(
            &user_id,
            &filter,
            page.unwrap_or(1),
            limit.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await
    {
        Ok(earnings) => Json(ResponseData::ok(earnings)),
        Err(error) => Json(ResponseData::from_error(&error)),
    }
}

/// Total commission, across all beneficiaries when `user_id` is absent.
#[get("/referral_earnings/sum?<user_id>&<level>&<status>&<from>&<to>")]
pub async fn sum(
    engine: &State<ReferralEngine>,
    user_id: Option<String>,
    level: Option<u32>,
    status: Option<String>,
    from: Option<i64>,
    to: Option<i64>,
) -> Json<ResponseData<EarningsSum>> {
    let filter = match earnings_filter(level, status.as_deref(), from, to) {
        Ok(filter) => filter,
        Err(message) => {
            warn!("{}", message);
            return Json(ResponseData::new(RESPONSE_BAD_REQUEST, message, None));
        }
    };

    match engine
        .ledger()
        .sum_earnings(user_id.as_deref(), &filter)
        .await
    {
        Ok(total) => Json(ResponseData::ok(EarningsSum { user_id, total })),
        Err(error) => Json(ResponseData::from_error(&error)),
    }
}

#[get("/referral_earnings/levels?<user_id>")]
pub async fn levels(
    engine: &State<ReferralEngine>,
    user_id: String,
) -> Json<ResponseData<Vec<LevelBreakdown>>> {
    match engine.ledger().level_breakdown(&user_id).await {
        Ok(breakdown) => Json(ResponseData::ok(breakdown)),
        Err(error) => Json(ResponseData::from_error(&error)),
    }
}

#[get("/referral_earnings/summary?<user_id>")]
pub async fn summary(
    engine: &State<ReferralEngine>,
    user_id: String,
) -> Json<ResponseData<ReferralSummary>> {
    match engine.referral_summary(&user_id).await {
        Ok(Some(summary)) => Json(ResponseData::ok(summary)),
        Ok(None) => {
            warn!("Referral summary requested for unknown user {}", user_id);
            Json(ResponseData::new(
                RESPONSE_NOT_FOUND,
                "User not found".to_owned(),
                None,
            ))
        }
        Err(error) => Json(ResponseData::from_error(&error)),
    }
}
