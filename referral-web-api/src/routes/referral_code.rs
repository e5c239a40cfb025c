use crate::dto::{ReferralCodeCheck, ResponseData, RESPONSE_BAD_REQUEST, RESPONSE_OK};
use referral_engine::ReferralEngine;
use rocket::{serde::json::Json, State};

#[get("/referral_codes/validate?<referral_code>")]
pub async fn validate(
    engine: &State<ReferralEngine>,
    referral_code: String,
) -> Json<ResponseData<ReferralCodeCheck>> {
    match engine.validate_referral_code(&referral_code).await {
        Ok(Some(referrer)) => Json(ResponseData::new(
            RESPONSE_OK,
            "Valid referral code".to_owned(),
            Some(ReferralCodeCheck {
                referrer_id: referrer.id,
            }),
        )),
        Ok(None) => Json(ResponseData::new(
            RESPONSE_BAD_REQUEST,
            "Invalid referral code".to_owned(),
            None,
        )),
        Err(error) => Json(ResponseData::from_error(&error)),
    }
}
