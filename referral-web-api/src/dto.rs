use referral_engine::{
    CommissionEvent, CommissionEventKind, EarningStatus, EarningsFilter, ReferralError,
};
use rocket::serde::{Deserialize, Serialize};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::error;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct CommissionEventRequest {
    pub source_user_id: String,
    pub base_amount: Decimal,
    pub source_event_id: String,
    pub kind: CommissionEventKind,
}

impl From<&CommissionEventRequest> for CommissionEvent {
    fn from(request: &CommissionEventRequest) -> Self {
        CommissionEvent::new(
            request.source_user_id.trim(),
            request.base_amount,
            request.source_event_id.trim(),
            request.kind,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct EarningsSum {
    pub user_id: Option<String>,
    pub total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct ReferralCodeCheck {
    pub referrer_id: String,
}

/// Builds a ledger filter from raw query parameters.
pub fn earnings_filter(
    level: Option<u32>,
    status: Option<&str>,
    from: Option<i64>,
    to: Option<i64>,
) -> Result<EarningsFilter, String> {
    let status = match status {
        Some(status) => match EarningStatus::from_str(&status.to_lowercase()) {
            Ok(status) => Some(status),
            Err(_) => {
                return Err(format!(
                    "'status' should be pending, credited or failed, got '{}'",
                    status
                ))
            }
        },
        None => None,
    };
    if let (Some(from), Some(to)) = (from, to) {
        if from >= to {
            return Err("'from' should be before 'to'".to_owned());
        }
    }
    Ok(EarningsFilter {
        level,
        status,
        created_from: from,
        created_to: to,
        ..Default::default()
    })
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ResponseData<T> {
    pub code: Option<u16>,
    #[serde(rename = "statusCode")]
    pub status_code: Option<u16>,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ResponseData<T> {
    pub fn new(code: u16, message: String, data: Option<T>) -> ResponseData<T> {
        ResponseData {
            code: Some(code),
            status_code: None,
            message,
            data,
        }
    }

    pub fn ok(data: T) -> ResponseData<T> {
        ResponseData::new(RESPONSE_OK, String::new(), Some(data))
    }

    /// Rejected input is the caller's fault, anything else is logged as ours.
    pub fn from_error(error: &ReferralError) -> ResponseData<T> {
        match error {
            ReferralError::InvalidInput(message) => {
                ResponseData::new(RESPONSE_BAD_REQUEST, message.to_owned(), None)
            }
            error => {
                error!("Referral request failed: {}", error);
                ResponseData::new(
                    RESPONSE_INTERNAL_ERROR,
                    "Error processing referral request".to_owned(),
                    None,
                )
            }
        }
    }
}

pub const RESPONSE_OK: u16 = 200;
pub const RESPONSE_BAD_REQUEST: u16 = 400;
pub const RESPONSE_NOT_FOUND: u16 = 404;
pub const RESPONSE_INTERNAL_ERROR: u16 = 500;

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::serde::json::serde_json;

    #[test]
    fn parses_camel_case_event() {
        let request: CommissionEventRequest = serde_json::from_str(
            r#"{"sourceUserId":" d ","baseAmount":"1000.5","sourceEventId":"trade-9","kind":"trade_win"}"#,
        )
        .unwrap();
        let event = CommissionEvent::from(&request);
        assert_eq!(event.source_user_id, "d");
        assert_eq!(event.base_amount, Decimal::new(10005, 1));
        assert_eq!(event.kind, CommissionEventKind::TradeWin);
    }

    #[test]
    fn builds_filters_from_query() {
        let filter = earnings_filter(Some(2), Some("Credited"), Some(10), Some(20)).unwrap();
        assert_eq!(filter.level, Some(2));
        assert_eq!(filter.status, Some(EarningStatus::Credited));
        assert_eq!(filter.created_to, Some(20));

        assert!(earnings_filter(None, Some("paid"), None, None).is_err());
        assert!(earnings_filter(None, None, Some(20), Some(20)).is_err());
        assert_eq!(
            earnings_filter(None, None, None, None).unwrap(),
            EarningsFilter::default()
        );
    }

    #[test]
    fn maps_engine_errors_to_codes() {
        let bad: ResponseData<()> =
            ResponseData::from_error(&ReferralError::InvalidInput("no".to_owned()));
        assert_eq!(bad.code, Some(RESPONSE_BAD_REQUEST));
        assert_eq!(bad.message, "no");

        let failed: ResponseData<()> =
            ResponseData::from_error(&ReferralError::Storage("down".to_owned()));
        assert_eq!(failed.code, Some(RESPONSE_INTERNAL_ERROR));

        let check = serde_json::to_value(ReferralCodeCheck {
            referrer_id: "a".to_owned(),
        })
        .unwrap();
        assert_eq!(check["referrerId"], "a");

        let json = serde_json::to_value(ResponseData::ok(5)).unwrap();
        assert_eq!(json["statusCode"], serde_json::Value::Null);
        assert_eq!(json["data"], 5);
    }
}
