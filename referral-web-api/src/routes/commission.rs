use crate::dto::{CommissionEventRequest, ResponseData};
use referral_engine::{CommissionEvent, ProcessingReport, ReferralEngine};
use rocket::{serde::json::Json, State};
use tracing::{info, warn};

#[post(
    "/commission_events",
    format = "application/json",
    data = "<commission_event>"
)]
pub async fn process(
    engine: &State<ReferralEngine>,
    commission_event: Json<CommissionEventRequest>,
) -> Json<ResponseData<ProcessingReport>> {
    let event = CommissionEvent::from(&commission_event.into_inner());
    info!(
        "Commission event {} received for user {}",
        event.source_event_id, event.source_user_id
    );

    match engine.process_commission_event(&event).await {
        Ok(report) => {
            if !report.is_clean() {
                warn!(
                    "Commission event {} finished with {} failed and {} errored level(s)",
                    report.source_event_id,
                    report.levels_failed,
                    report.errors().count()
                );
            }
            Json(ResponseData::ok(report))
        }
        Err(error) => Json(ResponseData::from_error(&error)),
    }
}
