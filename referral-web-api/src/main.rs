mod dto;
mod pool;
mod routes;

use dto::{ResponseData, RESPONSE_BAD_REQUEST, RESPONSE_INTERNAL_ERROR};
use pool::{Db, ReferralServiceConfig};
use referral_engine::{EngineConfig, ReferralEngine, ReferralStores};
use rocket::fairing::AdHoc;
use rocket::{serde::json::Json, Build, Config, Request, Rocket};
use sea_orm_rocket::Database;
use tracing::{error, info};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

#[macro_use]
extern crate rocket;

#[get("/")]
async fn health_ping() -> &'static str {
    ""
}

#[catch(404)]
async fn bad_request(req: &Request<'_>) -> Json<ResponseData<String>> {
    let message = format!("Couldn't find '{}'", req.uri());
    Json(ResponseData::new(RESPONSE_BAD_REQUEST, message, None))
}

#[catch(500)]
async fn internal_error() -> Json<ResponseData<String>> {
    Json(ResponseData::new(
        RESPONSE_INTERNAL_ERROR,
        "Whoops! Looks like we messed up.".to_owned(),
        None,
    ))
}

#[catch(default)]
async fn commission_event_bad_data() -> Json<ResponseData<String>> {
    let message = "Please check body. 'sourceUserId', 'sourceEventId' are required, 'baseAmount' is numeric and 'kind' should be stake or trade_win only.".to_owned();
    Json(ResponseData::new(RESPONSE_BAD_REQUEST, message, None))
}

#[catch(404)]
async fn referral_earnings_bad_data() -> Json<ResponseData<String>> {
    let message = "Please check params. 'user_id' is required. 'level', 'from', 'to', 'page' & 'limit' are numeric.".to_owned();
    Json(ResponseData::new(RESPONSE_BAD_REQUEST, message, None))
}

/// Builds the engine once the database pool is up, so every request shares
/// one set of event locks.
fn referral_engine(engine_config: EngineConfig) -> AdHoc {
    AdHoc::try_on_ignite("Referral Engine", |rocket| async move {
        let conn = match Db::fetch(&rocket) {
            Some(db) => db.connection(),
            None => {
                error!("Database pool is not initialised, referral engine not started");
                return Err(rocket);
            }
        };
        info!(
            "Referral engine started with {} commission levels, max depth {}",
            engine_config.table.depth(),
            engine_config.max_depth
        );
        let engine = ReferralEngine::new(engine_config, ReferralStores::sea_orm(conn));
        Ok(rocket.manage(engine))
    })
}

fn build(engine_config: EngineConfig) -> Rocket<Build> {
    rocket::build()
        .register("/commission_events", catchers![commission_event_bad_data])
        .register("/referral_earnings", catchers![referral_earnings_bad_data])
        .register("/", catchers![internal_error, bad_request])
        .attach(Db::init())
        .attach(referral_engine(engine_config))
        .attach(routes::mount())
        .mount("/", routes![health_ping])
}

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let service_config = Config::figment().extract::<ReferralServiceConfig>()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", &service_config.rust_log);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                format!("referral_web_api={}", &service_config.web_api_log).parse()?,
            ),
        )
        .with_span_events(FmtSpan::FULL)
        .init();

    let engine_config = EngineConfig::from_settings(&service_config.referral)?;
    let _rocket = build(engine_config).launch().await?;
    Ok(())
}
