use async_trait::async_trait;
use referral_engine::ReferralSettings;
use rocket::serde::Deserialize;
use rocket::Config;
use sea_orm::{ConnectOptions, DatabaseConnection, DbErr};
use sea_orm_rocket::{rocket::figment::Figment, Database};
use std::time::Duration;

#[derive(Database, Debug)]
#[database("sea_orm")]
pub struct Db(SeaOrmPool);

impl Db {
    pub fn connection(&self) -> DatabaseConnection {
        self.0.conn.clone()
    }
}

#[derive(Debug, Clone)]
pub struct SeaOrmPool {
    pub conn: sea_orm::DatabaseConnection,
}

#[async_trait]
impl sea_orm_rocket::Pool for SeaOrmPool {
    type Error = sea_orm::DbErr;

    type Connection = sea_orm::DatabaseConnection;

    async fn init(_figment: &Figment) -> Result<Self, Self::Error> {
        let config = Config::figment()
            .extract::<ReferralServiceConfig>()
            .map_err(|error| DbErr::Custom(format!("Invalid service config: {}", error)))?;
        let mut options: ConnectOptions = config.database_url.into();
        options
            .max_connections(config.sqlx_max_connections)
            .min_connections(config.sqlx_min_connections.unwrap_or(2))
            .connect_timeout(Duration::from_secs(
                config.sqlx_connect_timeout.unwrap_or(8),
            ))
            .idle_timeout(Duration::from_secs(config.sqlx_idle_timeout.unwrap_or(8)))
            .max_lifetime(Duration::from_secs(config.sqlx_max_lifetime.unwrap_or(8)))
            .sqlx_logging(config.sqlx_logging.unwrap_or(false))
            .sqlx_logging_level(
                match config
                    .web_api_sqlx_logging_level
                    .parse::<log::LevelFilter>()
                {
                    Ok(level) => level,
                    Err(_) => log::LevelFilter::Info,
                },
            );

        let conn = sea_orm::Database::connect(options).await?;

        Ok(SeaOrmPool { conn })
    }

    fn borrow(&self) -> &Self::Connection {
        &self.conn
    }
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ReferralServiceConfig {
    database_url: String,
    sqlx_max_connections: u32,
    sqlx_min_connections: Option<u32>,
    sqlx_connect_timeout: Option<u64>,
    sqlx_idle_timeout: Option<u64>,
    sqlx_max_lifetime: Option<u64>,
    sqlx_logging: Option<bool>,
    web_api_sqlx_logging_level: String,
    pub rust_log: String,
    pub web_api_log: String,
    #[serde(default)]
    pub referral: ReferralSettings,
}
