use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use referral_db_migration::Migrator;
use sea_orm_migration::cli;
use serde::Deserialize;
use std::error::Error;

#[derive(Deserialize)]
struct MigrationConfig {
    database_url: Option<String>,
}

fn database_url(figment: Figment) -> Result<String, Box<dyn Error>> {
    let config: MigrationConfig = figment.extract()?;
    config
        .database_url
        .ok_or_else(|| "database_url missing from App.toml and DATABASE_URL is unset".into())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // the sea-orm cli only looks at DATABASE_URL, App.toml fills it in when unset
    if std::env::var("DATABASE_URL").is_err() {
        let url = database_url(
            Figment::new()
                .merge(Toml::file("App.toml"))
                .merge(Env::prefixed("REFERRAL_")),
        )?;
        std::env::set_var("DATABASE_URL", url);
    }

    cli::run_cli(Migrator).await;
    Ok(())
}
