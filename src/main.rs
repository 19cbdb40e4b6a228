#[macro_use]
extern crate rocket;

mod api;
mod auth;
mod authoring;
mod compare;
mod config;
mod db;
mod error;
mod gate;
mod models;
mod sandbox;
mod seed;
mod telemetry;
#[cfg(test)]
mod test;
mod validation;

use anyhow::Context;
use api::{
    api_admin_create_task, api_admin_run_query, api_admin_tables, api_current_user, api_get_task,
    api_get_tasks, api_login_form, api_login_json, api_register, api_run_query,
    api_submit_solution, api_user_stats, health,
};
use auth::{
    bad_request, forbidden_api, internal_error_api, not_found_api, unauthorized_api,
    unprocessable_api,
};
use config::{AppConfig, ConfigError, load_environment};
use error::AppError;
use rocket::fairing::AdHoc;
use rocket::{Build, Rocket};
use sandbox::Sandbox;
use sqlx::SqlitePool;
use telemetry::{TelemetryFairing, init_tracing, shutdown_telemetry};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Anyhow(anyhow::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("Application error: {0}")]
    App(#[from] AppError),
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Error::Anyhow(value)
    }
}

/// Loads configuration, prepares both databases and seeds the built-in tasks.
async fn bootstrap() -> Result<(SqlitePool, Sandbox, AppConfig), Error> {
    load_environment()?;
    let config = AppConfig::from_env()?;
    init_tracing(&config)?;

    info!(environment = %config.environment, "Connecting to databases");
    let pool = SqlitePool::connect(&config.database_url)
        .await
        .with_context(|| format!("Failed to connect to {}", config.database_url))?;
    let sandbox_pool = SqlitePool::connect(&config.sandbox_database_url)
        .await
        .with_context(|| format!("Failed to connect to {}", config.sandbox_database_url))?;
    let sandbox = Sandbox::new(sandbox_pool);

    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations completed successfully");

    sandbox.bootstrap().await?;
    seed::seed_tasks(&pool, &sandbox).await?;
    if let Some(admin) = &config.seed_admin {
        seed::seed_admin(&pool, admin).await?;
    }

    Ok((pool, sandbox, config))
}

#[launch]
async fn rocket() -> _ {
    match bootstrap().await {
        Ok((pool, sandbox, config)) => init_rocket(pool, sandbox, config).await,
        Err(e) => {
            error!("Startup failed: {}", e);
            eprintln!("Startup failed: {}", e);
            std::process::exit(1);
        }
    }
}

pub async fn init_rocket(pool: SqlitePool, sandbox: Sandbox, config: AppConfig) -> Rocket<Build> {
    info!("Starting SQL trainer");

    rocket::build()
        .manage(pool)
        .manage(sandbox)
        .manage(config)
        .mount(
            "/api",
            routes![
                api_register,
                api_login_form,
                api_login_json,
                api_get_tasks,
                api_get_task,
                api_run_query,
                api_submit_solution,
                api_user_stats,
                api_current_user,
                api_admin_tables,
                api_admin_create_task,
                api_admin_run_query,
            ],
        )
        .register(
            "/api",
            catchers![
                bad_request,
                unauthorized_api,
                forbidden_api,
                not_found_api,
                unprocessable_api,
                internal_error_api,
            ],
        )
        .mount("/api", routes![health])
        .attach(TelemetryFairing)
        .attach(AdHoc::on_shutdown("Telemetry shutdown", |_| {
            Box::pin(async { shutdown_telemetry() })
        }))
}
