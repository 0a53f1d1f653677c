mod admin;
mod app;
mod auth;
mod authz;
mod config;
mod db;
mod error;
mod session;
mod state;
mod support;
mod todos;
mod views;

use crate::config::AppConfig;
use crate::db::PgStore;
use crate::session::SessionStore;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "helpdesk=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    let store = PgStore::connect(&config).await?;
    store.migrate().await?;

    let purged = store.purge_expired().await?;
    tracing::info!(purged, "expired sessions removed");

    if let Some(admin) = &config.admin {
        auth::services::ensure_admin(&store, &admin.username, &admin.password).await?;
    } else {
        tracing::warn!("ADMIN_USER/ADMIN_PASS not set; no admin account bootstrapped");
    }

    let state = AppState::init(config, store)?;
    app::serve(app::build_app(state)).await
}
