mod app;
mod config;
mod db;
mod dto;
mod error;
mod invoices;
mod memory;
mod products;
mod state;
mod users;

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "fibrus=debug,axum=info,tower_http=info".to_string());
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
    // A store that cannot be reached at startup is fatal.
    let state = AppState::init(config).await.map_err(|e| {
        tracing::error!(error = %e, "storage initialisation failed");
        e
    })?;

    let app = app::build_app(state.clone());
    app::serve(app, state).await
}
