use sea_orm::Database;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gustul_casei::config::Config;
use gustul_casei::entities::setup_schema;
use gustul_casei::mailer::LogMailer;
use gustul_casei::services::accounts::ensure_admin;
use gustul_casei::{create_api_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let db = Database::connect(config.database_url.as_str()).await?;
    setup_schema(&db).await?;

    if let Some(admin) = &config.admin {
        ensure_admin(&db, admin).await?;
    }

    let state = AppState {
        db: Arc::new(db),
        config: Arc::new(config),
        mailer: Arc::new(LogMailer),
    };

    let listener = tokio::net::TcpListener::bind(state.config.bind_addr.as_str()).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, create_api_router(state)).await?;

    Ok(())
}
