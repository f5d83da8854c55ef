use axum::{extract::Extension, response::Response, routing::get, Json, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::error::AppResult;
use crate::middleware::logging::to_response;
use crate::services::stats::dashboard_stats;

pub fn stats_router() -> Router {
    Router::new().route("/stats", get(get_stats))
}

async fn get_stats(Extension(db): Extension<Arc<DatabaseConnection>>) -> AppResult<Response> {
    Ok(to_response(Json(dashboard_stats(&*db).await?)))
}
