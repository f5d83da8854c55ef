use axum::{extract::Extension, response::Response, routing::get, Json, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::error::AppResult;
use crate::middleware::logging::to_response;
use crate::services::accounts::list_users;

pub fn admin_user_router() -> Router {
    Router::new().route("/users", get(get_users))
}

async fn get_users(Extension(db): Extension<Arc<DatabaseConnection>>) -> AppResult<Response> {
    Ok(to_response(Json(list_users(&*db).await?)))
}
