use axum::{
    extract::{Extension, Path},
    response::Response,
    routing::get,
    Json, Router,
};
use sea_orm::DatabaseConnection;
use serde_json::json;
use std::sync::Arc;

use crate::entities::user::Role;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::Claims;
use crate::middleware::logging::to_response;
use crate::services::orders::{self, OrderScope};

pub fn user_order_router() -> Router {
    Router::new()
        .route("/orders", get(get_own_orders))
        .route("/orders/:id", get(get_own_order))
}

async fn get_own_orders(
    Extension(claims): Extension<Claims>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> AppResult<Response> {
    let scope = OrderScope {
        customer_id: Some(claims.user_id),
        ..Default::default()
    };

    Ok(to_response(Json(orders::list_orders(&*db, scope).await?)))
}

async fn get_own_order(
    Path(id): Path<i32>,
    Extension(claims): Extension<Claims>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> AppResult<Response> {
    let scope = OrderScope {
        customer_id: (claims.role != Role::Admin).then_some(claims.user_id),
        ..Default::default()
    };

    match orders::order_details(&*db, id, scope).await? {
        Some(order) => Ok(to_response(Json(json!({ "order": order })))),
        None => Err(AppError::NotFound("Order not found".into())),
    }
}
