use axum::{
    extract::{Extension, Path, Query},
    response::Response,
    routing::get,
    Json, Router,
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::api::extract::AppJson;
use crate::entities::order::Status;
use crate::error::{AppError, AppResult};
use crate::middleware::logging::to_response;
use crate::services::orders::{self, OrderScope};

pub fn admin_order_router() -> Router {
    Router::new()
        .route("/orders", get(admin_get_orders))
        .route("/orders/:id", get(admin_get_order).patch(patch_order))
}

async fn admin_get_orders(
    Query(params): Query<GetOrdersQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> AppResult<Response> {
    let status = match params.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(all) if all.eq_ignore_ascii_case("all") => None,
        Some(raw) => Some(parse_status(raw)?),
    };

    let scope = OrderScope {
        status,
        ..Default::default()
    };
    let orders = orders::list_orders(&*db, scope).await?;

    Ok(to_response(Json(json!({ "orders": orders }))))
}

async fn admin_get_order(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> AppResult<Response> {
    match orders::order_details(&*db, id, OrderScope::default()).await? {
        Some(order) => Ok(to_response(Json(json!({ "order": order })))),
        None => Err(AppError::NotFound("Order not found".into())),
    }
}

async fn patch_order(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    AppJson(payload): AppJson<PatchOrderPayload>,
) -> AppResult<Response> {
    let status = parse_status(payload.status.as_deref().unwrap_or_default())?;

    let txn = db.begin().await?;
    let order = orders::update_status(&txn, id, status, payload.notes).await?;
    txn.commit().await?;

    Ok(to_response(Json(json!({ "order": order }))))
}

fn parse_status(raw: &str) -> AppResult<Status> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Validation("Invalid status".into()))
}

#[derive(Deserialize)]
struct GetOrdersQuery {
    status: Option<String>,
}

#[derive(Deserialize)]
struct PatchOrderPayload {
    status: Option<String>,
    notes: Option<String>,
}
