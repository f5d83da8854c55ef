use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::post,
    Json, Router,
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::config::Config;
use crate::api::extract::AppJson;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::optional_claims;
use crate::middleware::logging::to_response;
use crate::services::orders::{self, Customer, NewOrder, OrderLine};

pub fn order_router() -> Router {
    Router::new().route("/orders", post(create_order))
}

/// Checkout for both signed-in customers and guests.
async fn create_order(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(config): Extension<Arc<Config>>,
    headers: HeaderMap,
    AppJson(payload): AppJson<CreateOrderPayload>,
) -> AppResult<Response> {
    payload.validate()?;

    // Resolved before the transaction starts, the pool may hold one connection.
    let claims = optional_claims(&*db, &config.secret, &headers).await?;

    let customer = match claims {
        Some(claims) => Customer::Session(claims.user_id),
        None => match payload.customer_email {
            Some(email) if !email.trim().is_empty() => Customer::Guest {
                name: payload.customer_name,
                email,
            },
            _ => {
                return Err(AppError::Validation(
                    "Customer email is required for guest orders".into(),
                ))
            }
        },
    };

    let new = NewOrder {
        items: payload.items.unwrap_or_default(),
        address: payload.address.unwrap_or_default(),
        phone: payload.phone.unwrap_or_default(),
        notes: payload.notes,
    };

    let txn = db.begin().await?;
    let placed = orders::place_order(&txn, customer, new).await?;
    txn.commit().await?;

    Ok(to_response((StatusCode::CREATED, Json(placed))))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateOrderPayload {
    items: Option<Vec<OrderLine>>,
    address: Option<String>,
    phone: Option<String>,
    notes: Option<String>,
    customer_name: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    customer_email: Option<String>,
}
