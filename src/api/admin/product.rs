use axum::{
    extract::Extension,
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::api::extract::AppJson;
use crate::error::{AppError, AppResult};
use crate::middleware::logging::to_response;
use crate::services::products::{self, NewProduct};

pub fn admin_product_router() -> Router {
    Router::new()
        .route("/products", post(create_product))
        .route("/products/pending", get(get_pending_products))
        .route("/products/approve", post(approve_product))
}

async fn create_product(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    AppJson(payload): AppJson<CreateProductPayload>,
) -> AppResult<Response> {
    payload.validate()?;

    let price = payload
        .price
        .as_ref()
        .ok_or_else(|| AppError::Validation("All fields are required".into()))?
        .value()
        .ok_or_else(|| AppError::Validation("Invalid price".into()))?;

    let new = NewProduct {
        name: payload.name.unwrap_or_default(),
        description: payload.description.unwrap_or_default(),
        price,
        currency: payload.currency,
        image: payload.image.unwrap_or_default(),
        category: payload.category.unwrap_or_default(),
        cook_id: payload.cook_id.unwrap_or_default(),
    };

    let txn = db.begin().await?;
    let product = products::create_product(&txn, new).await?;
    txn.commit().await?;

    info!(product_id = product.id, cook_id = product.cook_id, "Product submitted for approval");

    Ok(to_response((StatusCode::CREATED, Json(product))))
}

async fn get_pending_products(
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> AppResult<Response> {
    Ok(to_response(Json(products::pending_products(&*db).await?)))
}

async fn approve_product(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    AppJson(payload): AppJson<ApprovePayload>,
) -> AppResult<Response> {
    let id = payload
        .product_id
        .ok_or_else(|| AppError::Validation("Product ID is required".into()))?;

    let product = products::approve_product(&*db, id).await?;

    Ok(to_response(Json(product)))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateProductPayload {
    #[validate(required(message = "All fields are required"), length(min = 1, message = "All fields are required"))]
    name: Option<String>,
    #[validate(required(message = "All fields are required"))]
    description: Option<String>,
    price: Option<PriceInput>,
    currency: Option<String>,
    #[validate(required(message = "All fields are required"))]
    image: Option<String>,
    #[validate(required(message = "All fields are required"), length(min = 1, message = "All fields are required"))]
    category: Option<String>,
    #[validate(required(message = "All fields are required"))]
    cook_id: Option<i32>,
}

/// Forms send the price either as a number or as text.
#[derive(Deserialize)]
#[serde(untagged)]
enum PriceInput {
    Number(f64),
    Text(String),
}

impl PriceInput {
    fn value(&self) -> Option<f64> {
        let value = match self {
            PriceInput::Number(value) => *value,
            PriceInput::Text(text) => text.trim().parse().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApprovePayload {
    product_id: Option<i32>,
}
