use axum::{
    extract::{Extension, Path, Query},
    response::Response,
    routing::get,
    Json, Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::middleware::logging::to_response;
use crate::services::products::{self, ProductFilters};

pub fn product_router() -> Router {
    Router::new()
        .route("/products", get(get_products))
        .route("/products/:id", get(get_product))
}

async fn get_products(
    Query(filters): Query<ProductFilters>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Response {
    to_response(Json(products::list_products(&*db, &filters).await))
}

async fn get_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> AppResult<Response> {
    match products::find_product(&*db, id).await? {
        Some(product) => Ok(to_response(Json(product))),
        None => Err(AppError::NotFound("Product not found".into())),
    }
}
