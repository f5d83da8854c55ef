use axum::{
    extract::Extension,
    http::StatusCode,
    response::Response,
    routing::post,
    Json, Router,
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::api::extract::AppJson;
use crate::error::AppResult;
use crate::middleware::auth::Claims;
use crate::middleware::logging::to_response;
use crate::services::reviews::{self, NewReview};

pub fn review_router() -> Router {
    Router::new().route("/reviews", post(create_review))
}

async fn create_review(
    Extension(claims): Extension<Claims>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    AppJson(payload): AppJson<CreateReviewPayload>,
) -> AppResult<Response> {
    payload.validate()?;

    let new = NewReview {
        rating: payload.rating,
        comment: payload.comment,
        cook_id: payload.cook_id,
        product_id: payload.product_id,
    };

    let txn = db.begin().await?;
    let review = reviews::create_review(&txn, claims.user_id, new).await?;
    txn.commit().await?;

    Ok(to_response((StatusCode::CREATED, Json(review))))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateReviewPayload {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    rating: i32,
    #[validate(length(max = 2000, message = "Comment is too long"))]
    comment: Option<String>,
    cook_id: i32,
    product_id: Option<i32>,
}
