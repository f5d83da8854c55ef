use axum::{
    extract::Extension,
    http::StatusCode,
    response::Response,
    routing::post,
    Json, Router,
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::api::extract::AppJson;
use crate::config::Config;
use crate::error::AppResult;
use crate::mailer::Mailer;
use crate::middleware::logging::to_response;
use crate::services::accounts::{self, NewAccount, TOKEN_REGEX};

pub fn auth_router() -> Router {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/verify", post(verify))
        .route("/auth/login", post(login))
}

async fn register(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(config): Extension<Arc<Config>>,
    Extension(mailer): Extension<Arc<dyn Mailer>>,
    AppJson(payload): AppJson<RegisterPayload>,
) -> AppResult<Response> {
    payload.validate()?;

    let txn = db.begin().await?;
    let user = accounts::register(&txn, mailer.as_ref(), &config.app_url, payload.into()).await?;
    txn.commit().await?;

    info!(user_id = user.id, "Registered new account");

    Ok(to_response((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful. Please check your email to verify your account.",
            "userId": user.id
        })),
    )))
}

async fn verify(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    AppJson(payload): AppJson<VerifyPayload>,
) -> AppResult<Response> {
    payload.validate()?;

    let token = payload.token.unwrap_or_default();
    accounts::verify_email(&*db, &token).await?;

    Ok(to_response(Json(json!({
        "message": "Email verified successfully"
    }))))
}

async fn login(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(config): Extension<Arc<Config>>,
    AppJson(payload): AppJson<LoginPayload>,
) -> AppResult<Response> {
    payload.validate()?;

    let token = accounts::login(&*db, &config.secret, &payload.email, &payload.password).await?;

    Ok(to_response(Json(json!({ "token": token }))))
}

#[derive(Deserialize, Validate)]
struct RegisterPayload {
    #[validate(
        required(message = "Name, email, and password are required"),
        length(min = 1, message = "Name, email, and password are required")
    )]
    name: Option<String>,
    #[validate(
        required(message = "Name, email, and password are required"),
        email(message = "Invalid email address")
    )]
    email: Option<String>,
    #[validate(
        required(message = "Name, email, and password are required"),
        length(min = 6, message = "Password must be at least 6 characters long")
    )]
    password: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    city: Option<String>,
}

impl From<RegisterPayload> for NewAccount {
    fn from(payload: RegisterPayload) -> Self {
        NewAccount {
            name: payload.name.unwrap_or_default().trim().to_owned(),
            email: payload.email.unwrap_or_default(),
            password: payload.password.unwrap_or_default(),
            phone: payload.phone,
            address: payload.address,
            city: payload.city,
        }
    }
}

#[derive(Deserialize, Validate)]
struct VerifyPayload {
    #[validate(
        required(message = "Verification token is required"),
        regex(path = *TOKEN_REGEX, message = "Invalid verification token")
    )]
    token: Option<String>,
}

#[derive(Deserialize, Validate)]
struct LoginPayload {
    #[validate(length(min = 1, message = "Email and password are required"))]
    email: String,
    #[validate(length(min = 1, message = "Email and password are required"))]
    password: String,
}
