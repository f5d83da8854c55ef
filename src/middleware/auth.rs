use crate::config::Config;
use crate::entities::user::{Entity as UserEntity, Role};
use crate::error::AppError;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Session lifetime.
pub const TOKEN_TTL_HOURS: i64 = 24;

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(req.headers()) {
        Some(token) => token.to_owned(),
        None => return AppError::from(AuthMiddlewareError::MissingToken).into_response(),
    };

    match validate_token(&*state.db, &state.config.secret, &token, state.role).await {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(err) => {
            debug!(required = %state.role, "Rejected session: {err}");
            AppError::from(err).into_response()
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub role: Role,
    pub exp: usize,
}

#[derive(Clone, Debug)]
pub struct AuthState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<Config>,
    pub role: Role,
}

impl AuthState {
    pub fn new(db: Arc<DatabaseConnection>, config: Arc<Config>, role: Role) -> Self {
        Self { db, config, role }
    }
}

pub fn generate_token(secret: &str, user_id: i32, role: Role) -> Result<String, AuthMiddlewareError> {
    let exp = Utc::now()
        .checked_add_signed(Duration::hours(TOKEN_TTL_HOURS))
        .ok_or(AuthMiddlewareError::GenerationFail)?
        .timestamp() as usize;

    let claims = Claims { user_id, role, exp };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthMiddlewareError::GenerationFail)
}

pub async fn validate_token<C: ConnectionTrait>(
    db: &C,
    secret: &str,
    token: &str,
    req_role: Role,
) -> Result<Claims, AuthMiddlewareError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| AuthMiddlewareError::TokenExpired)?
    .claims;

    // The stored role wins over the one baked into the token.
    match UserEntity::find_by_id(claims.user_id).one(db).await {
        Ok(Some(user)) if user.role == claims.role && user.role.permits(req_role) => Ok(claims),
        Ok(_) => Err(AuthMiddlewareError::InvalidUserOrRole),
        Err(_) => Err(AuthMiddlewareError::InternalServerError),
    }
}

/// Session for routes that serve both guests and signed-in users.
/// A missing header is a guest; a present but invalid one is rejected.
pub async fn optional_claims<C: ConnectionTrait>(
    db: &C,
    secret: &str,
    headers: &HeaderMap,
) -> Result<Option<Claims>, AuthMiddlewareError> {
    if headers.get(header::AUTHORIZATION).is_none() {
        return Ok(None);
    }
    let token = bearer_token(headers).ok_or(AuthMiddlewareError::MissingToken)?;

    validate_token(db, secret, token, Role::Customer).await.map(Some)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[derive(Error, Debug)]
pub enum AuthMiddlewareError {
    #[error("Missing bearer token")]
    MissingToken,
    #[error("Invalid user id or role")]
    InvalidUserOrRole,
    #[error("Token expired")]
    TokenExpired,
    #[error("Failed to generate token")]
    GenerationFail,
    #[error("Internal server error")]
    InternalServerError,
}

impl From<AuthMiddlewareError> for AppError {
    fn from(err: AuthMiddlewareError) -> Self {
        match err {
            AuthMiddlewareError::GenerationFail | AuthMiddlewareError::InternalServerError => {
                AppError::Internal(err.to_string())
            }
            _ => AppError::Unauthorized("Unauthorized".into()),
        }
    }
}
