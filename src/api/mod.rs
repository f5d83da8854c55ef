pub mod admin;
pub mod extract;
pub mod public;
pub mod user;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn,
    Extension, Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::mailer::Mailer;
use crate::middleware::logging::logging_middleware;

use admin::admin_api_router;
use public::public_api_router;
use user::user_api_router;

/// Collaborators every handler can reach through `Extension`.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<Config>,
    pub mailer: Arc<dyn Mailer>,
}

pub fn create_api_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .nest(
            "/api",
            public_api_router().merge(user_api_router(&state)),
        )
        .nest("/api/admin", admin_api_router(&state))
        .layer(Extension(state.db))
        .layer(Extension(state.config))
        .layer(Extension(state.mailer))
        .layer(from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    match config
        .cors_origin
        .as_deref()
        .and_then(|origin| origin.parse::<HeaderValue>().ok())
    {
        Some(origin) => layer.allow_origin(origin),
        None => layer,
    }
}
