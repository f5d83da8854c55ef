pub mod order;
pub mod product;
pub mod stats;
pub mod user;

use axum::{middleware::from_fn_with_state, Router};

use crate::api::AppState;
use crate::entities::user::Role;
use crate::middleware::auth::{auth_middleware, AuthState};

use order::admin_order_router;
use product::admin_product_router;
use stats::stats_router;
use user::admin_user_router;

pub fn admin_api_router(state: &AppState) -> Router {
    Router::new()
        .merge(admin_order_router())
        .merge(admin_product_router())
        .merge(stats_router())
        .merge(admin_user_router())
        .layer(from_fn_with_state(
            AuthState::new(state.db.clone(), state.config.clone(), Role::Admin),
            auth_middleware,
        ))
}
