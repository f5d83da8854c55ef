pub mod order;
pub mod review;

use axum::{middleware::from_fn_with_state, Router};

use crate::api::AppState;
use crate::entities::user::Role;
use crate::middleware::auth::{auth_middleware, AuthState};
use order::user_order_router;
use review::review_router;

pub fn user_api_router(state: &AppState) -> Router {
    Router::new()
        .merge(user_order_router())
        .merge(review_router())
        .layer(from_fn_with_state(
            AuthState::new(state.db.clone(), state.config.clone(), Role::Customer),
            auth_middleware,
        ))
}
