pub mod auth;
pub mod order;
pub mod product;

use axum::Router;

use auth::auth_router;
use order::order_router;
use product::product_router;

pub fn public_api_router() -> Router {
    Router::new()
        .merge(auth_router())
        .merge(order_router())
        .merge(product_router())
}
