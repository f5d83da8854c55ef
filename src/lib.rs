//! Gustul Casei marketplace back-end: home cooks list dishes, customers and
//! guests order them, admins approve products and move orders along.

pub mod api;
pub mod config;
pub mod entities;
pub mod error;
pub mod mailer;
pub mod middleware;
pub mod services;

pub use api::{create_api_router, AppState};
