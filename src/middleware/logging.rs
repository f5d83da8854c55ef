use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::fmt;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let request_id = Uuid::new_v4();
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    let elapsed = start.elapsed();

    match response.extensions().get::<Result<(), ApiError>>() {
        Some(Ok(())) => info!(
            %request_id,
            method = %method,
            uri = %uri,
            status = %status,
            elapsed = ?elapsed,
            "Processed request"
        ),
        Some(Err(value @ ApiError::Rejected(_))) => warn!(
            %request_id,
            method = %method,
            uri = %uri,
            status = %status,
            elapsed = ?elapsed,
            value = %value,
            "Rejected request"
        ),
        Some(Err(value)) => error!(
            %request_id,
            method = %method,
            uri = %uri,
            status = %status,
            elapsed = ?elapsed,
            value = %value,
            "Failed to process request"
        ),
        // Extractor rejections and unmatched routes never reach a handler.
        None => info!(
            %request_id,
            method = %method,
            uri = %uri,
            status = %status,
            elapsed = ?elapsed,
            "Processed request"
        ),
    }

    response
}

#[derive(Clone, Debug)]
pub enum ApiError {
    General(String),
    DbError(String),
    Rejected(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::General(value) => write!(f, "{value}"),
            ApiError::DbError(value) => write!(f, "Database error: {value}"),
            ApiError::Rejected(value) => write!(f, "Rejected: {value}"),
        }
    }
}

/// Attaches the handler outcome so the logging middleware can report it.
pub fn with_outcome<T: IntoResponse>(response: T, ext: Result<(), ApiError>) -> Response {
    let mut response = response.into_response();

    response.extensions_mut().insert(ext);

    response
}

/// Successful handler response.
pub fn to_response<T: IntoResponse>(response: T) -> Response {
    with_outcome(response, Ok(()))
}
