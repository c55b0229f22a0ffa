//! HTTP-facing errors
//!
//! Every failure that happens before a body starts streaming is answered
//! with `{ "error": message }`.

use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use media_protocol::ErrorBody;
use media_relay::RelayError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("failed to render page: {0}")]
    Template(#[from] askama::Error),

    #[error("invalid query: {0}")]
    Query(#[from] QueryRejection),

    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Query(_) => StatusCode::BAD_REQUEST,
            AppError::Relay(RelayError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            AppError::Relay(_) | AppError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::info!("Rejected request: {}", self);
        }

        (status, Json(ErrorBody::new(self.to_string()))).into_response()
    }
}
