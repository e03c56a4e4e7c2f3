//! Error types for the server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use forecast_core::ForecastError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Content-Type deve ser application/json")]
    UnsupportedMediaType,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Forecast(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            ServerError::Forecast(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(detail = %self, "Request failed");
        } else {
            tracing::debug!(detail = %self, "Rejected request");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
