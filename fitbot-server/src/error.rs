use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use fitbot_core::TurnError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Turn(#[from] TurnError),

    #[error("invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

const OPAQUE_INTERNAL: &str = "Internal server error";

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Turn(TurnError::EmptyMessage) => {
                (StatusCode::BAD_REQUEST, "Message is required".to_owned())
            }
            ApiError::InvalidBody(rejection) => (StatusCode::BAD_REQUEST, rejection.body_text()),
            ApiError::Turn(err @ TurnError::Upstream(_)) => (StatusCode::BAD_GATEWAY, err.to_string()),
            ApiError::Turn(TurnError::Internal(source)) => {
                error!(?source, "turn failed");
                (StatusCode::INTERNAL_SERVER_ERROR, OPAQUE_INTERNAL.to_owned())
            }
            ApiError::Internal(source) => {
                error!(?source, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, OPAQUE_INTERNAL.to_owned())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_message();
        (status, Json(ErrorBody { error })).into_response()
    }
}
