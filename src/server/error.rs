//! Error types for the server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::error::ChurnError;

pub const MODEL_UNAVAILABLE_MESSAGE: &str =
    "Model or preprocessor not loaded. Check /health endpoint for status.";

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Prediction failed: {0}")]
    Prediction(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ChurnError> for ServerError {
    fn from(err: ChurnError) -> Self {
        if err.is_model_unavailable() {
            return ServerError::ModelUnavailable(err.to_string());
        }
        match err {
            ChurnError::UnsupportedSchema(msg) | ChurnError::ValidationFailure(msg) => {
                ServerError::BadRequest(msg)
            }
            ChurnError::FeatureNotFound(column) => {
                ServerError::BadRequest(format!("missing feature column: {}", column))
            }
            other => ServerError::Prediction(other.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::ModelUnavailable(detail) => {
                tracing::warn!(detail = %detail, "Request rejected, model unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, MODEL_UNAVAILABLE_MESSAGE.to_string())
            }
            ServerError::Prediction(msg) => {
                tracing::error!(detail = %msg, "Prediction failed");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Prediction failed: {}", msg))
            }
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred".to_string())
            }
        };

        let body = Json(json!({
            "error": true,
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ServerError::from(ChurnError::NoTrainedModel), StatusCode::SERVICE_UNAVAILABLE),
            (ServerError::from(ChurnError::not_fitted("transform")), StatusCode::SERVICE_UNAVAILABLE),
            (
                ServerError::from(ChurnError::ValidationFailure("empty".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServerError::from(ChurnError::InferenceError("boom".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
