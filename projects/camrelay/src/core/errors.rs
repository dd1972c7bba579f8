use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::v4l2::ControlError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyFormat {
    Text,
    Json,
}

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    format: BodyFormat,
}

impl AppError {
    /// Plain-text error body.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            format: BodyFormat::Text,
        }
    }

    /// `{"error": message}` body.
    pub fn api(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            format: BodyFormat::Json,
            ..Self::new(status, message)
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not Found")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::internal(value.to_string())
    }
}

impl From<ControlError> for AppError {
    fn from(value: ControlError) -> Self {
        let status = match &value {
            ControlError::NoDevices => StatusCode::SERVICE_UNAVAILABLE,
            ControlError::UnknownCamera(_) => StatusCode::NOT_FOUND,
            ControlError::Invalid(_) => StatusCode::BAD_REQUEST,
            ControlError::CommandFailed(_) | ControlError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::api(status, format!("{value:#}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.format {
            BodyFormat::Text => (self.status, self.message).into_response(),
            BodyFormat::Json => {
                (self.status, Json(json!({ "error": self.message }))).into_response()
            }
        }
    }
}
