use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Every failure the pipeline and the HTTP layer can report.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    /// The model answered, but not with the JSON shape we asked for.
    /// `raw` is the untouched model output.
    #[error("AI response was not valid JSON: {reason}")]
    AiFormat { reason: String, raw: String },

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("{service} did not respond within {seconds}s")]
    Timeout { service: &'static str, seconds: u64 },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::AiFormat { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        let raw_response = match err {
            AppError::AiFormat { raw, .. } => Some(raw.clone()),
            _ => None,
        };
        Self {
            success: false,
            error: err.to_string(),
            raw_response,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {self}");
        } else {
            tracing::warn!("Request rejected: {self}");
        }

        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}
