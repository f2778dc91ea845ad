use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use wp_mcp_core::error::{self, ApiError};

use crate::gate::AccessDenied;
use crate::sessions::SessionError;

/// Gateway error type that converts to structured API responses
#[derive(Debug)]
pub enum AppError {
    /// Missing credentials (401)
    Unauthorized,
    /// Wrong credentials (403)
    Forbidden,
    /// Unknown or closed MCP session (404)
    SessionNotFound { session_id: String },
    /// Malformed request (400)
    Validation {
        message: String,
        field: Option<String>,
        docs_hint: Option<String>,
    },
    /// Internal error (500)
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>, field: Option<&str>) -> Self {
        AppError::Validation {
            message: message.into(),
            field: field.map(str::to_string),
            docs_hint: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::now_v7().to_string();

        let (status, api_error) = match self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ApiError {
                    error: error::codes::UNAUTHORIZED.to_string(),
                    message: "API key required".to_string(),
                    field: None,
                    request_id,
                    docs_hint: Some(
                        "Send the key as 'X-API-Key: <key>' or 'Authorization: Bearer <key>'."
                            .to_string(),
                    ),
                },
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                ApiError {
                    error: error::codes::FORBIDDEN.to_string(),
                    message: "Invalid API key".to_string(),
                    field: None,
                    request_id,
                    docs_hint: None,
                },
            ),
            AppError::SessionNotFound { session_id } => (
                StatusCode::NOT_FOUND,
                ApiError {
                    error: error::codes::SESSION_NOT_FOUND.to_string(),
                    message: format!("No active session '{session_id}'"),
                    field: Some("sessionId".to_string()),
                    request_id,
                    docs_hint: Some(
                        "Open a stream with GET /sse and post to the endpoint it announces."
                            .to_string(),
                    ),
                },
            ),
            AppError::Validation {
                message,
                field,
                docs_hint,
            } => (
                StatusCode::BAD_REQUEST,
                ApiError {
                    error: error::codes::VALIDATION_FAILED.to_string(),
                    message,
                    field,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::Internal(msg) => {
                tracing::error!(request_id = %request_id, "Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError {
                        error: error::codes::INTERNAL_ERROR.to_string(),
                        message: "An internal error occurred".to_string(),
                        field: None,
                        request_id,
                        docs_hint: None,
                    },
                )
            }
        };

        (status, Json(api_error)).into_response()
    }
}

impl From<AccessDenied> for AppError {
    fn from(denied: AccessDenied) -> Self {
        match denied {
            AccessDenied::Unauthorized => AppError::Unauthorized,
            AccessDenied::Forbidden => AppError::Forbidden,
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(session_id) => AppError::SessionNotFound { session_id },
            other => AppError::Internal(other.to_string()),
        }
    }
}
