use serde::Serialize;
use utoipa::ToSchema;

/// Structured error body returned by the gateway's HTTP surface.
/// Agents read `error` for the category and `message` for the detail.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    /// Machine-readable error code (e.g. "unauthorized", "session_not_found")
    pub error: String,
    /// Human/agent-readable description of what went wrong
    pub message: String,
    /// Which field caused the error (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Request ID for tracing and debugging
    pub request_id: String,
    /// Hint about what the correct usage looks like
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
}

/// Error codes shared by the gateway and the tool runtime
pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const NOT_FOUND: &str = "not_found";
    pub const SESSION_NOT_FOUND: &str = "session_not_found";
    pub const INTERNAL_ERROR: &str = "internal_error";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const FORBIDDEN: &str = "forbidden";
    pub const UPSTREAM_ERROR: &str = "upstream_error";
    pub const CONNECTION_ERROR: &str = "connection_error";
    pub const WORDPRESS_NOT_CONFIGURED: &str = "wordpress_not_configured";
}
