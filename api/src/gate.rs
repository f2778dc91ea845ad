use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;
use crate::state::AppState;

const API_KEY_HEADER: &str = "x-api-key";

/// Shared-secret check in front of the MCP endpoints.
#[derive(Clone, PartialEq, Eq)]
pub enum AccessGate {
    Open,
    Protected { secret: String },
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessGate::Open => f.write_str("Open"),
            AccessGate::Protected { .. } => f.write_str("Protected { secret: <redacted> }"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessDenied {
    #[error("API key required")]
    Unauthorized,
    #[error("Invalid API key")]
    Forbidden,
}

impl AccessGate {
    /// An absent or blank secret leaves the gateway open. A configured
    /// secret is compared exactly as given.
    pub fn from_secret(secret: Option<String>) -> Self {
        match secret {
            Some(secret) if !secret.trim().is_empty() => AccessGate::Protected { secret },
            _ => AccessGate::Open,
        }
    }

    pub fn is_protected(&self) -> bool {
        matches!(self, AccessGate::Protected { .. })
    }

    /// `X-API-Key` wins over `Authorization`; the latter may carry
    /// `Bearer <secret>` or the bare secret.
    pub fn check(&self, headers: &HeaderMap) -> Result<(), AccessDenied> {
        let AccessGate::Protected { secret } = self else {
            return Ok(());
        };
        let presented = header_str(headers, API_KEY_HEADER).or_else(|| {
            header_str(headers, AUTHORIZATION.as_str()).map(|raw| {
                match raw.split_once(' ') {
                    Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
                    _ => raw,
                }
            })
        });
        match presented {
            None => Err(AccessDenied::Unauthorized),
            Some(candidate) if constant_time_eq(candidate.as_bytes(), secret.as_bytes()) => Ok(()),
            Some(_) => Err(AccessDenied::Forbidden),
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0_u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Middleware for routes behind the gate.
pub async fn require_access(State(state): State<AppState>, req: Request, next: Next) -> Response {
    match state.gate.check(req.headers()) {
        Ok(()) => next.run(req).await,
        Err(denied) => {
            tracing::warn!(
                event = "access_denied",
                path = %req.uri().path(),
                reason = %denied,
                "MCP request rejected"
            );
            AppError::from(denied).into_response()
        }
    }
}
