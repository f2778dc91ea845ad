use axum::extract::State;
use axum::{Json, Router, routing::get};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InfoEndpoints {
    pub sse: String,
    pub messages: String,
    pub health: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InfoResponse {
    pub name: String,
    pub version: String,
    pub transport: String,
    pub endpoints: InfoEndpoints,
    pub wordpress_configured: bool,
    pub auth_required: bool,
    pub active_sessions: usize,
}

/// Liveness only; WordPress reachability is not probed.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Gateway is up", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Gateway discovery document for MCP clients
#[utoipa::path(
    get,
    path = "/info",
    responses(
        (status = 200, description = "Gateway configuration summary", body = InfoResponse)
    ),
    tag = "system"
)]
pub async fn server_info(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        name: wp_mcp_runtime::MCP_SERVER_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        transport: "sse".to_string(),
        endpoints: InfoEndpoints {
            sse: "/sse".to_string(),
            messages: "/messages".to_string(),
            health: "/health".to_string(),
        },
        wordpress_configured: state.wordpress.is_some(),
        auth_required: state.gate.is_protected(),
        active_sessions: state.sessions.len(),
    })
}
