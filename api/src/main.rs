use std::future::Future;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use clap::Parser;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use wp_mcp_runtime::WordPressArgs;

mod error;
mod gate;
mod middleware;
mod routes;
mod sessions;
mod state;
mod transport;

use gate::AccessGate;
use sessions::SessionRegistry;
use state::AppState;
use transport::SseTransport;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "WordPress MCP Gateway",
        version = "0.1.0",
        description = "Exposes WordPress content management as MCP tools over HTTP+SSE."
    ),
    paths(
        routes::health::health_check,
        routes::health::server_info,
        routes::mcp_sse::open_stream,
        routes::mcp_sse::post_message,
    ),
    components(schemas(
        routes::health::HealthResponse,
        routes::health::InfoResponse,
        routes::health::InfoEndpoints,
        wp_mcp_core::error::ApiError,
    )),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_key",
            utoipa::openapi::security::SecurityScheme::ApiKey(
                utoipa::openapi::security::ApiKey::Header(
                    utoipa::openapi::security::ApiKeyValue::new("x-api-key"),
                ),
            ),
        );
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "wp-mcp-api",
    version,
    about = "WordPress MCP gateway over HTTP+SSE"
)]
struct Config {
    /// Interface to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: std::net::IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Shared secret required on /sse and /messages; unset leaves them open
    #[arg(long, env = "MCP_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Allowed browser origins, comma separated ("*" for any)
    #[arg(long, env = "WP_MCP_CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Vec<String>,

    /// Redirect requests that arrive as plain HTTP behind a proxy
    #[arg(long, env = "WP_MCP_REQUIRE_HTTPS")]
    require_https: bool,

    #[command(flatten)]
    wordpress: WordPressArgs,
}

async fn openapi_json() -> axum::Json<utoipa::openapi::OpenApi> {
    axum::Json(ApiDoc::openapi())
}

fn build_router(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/api-doc/openapi.json", get(openapi_json))
        .merge(routes::health::router())
        .merge(routes::mcp_sse::router(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .option_layer(config.require_https.then(|| {
                    axum::middleware::from_fn(middleware::https::require_https)
                }))
                .layer(middleware::cors::build_cors_layer(&config.cors_origins))
                .layer(axum::middleware::from_fn(middleware::security_headers::apply)),
        )
        .with_state(state)
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

/// Resolves after `signal`, once every session is closed. Closing ends the
/// open event streams so graceful shutdown can drain their connections.
async fn close_sessions_on(
    signal: impl Future<Output = ()>,
    sessions: Arc<SessionRegistry<SseTransport>>,
) {
    signal.await;
    let closed = sessions.close_all();
    tracing::info!(closed_sessions = closed, "closed open MCP sessions");
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();
    let config = Config::parse();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "wp_mcp_api=debug,wp_mcp_runtime=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let wordpress = match config.wordpress.build_client() {
        Ok(client) => client,
        Err(err) => {
            tracing::error!(error = %err, "invalid WordPress configuration");
            return ExitCode::FAILURE;
        }
    };
    match &wordpress {
        Some(client) => tracing::info!(site_url = %client.site_url(), "WordPress client configured"),
        None => tracing::warn!(
            "WORDPRESS_SITE_URL, WORDPRESS_USERNAME or WORDPRESS_APP_PASSWORD missing; tools will fail until configured"
        ),
    }

    let gate = AccessGate::from_secret(config.api_key.clone());
    if !gate.is_protected() {
        tracing::warn!("MCP_API_KEY not set; /sse and /messages are open to anyone who can reach this port");
    }

    let app_state = AppState::new(gate, wordpress);
    let sessions = app_state.sessions.clone();
    let app = build_router(app_state, &config);

    let addr = SocketAddr::new(config.host, config.port);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%addr, error = %err, "failed to bind");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("WordPress MCP gateway listening on {}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(close_sessions_on(ctrl_c(), sessions))
        .await;
    tracing::info!("gateway stopped");

    match served {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "server error");
            ExitCode::FAILURE
        }
    }
}
