use std::convert::Infallible;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Router, middleware};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::error::AppError;
use crate::gate::require_access;
use crate::sessions::{SessionGuard, Transport};
use crate::state::AppState;
use crate::transport::SseTransport;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/sse", get(open_stream))
        .route("/messages", post(post_message))
        .route_layer(middleware::from_fn_with_state(state, require_access))
}

/// Open an MCP session. The first event names the endpoint for client
/// messages; every later event carries one JSON-RPC response.
#[utoipa::path(
    get,
    path = "/sse",
    responses(
        (status = 200, description = "Event stream (text/event-stream)"),
        (status = 401, description = "API key required", body = wp_mcp_core::error::ApiError),
        (status = 403, description = "Invalid API key", body = wp_mcp_core::error::ApiError)
    ),
    security(("api_key" = [])),
    tag = "mcp"
)]
pub async fn open_stream(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let (transport, outbound) = SseTransport::new(state.wordpress.clone());
    let endpoint = transport.endpoint();
    let session_id = transport.session_id().to_string();
    state.sessions.open(transport)?;

    let guard = SessionGuard::new(state.sessions.clone(), session_id);
    let first = stream::once(async move { Ok(Event::default().event("endpoint").data(endpoint)) });
    let messages = UnboundedReceiverStream::new(outbound).map(move |message| {
        // The stream owns the guard; dropping the connection closes the session.
        let _session = &guard;
        Ok(Event::default().event("message").data(message.to_string()))
    });

    Ok(Sse::new(first.chain(messages)).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL)))
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Deliver one JSON-RPC message to an open session. The reply arrives on
/// that session's event stream.
#[utoipa::path(
    post,
    path = "/messages",
    params(("sessionId" = String, Query, description = "Id announced by the endpoint event")),
    request_body(content = String, content_type = "application/json", description = "One JSON-RPC message or batch"),
    responses(
        (status = 202, description = "Accepted; response follows on the stream"),
        (status = 400, description = "Missing session id or malformed JSON", body = wp_mcp_core::error::ApiError),
        (status = 404, description = "Unknown or closed session", body = wp_mcp_core::error::ApiError)
    ),
    security(("api_key" = [])),
    tag = "mcp"
)]
pub async fn post_message(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let session_id = query
        .session_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::validation("Missing sessionId query parameter", Some("sessionId")))?;

    let message: Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::validation(format!("Invalid JSON body: {e}"), None))?;

    let method = message.get("method").and_then(Value::as_str).unwrap_or("-");
    tracing::debug!(session_id = %session_id, method = %method, "routing MCP message");
    state.sessions.route(&session_id, message).await?;
    Ok(StatusCode::ACCEPTED)
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::gate::AccessGate;

    fn app(state: AppState) -> Router {
        router(state.clone()).with_state(state)
    }

    fn post_request(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request should build")
    }

    fn get_sse(key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/sse");
        if let Some(key) = key {
            builder = builder.header("x-api-key", key);
        }
        builder.body(Body::empty()).expect("request should build")
    }

    /// Split one SSE frame into (event, data).
    fn parse_frame(frame: &str) -> (String, String) {
        let mut event = String::new();
        let mut data = String::new();
        for line in frame.lines() {
            if let Some(value) = line.strip_prefix("event:") {
                event = value.trim().to_string();
            } else if let Some(value) = line.strip_prefix("data:") {
                data = value.trim().to_string();
            }
        }
        (event, data)
    }

    #[tokio::test]
    async fn stream_announces_endpoint_and_relays_responses() {
        let state = AppState::new(AccessGate::Open, None);
        let response = app(state.clone()).oneshot(get_sse(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "text/event-stream"
        );

        let mut body = response.into_body().into_data_stream();
        let frame = body.next().await.unwrap().unwrap();
        let (event, endpoint) = parse_frame(std::str::from_utf8(&frame).unwrap());
        assert_eq!(event, "endpoint");
        assert!(endpoint.starts_with("/messages?sessionId="));
        assert_eq!(state.sessions.len(), 1);

        let accepted = app(state.clone())
            .oneshot(post_request(
                &endpoint,
                r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(accepted.status(), StatusCode::ACCEPTED);

        let frame = body.next().await.unwrap().unwrap();
        let (event, data) = parse_frame(std::str::from_utf8(&frame).unwrap());
        assert_eq!(event, "message");
        let payload: Value = serde_json::from_str(&data).unwrap();
        assert_eq!(payload, json!({ "jsonrpc": "2.0", "id": 1, "result": {} }));

        drop(body);
        assert_eq!(state.sessions.len(), 0);
        let gone = app(state)
            .oneshot(post_request(
                &endpoint,
                r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn closing_the_session_ends_the_stream() {
        let state = AppState::new(AccessGate::Open, None);
        let response = app(state.clone()).oneshot(get_sse(None)).await.unwrap();
        let mut body = response.into_body().into_data_stream();
        let frame = body.next().await.unwrap().unwrap();
        let (_, endpoint) = parse_frame(std::str::from_utf8(&frame).unwrap());
        let session_id = endpoint.trim_start_matches("/messages?sessionId=");

        assert!(state.sessions.close(session_id));
        let next = tokio::time::timeout(Duration::from_secs(5), body.next())
            .await
            .expect("stream should end once the session is closed");
        assert!(next.is_none());
    }

    #[tokio::test]
    async fn post_validates_session_and_body() {
        let state = AppState::new(AccessGate::Open, None);

        let missing = app(state.clone())
            .oneshot(post_request("/messages", "{}"))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

        let unknown = app(state.clone())
            .oneshot(post_request("/messages?sessionId=nope", "{}"))
            .await
            .unwrap();
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(unknown.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "session_not_found");

        let invalid = app(state)
            .oneshot(post_request("/messages?sessionId=nope", "{not json"))
            .await
            .unwrap();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn gate_protects_both_endpoints() {
        let state = AppState::new(AccessGate::from_secret(Some("S".to_string())), None);

        let anonymous = app(state.clone()).oneshot(get_sse(None)).await.unwrap();
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let wrong = app(state.clone()).oneshot(get_sse(Some("wrong"))).await.unwrap();
        assert_eq!(wrong.status(), StatusCode::FORBIDDEN);

        let unauthenticated_post = app(state.clone())
            .oneshot(post_request("/messages?sessionId=x", "{}"))
            .await
            .unwrap();
        assert_eq!(unauthenticated_post.status(), StatusCode::UNAUTHORIZED);

        let allowed = app(state.clone()).oneshot(get_sse(Some("S"))).await.unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);
        drop(allowed);
        assert_eq!(state.sessions.len(), 0);
    }
}
