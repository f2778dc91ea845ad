use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Browser-based MCP clients need `x-api-key` and `authorization` on both
/// the SSE request and the message POSTs.
///
/// An empty origin list falls back to `http://localhost:3000`; a literal
/// `*` allows any origin (credentials are then not advertised).
pub fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let origin_values: Vec<&str> = origins
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("authorization"),
            HeaderName::from_static("content-type"),
            HeaderName::from_static("x-api-key"),
        ])
        .max_age(std::time::Duration::from_secs(3600));

    if origin_values.contains(&"*") {
        return base.allow_origin(AllowOrigin::any());
    }

    let parsed: Vec<HeaderValue> = if origin_values.is_empty() {
        vec![HeaderValue::from_static("http://localhost:3000")]
    } else {
        origin_values
            .into_iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "ignoring unparsable CORS origin");
                    None
                }
            })
            .collect()
    };

    base.allow_origin(parsed).allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    use super::*;

    async fn preflight(origins: &[String], origin: &'static str) -> axum::response::Response {
        let app = Router::new()
            .route("/sse", get(|| async { StatusCode::OK }))
            .layer(build_cors_layer(origins));
        app.oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/sse")
                .header("origin", origin)
                .header("access-control-request-method", "GET")
                .header("access-control-request-headers", "x-api-key")
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("request should succeed")
    }

    #[tokio::test]
    async fn listed_origin_may_send_api_key_header() {
        let origins = vec!["https://agent.example".to_string()];
        let response = preflight(&origins, "https://agent.example").await;
        let headers = response.headers();
        assert_eq!(
            headers.get("access-control-allow-origin").unwrap(),
            "https://agent.example"
        );
        let allowed = headers
            .get("access-control-allow-headers")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(allowed.contains("x-api-key"));
    }

    #[tokio::test]
    async fn unlisted_origin_gets_no_allow_origin() {
        let response = preflight(&[], "https://elsewhere.example").await;
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn wildcard_allows_any_origin() {
        let response = preflight(&["*".to_string()], "https://elsewhere.example").await;
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
    }
}
