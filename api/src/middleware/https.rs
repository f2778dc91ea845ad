use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Redirect plain-HTTP requests seen behind a TLS-terminating proxy.
///
/// Only `X-Forwarded-Proto: http` triggers the redirect; a missing header is
/// treated as direct HTTPS. 308 keeps the method, so message POSTs survive.
pub async fn require_https(req: Request, next: Next) -> Response {
    if forwarded_proto(&req) == Some("http") {
        if let Some(location) = https_location(&req) {
            let mut response =
                (StatusCode::PERMANENT_REDIRECT, [("location", location.to_string())])
                    .into_response();
            add_hsts_header(&mut response);
            return response;
        }
    }

    let mut response = next.run(req).await;
    add_hsts_header(&mut response);
    response
}

fn forwarded_proto(req: &Request) -> Option<&str> {
    req.headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
}

fn https_location(req: &Request) -> Option<Uri> {
    let host = req
        .headers()
        .get("host")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    format!("https://{host}{path_and_query}").parse().ok()
}

fn add_hsts_header(response: &mut Response) {
    response.headers_mut().insert(
        "strict-transport-security",
        HeaderValue::from_static("max-age=63072000; includeSubDomains"),
    );
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::post;
    use axum::{Router, middleware};
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        Router::new()
            .route("/messages", post(|| async { StatusCode::ACCEPTED }))
            .layer(middleware::from_fn(require_https))
    }

    #[tokio::test]
    async fn forwarded_http_is_redirected_with_method_preserved() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/messages?sessionId=abc")
                    .header("host", "mcp.example.com")
                    .header("x-forwarded-proto", "http")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
        assert_eq!(
            response.headers().get("location").unwrap(),
            "https://mcp.example.com/messages?sessionId=abc"
        );
    }

    #[tokio::test]
    async fn https_requests_pass_through_with_hsts() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/messages")
                    .header("x-forwarded-proto", "https")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(response.headers().contains_key("strict-transport-security"));
    }
}
