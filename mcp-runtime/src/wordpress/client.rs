use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use wp_mcp_core::auth::{Credential, basic_auth_header};

use super::error::WpError;
use super::pagination::{PageInfo, Paginated};

/// Versioned REST prefix appended to the site root.
pub const API_PREFIX: &str = "/wp-json/wp/v2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMethod {
    Get,
    Post,
    Delete,
}

impl ApiMethod {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            ApiMethod::Get => reqwest::Method::GET,
            ApiMethod::Post => reqwest::Method::POST,
            ApiMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Binary payload for the media endpoint plus its optional text fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub title: Option<String>,
    pub caption: Option<String>,
    pub alt_text: Option<String>,
    pub description: Option<String>,
    /// Parent post; WordPress accepts it on the create request.
    pub post: Option<u64>,
}

impl MediaUpload {
    fn into_form(self) -> Result<Form, WpError> {
        let part = Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.mime_type)
            .map_err(|e| WpError::InvalidRequest(format!("invalid mime type: {e}")))?;
        let mut form = Form::new().part("file", part);
        for (name, value) in [
            ("title", self.title),
            ("caption", self.caption),
            ("alt_text", self.alt_text),
            ("description", self.description),
        ] {
            if let Some(value) = value {
                form = form.text(name, value);
            }
        }
        if let Some(post) = self.post {
            form = form.text("post", post.to_string());
        }
        Ok(form)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Multipart(MediaUpload),
}

/// One REST call. Built per tool invocation and consumed by [`WpClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub target: String,
    pub method: ApiMethod,
    pub body: Option<RequestBody>,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn get(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            method: ApiMethod::Get,
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn post(target: impl Into<String>, body: Value) -> Self {
        Self {
            target: target.into(),
            method: ApiMethod::Post,
            body: Some(RequestBody::Json(body)),
            headers: Vec::new(),
        }
    }

    pub fn delete(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            method: ApiMethod::Delete,
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn upload(target: impl Into<String>, upload: MediaUpload) -> Self {
        Self {
            target: target.into(),
            method: ApiMethod::Post,
            body: Some(RequestBody::Multipart(upload)),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Authenticated executor for the WordPress REST API.
///
/// Holds a pooled HTTP client and the precomputed Basic auth header; nothing
/// else changes between calls, so one instance is shared across sessions.
#[derive(Clone)]
pub struct WpClient {
    http: reqwest::Client,
    site_url: String,
    api_base: String,
    auth_header: HeaderValue,
}

impl std::fmt::Debug for WpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WpClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl WpClient {
    pub fn new(site_url: &str, credential: &Credential) -> Result<Self, WpError> {
        let site_url = site_url.trim().trim_end_matches('/').to_string();
        let parsed = url::Url::parse(&site_url)
            .map_err(|e| WpError::InvalidConfig(format!("site URL '{site_url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(WpError::InvalidConfig(format!(
                "site URL '{site_url}' must use http or https"
            )));
        }
        let mut auth_header = HeaderValue::from_str(&basic_auth_header(credential))
            .map_err(|e| WpError::InvalidConfig(format!("credential header: {e}")))?;
        auth_header.set_sensitive(true);

        Ok(Self {
            http: crate::util::client(),
            api_base: format!("{site_url}{API_PREFIX}"),
            site_url,
            auth_header,
        })
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Absolute targets pass through; anything else hangs off the API base.
    pub fn resolve_url(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            target.to_string()
        } else {
            format!("{}/{}", self.api_base, target.trim_start_matches('/'))
        }
    }

    pub async fn execute(&self, request: ApiRequest) -> Result<Value, WpError> {
        let (body, _) = self.send(request).await?;
        Ok(body)
    }

    pub async fn execute_with_metadata(&self, request: ApiRequest) -> Result<Paginated, WpError> {
        let (body, headers) = self.send(request).await?;
        Ok(Paginated {
            body,
            page: PageInfo::from_headers(&headers),
        })
    }

    async fn send(&self, request: ApiRequest) -> Result<(Value, HeaderMap), WpError> {
        let url = self.resolve_url(&request.target);
        let method = request.method;
        let multipart = matches!(request.body, Some(RequestBody::Multipart(_)));
        let json = matches!(request.body, Some(RequestBody::Json(_)));

        let mut builder = self
            .http
            .request(method.as_reqwest(), &url)
            .headers(self.request_headers(&request.headers, json, multipart));
        builder = match request.body {
            Some(RequestBody::Json(value)) => builder.json(&value),
            Some(RequestBody::Multipart(upload)) => builder.multipart(upload.into_form()?),
            None => builder,
        };

        tracing::debug!(method = ?method, url = %url, "wordpress request");
        let response = builder.send().await.map_err(|source| WpError::Transport {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        // Always drain the body first so error responses keep the server's message.
        let text = response.text().await.map_err(|source| WpError::Transport {
            url: url.clone(),
            source,
        })?;

        if !status.is_success() {
            let err = WpError::from_error_body(status.as_u16(), &text);
            tracing::warn!(
                method = ?method,
                url = %url,
                status = status.as_u16(),
                error = %err,
                "wordpress request failed"
            );
            return Err(err);
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| WpError::Decode {
                status: status.as_u16(),
                message: format!("response body is not JSON: {e}"),
            })?
        };
        Ok((body, headers))
    }

    fn request_headers(&self, extra: &[(String, String)], json: bool, multipart: bool) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if json {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        for (name, value) in extra {
            let parsed = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            );
            match parsed {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "skipping invalid request header"),
            }
        }
        if multipart {
            // reqwest supplies the multipart boundary.
            headers.remove(CONTENT_TYPE);
        }
        headers.insert(AUTHORIZATION, self.auth_header.clone());
        headers
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::body::Bytes;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use serde_json::json;

    use super::*;

    /// Serve `router` on an ephemeral local port and return its root URL.
    pub(crate) async fn spawn_site(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("test server");
        });
        format!("http://{addr}")
    }

    pub(crate) fn test_client(site: &str) -> WpClient {
        WpClient::new(site, &Credential::new("admin", "pw")).expect("client should build")
    }

    #[test]
    fn resolve_url_joins_relative_targets_to_api_base() {
        let client = test_client("https://example.com/");
        assert_eq!(client.api_base(), "https://example.com/wp-json/wp/v2");
        assert_eq!(
            client.resolve_url("/posts?page=2"),
            "https://example.com/wp-json/wp/v2/posts?page=2"
        );
        assert_eq!(
            client.resolve_url("posts/5"),
            "https://example.com/wp-json/wp/v2/posts/5"
        );
    }

    #[test]
    fn resolve_url_keeps_absolute_targets() {
        let client = test_client("https://example.com");
        assert_eq!(
            client.resolve_url("https://other.example/wp-json/"),
            "https://other.example/wp-json/"
        );
    }

    #[test]
    fn new_rejects_invalid_site_url() {
        let err = WpClient::new("not a url", &Credential::new("a", "b"))
            .expect_err("invalid URL should be rejected");
        assert!(matches!(err, WpError::InvalidConfig(_)));
    }

    #[test]
    fn authorization_survives_caller_override() {
        let client = test_client("https://example.com");
        let headers = client.request_headers(
            &[
                ("Authorization".to_string(), "Bearer other".to_string()),
                ("X-Custom".to_string(), "1".to_string()),
            ],
            true,
            false,
        );
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Basic YWRtaW46cHc=");
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(headers.get("x-custom").unwrap(), "1");
    }

    #[test]
    fn caller_may_override_content_type_for_json() {
        let client = test_client("https://example.com");
        let headers = client.request_headers(
            &[("Content-Type".to_string(), "application/merge-patch+json".to_string())],
            true,
            false,
        );
        assert_eq!(
            headers.get(CONTENT_TYPE).unwrap(),
            "application/merge-patch+json"
        );
    }

    #[test]
    fn multipart_requests_carry_no_fixed_content_type() {
        let client = test_client("https://example.com");
        let headers = client.request_headers(
            &[("Content-Type".to_string(), "application/json".to_string())],
            false,
            true,
        );
        assert!(headers.get(CONTENT_TYPE).is_none());
        assert!(headers.get(AUTHORIZATION).is_some());
    }

    #[tokio::test]
    async fn execute_with_metadata_reads_pagination_headers() {
        let router = Router::new().route(
            "/wp-json/wp/v2/posts",
            get(|| async {
                (
                    [("x-wp-total", "42"), ("x-wp-totalpages", "3")],
                    axum::Json(json!([{ "id": 1 }, { "id": 2 }])),
                )
            }),
        );
        let client = test_client(&spawn_site(router).await);

        let result = client
            .execute_with_metadata(ApiRequest::get("/posts"))
            .await
            .expect("list should succeed");
        assert_eq!(result.page.total, 42);
        assert_eq!(result.page.total_pages, 3);
        assert_eq!(result.body.as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn missing_pagination_headers_yield_zero() {
        let router = Router::new().route(
            "/wp-json/wp/v2/tags",
            get(|| async { axum::Json(json!([])) }),
        );
        let client = test_client(&spawn_site(router).await);

        let result = client
            .execute_with_metadata(ApiRequest::get("tags"))
            .await
            .expect("list should succeed");
        assert_eq!(result.page, PageInfo::default());
    }

    #[tokio::test]
    async fn sends_basic_auth_and_json_body() {
        let seen: Arc<Mutex<Option<(String, String, Value)>>> = Arc::new(Mutex::new(None));
        let captured = seen.clone();
        let router = Router::new().route(
            "/wp-json/wp/v2/posts",
            post(move |headers: AxumHeaders, body: Bytes| {
                let captured = captured.clone();
                async move {
                    let header = |name: &str| {
                        headers
                            .get(name)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string()
                    };
                    let parsed: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
                    *captured.lock().unwrap() =
                        Some((header("authorization"), header("content-type"), parsed));
                    (StatusCode::CREATED, axum::Json(json!({ "id": 9 })))
                }
            }),
        );
        let client = test_client(&spawn_site(router).await);

        let body = client
            .execute(ApiRequest::post("/posts", json!({ "title": "Hi" })))
            .await
            .expect("create should succeed");
        assert_eq!(body["id"], 9);

        let (auth, content_type, sent) = seen.lock().unwrap().clone().expect("request captured");
        assert_eq!(auth, "Basic YWRtaW46cHc=");
        assert_eq!(content_type, "application/json");
        assert_eq!(sent, json!({ "title": "Hi" }));
    }

    #[tokio::test]
    async fn error_message_prefers_json_message() {
        let router = Router::new().route(
            "/wp-json/wp/v2/posts",
            get(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    axum::Json(json!({ "message": "bad request", "code": "rest_invalid" })),
                )
            }),
        );
        let client = test_client(&spawn_site(router).await);

        let err = client
            .execute(ApiRequest::get("/posts"))
            .await
            .expect_err("400 should fail");
        assert_eq!(err.status_code(), 400);
        match err {
            WpError::Api { message, .. } => assert_eq!(message, "bad request"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_message_falls_back_to_code_then_text() {
        let router = Router::new()
            .route(
                "/wp-json/wp/v2/users/me",
                get(|| async {
                    (
                        StatusCode::FORBIDDEN,
                        axum::Json(json!({ "code": "rest_forbidden" })),
                    )
                }),
            )
            .route(
                "/wp-json/wp/v2/settings",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "oops").into_response() }),
            );
        let client = test_client(&spawn_site(router).await);

        let forbidden = client
            .execute(ApiRequest::get("users/me"))
            .await
            .expect_err("403 should fail");
        assert_eq!(forbidden.to_string(), "WordPress API error (403): rest_forbidden");

        let broken = client
            .execute(ApiRequest::get("settings"))
            .await
            .expect_err("500 should fail");
        assert_eq!(broken.to_string(), "WordPress API error (500): oops");
    }

    #[tokio::test]
    async fn unreachable_site_is_a_transport_failure() {
        let client = test_client("http://127.0.0.1:9");
        let err = client
            .execute(ApiRequest::get("/posts"))
            .await
            .expect_err("nothing listens on port 9");
        assert!(matches!(err, WpError::Transport { .. }));
        assert_eq!(err.status_code(), 0);
    }

    #[tokio::test]
    async fn multipart_upload_sends_file_and_text_fields() {
        let seen: Arc<Mutex<Option<(String, String)>>> = Arc::new(Mutex::new(None));
        let captured = seen.clone();
        let router = Router::new().route(
            "/wp-json/wp/v2/media",
            post(move |headers: AxumHeaders, body: Bytes| {
                let captured = captured.clone();
                async move {
                    let content_type = headers
                        .get("content-type")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    *captured.lock().unwrap() =
                        Some((content_type, String::from_utf8_lossy(&body).to_string()));
                    (StatusCode::CREATED, axum::Json(json!({ "id": 77 })))
                }
            }),
        );
        let client = test_client(&spawn_site(router).await);

        let upload = MediaUpload {
            file_name: "photo.png".to_string(),
            mime_type: "image/png".to_string(),
            bytes: b"PNGDATA".to_vec(),
            title: Some("Sunset".to_string()),
            alt_text: Some("Orange sky".to_string()),
            post: Some(12),
            ..Default::default()
        };
        let body = client
            .execute(ApiRequest::upload("/media", upload))
            .await
            .expect("upload should succeed");
        assert_eq!(body["id"], 77);

        let (content_type, raw) = seen.lock().unwrap().clone().expect("request captured");
        assert!(content_type.starts_with("multipart/form-data; boundary="));
        assert!(raw.contains("name=\"file\"; filename=\"photo.png\""));
        assert!(raw.contains("PNGDATA"));
        assert!(raw.contains("name=\"title\""));
        assert!(raw.contains("Orange sky"));
        assert!(raw.contains("name=\"post\"\r\n\r\n12"));
        assert!(!raw.contains("name=\"caption\""));
    }
}
