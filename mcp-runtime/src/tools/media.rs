use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value, json};
use wp_mcp_core::error::codes;

use super::args::{
    arg_optional_choice, arg_optional_string, arg_optional_text, arg_optional_u64, arg_per_page,
    required_u64,
};
use super::{ToolAccess, ToolDefinition, ToolError, list_header};
use crate::util::{html_to_text, to_pretty_json};
use crate::wordpress::models::MediaItem;
use crate::wordpress::{MediaUpload, QueryParams, ResourceKind, WpClient};

const MEDIA_TYPES: [&str; 5] = ["image", "video", "audio", "application", "text"];

/// Best-effort MIME type from a file extension.
pub fn guess_mime_type(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "txt" => "text/plain",
        "csv" => "text/csv",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListMediaParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub search: Option<String>,
    pub media_type: Option<String>,
    pub mime_type: Option<String>,
    pub parent: Option<u64>,
}

impl ListMediaParams {
    pub fn from_args(args: &Map<String, Value>) -> Result<Self, ToolError> {
        Ok(Self {
            page: arg_optional_u64(args, "page")?,
            per_page: arg_per_page(args)?,
            search: arg_optional_string(args, "search")?,
            media_type: arg_optional_choice(args, "media_type", &MEDIA_TYPES)?,
            mime_type: arg_optional_string(args, "mime_type")?,
            parent: arg_optional_u64(args, "parent")?,
        })
    }

    pub fn to_query(&self) -> QueryParams {
        QueryParams::new()
            .opt("page", self.page)
            .opt("per_page", self.per_page)
            .opt("search", self.search.as_ref())
            .opt("media_type", self.media_type.as_ref())
            .opt("mime_type", self.mime_type.as_ref())
            .opt("parent", self.parent)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaFields {
    pub title: Option<String>,
    pub caption: Option<String>,
    pub alt_text: Option<String>,
    pub description: Option<String>,
    pub post: Option<u64>,
}

impl MediaFields {
    pub fn from_args(args: &Map<String, Value>) -> Result<Self, ToolError> {
        Ok(Self {
            title: arg_optional_text(args, "title")?,
            caption: arg_optional_text(args, "caption")?,
            alt_text: arg_optional_text(args, "alt_text")?,
            description: arg_optional_text(args, "description")?,
            post: arg_optional_u64(args, "post")?,
        })
    }

    pub fn to_body(&self) -> Map<String, Value> {
        let mut body = Map::new();
        for (key, value) in [
            ("title", &self.title),
            ("caption", &self.caption),
            ("alt_text", &self.alt_text),
            ("description", &self.description),
        ] {
            if let Some(value) = value {
                body.insert(key.into(), Value::String(value.clone()));
            }
        }
        if let Some(post) = self.post {
            body.insert("post".into(), post.into());
        }
        body
    }
}

/// Resolve the upload payload from either a local path or inline base64.
/// Paths are only honoured when the session grants local file access.
async fn read_upload(args: &Map<String, Value>, access: ToolAccess) -> Result<MediaUpload, ToolError> {
    let file_path = arg_optional_string(args, "file_path")?;
    let data = arg_optional_string(args, "data_base64")?;
    let explicit_name = arg_optional_string(args, "file_name")?;

    let (file_name, bytes) = match (file_path, data) {
        (Some(_), None) if !access.local_files => {
            return Err(ToolError::new(
                codes::VALIDATION_FAILED,
                "'file_path' is not available on this transport; send 'data_base64' with 'file_name'",
            )
            .with_field("file_path"));
        }
        (Some(path), None) => {
            let bytes = tokio::fs::read(&path).await.map_err(|e| {
                ToolError::new(
                    codes::VALIDATION_FAILED,
                    format!("Could not read '{path}': {e}"),
                )
                .with_field("file_path")
            })?;
            let name = explicit_name.unwrap_or_else(|| {
                Path::new(&path)
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or("upload")
                    .to_string()
            });
            (name, bytes)
        }
        (None, Some(data)) => {
            let name = explicit_name.ok_or_else(|| {
                ToolError::new(
                    codes::VALIDATION_FAILED,
                    "'file_name' is required with 'data_base64'",
                )
                .with_field("file_name")
            })?;
            let bytes = STANDARD.decode(data.trim()).map_err(|e| {
                ToolError::new(
                    codes::VALIDATION_FAILED,
                    format!("'data_base64' is not valid base64: {e}"),
                )
                .with_field("data_base64")
            })?;
            (name, bytes)
        }
        (Some(_), Some(_)) => {
            return Err(ToolError::new(
                codes::VALIDATION_FAILED,
                "Pass either 'file_path' or 'data_base64', not both",
            ));
        }
        (None, None) => {
            return Err(ToolError::new(
                codes::VALIDATION_FAILED,
                "Missing file: pass 'file_path' or 'data_base64'",
            )
            .with_field("file_path"));
        }
    };

    if bytes.is_empty() {
        return Err(ToolError::new(codes::VALIDATION_FAILED, "Upload file is empty"));
    }

    let mime_type = match arg_optional_string(args, "mime_type")? {
        Some(mime) => mime,
        None => guess_mime_type(&file_name).to_string(),
    };
    let fields = MediaFields::from_args(args)?;
    Ok(MediaUpload {
        file_name,
        mime_type,
        bytes,
        title: fields.title,
        caption: fields.caption,
        alt_text: fields.alt_text,
        description: fields.description,
        post: fields.post,
    })
}

fn summary_line(item: &MediaItem) -> String {
    let title = html_to_text(&item.title.rendered);
    let mut line = format!("#{} [{}] {}", item.id, item.mime_type, title);
    if !item.source_url.is_empty() {
        line.push_str(&format!("\n   {}", item.source_url));
    }
    if !item.alt_text.is_empty() {
        line.push_str(&format!("\n   alt: {}", item.alt_text));
    }
    line
}

pub async fn list(client: &WpClient, args: &Map<String, Value>) -> Result<String, ToolError> {
    let params = ListMediaParams::from_args(args)?;
    let result = client
        .list::<MediaItem>(ResourceKind::Media, &params.to_query())
        .await?;
    let mut lines = vec![list_header(&result, "media items", params.page)];
    lines.extend(result.items.iter().map(summary_line));
    Ok(lines.join("\n"))
}

pub async fn get(client: &WpClient, args: &Map<String, Value>) -> Result<String, ToolError> {
    let id = required_u64(args, "id")?;
    let item: Value = client
        .get(ResourceKind::Media, id, &QueryParams::new())
        .await?;
    Ok(to_pretty_json(&item))
}

pub async fn upload(
    client: &WpClient,
    args: &Map<String, Value>,
    access: ToolAccess,
) -> Result<String, ToolError> {
    let upload = read_upload(args, access).await?;
    tracing::debug!(
        file_name = %upload.file_name,
        mime_type = %upload.mime_type,
        bytes = upload.bytes.len(),
        "uploading media"
    );
    let item: MediaItem = client.upload_media(upload).await?;
    let mut text = format!("Uploaded media {}", summary_line(&item));
    if let Some(post) = item.post {
        text.push_str(&format!("\n   attached to post #{post}"));
    }
    Ok(text)
}

pub async fn update(client: &WpClient, args: &Map<String, Value>) -> Result<String, ToolError> {
    let id = required_u64(args, "id")?;
    let body = MediaFields::from_args(args)?.to_body();
    if body.is_empty() {
        return Err(ToolError::no_fields_to_update());
    }
    let item: MediaItem = client
        .update(ResourceKind::Media, id, Value::Object(body))
        .await?;
    Ok(format!("Updated media {}", summary_line(&item)))
}

/// Media has no trash, so this is always permanent.
pub async fn delete(client: &WpClient, args: &Map<String, Value>) -> Result<String, ToolError> {
    let id = required_u64(args, "id")?;
    client.delete(ResourceKind::Media, id, true).await?;
    Ok(format!("Permanently deleted media item #{id}."))
}

pub fn definitions() -> Vec<ToolDefinition> {
    let text_fields = json!({
        "title": { "type": "string" },
        "caption": { "type": "string" },
        "alt_text": { "type": "string" },
        "description": { "type": "string" },
        "post": { "type": "integer", "description": "Attach to this post id" }
    });
    let mut upload_props = text_fields.clone();
    upload_props["file_path"] = json!({ "type": "string", "description": "Local file path (stdio only)" });
    upload_props["data_base64"] = json!({ "type": "string", "description": "File contents, base64 encoded" });
    upload_props["file_name"] = json!({ "type": "string", "description": "Required with data_base64" });
    upload_props["mime_type"] = json!({ "type": "string", "description": "Guessed from the file name when omitted" });
    let mut update_props = text_fields;
    update_props["id"] = json!({ "type": "integer" });

    vec![
        ToolDefinition {
            name: "list_media",
            description: "List media library items with optional search, media type and parent filters.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "page": { "type": "integer", "minimum": 1 },
                    "per_page": { "type": "integer", "minimum": 1, "maximum": 100 },
                    "search": { "type": "string" },
                    "media_type": { "type": "string", "enum": MEDIA_TYPES },
                    "mime_type": { "type": "string" },
                    "parent": { "type": "integer" }
                }
            }),
        },
        ToolDefinition {
            name: "get_media",
            description: "Get a single media item by id (full JSON).",
            input_schema: json!({
                "type": "object",
                "properties": { "id": { "type": "integer" } },
                "required": ["id"]
            }),
        },
        ToolDefinition {
            name: "upload_media",
            description: "Upload a file to the media library from a local path or base64 data.",
            input_schema: json!({ "type": "object", "properties": upload_props }),
        },
        ToolDefinition {
            name: "update_media",
            description: "Update title, caption, alt text, description or parent post of a media item.",
            input_schema: json!({ "type": "object", "properties": update_props, "required": ["id"] }),
        },
        ToolDefinition {
            name: "delete_media",
            description: "Permanently delete a media item and its files. Media cannot be trashed.",
            input_schema: json!({
                "type": "object",
                "properties": { "id": { "type": "integer" } },
                "required": ["id"]
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::extract::{Multipart, RawQuery};
    use axum::routing::{delete as delete_route, post};

    use super::*;
    use crate::wordpress::client::tests::{spawn_site, test_client};

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn mime_type_is_guessed_from_extension() {
        assert_eq!(guess_mime_type("photo.JPG"), "image/jpeg");
        assert_eq!(guess_mime_type("report.pdf"), "application/pdf");
        assert_eq!(guess_mime_type("no-extension"), "application/octet-stream");
    }

    #[tokio::test]
    async fn upload_requires_exactly_one_source() {
        let err = read_upload(&args(json!({})), ToolAccess::default()).await.unwrap_err();
        assert_eq!(err.field.as_deref(), Some("file_path"));

        let err = read_upload(&args(json!({ "data_base64": "aGk=" })), ToolAccess::default())
            .await
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("file_name"));

        let err = read_upload(
            &args(json!({ "data_base64": "***", "file_name": "a.txt" })),
            ToolAccess::default(),
        )
        .await
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("data_base64"));
    }

    #[tokio::test]
    async fn inline_upload_decodes_and_guesses_mime() {
        let upload = read_upload(&args(json!({
            "data_base64": "aGVsbG8=",
            "file_name": "notes.txt",
            "alt_text": ""
        })), ToolAccess::default())
        .await
        .unwrap();
        assert_eq!(upload.bytes, b"hello".to_vec());
        assert_eq!(upload.mime_type, "text/plain");
        assert_eq!(upload.alt_text.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn file_path_needs_local_access() {
        let path = std::env::temp_dir().join(format!("wp-mcp-{}.txt", uuid::Uuid::now_v7()));
        tokio::fs::write(&path, b"local bytes").await.unwrap();
        let request = args(json!({ "file_path": path.to_str().unwrap() }));

        let err = read_upload(&request, ToolAccess::default()).await.unwrap_err();
        assert_eq!(err.code, codes::VALIDATION_FAILED);
        assert_eq!(err.field.as_deref(), Some("file_path"));

        let upload = read_upload(&request, ToolAccess::LOCAL).await.unwrap();
        assert_eq!(upload.bytes, b"local bytes".to_vec());
        assert_eq!(upload.mime_type, "text/plain");
        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn upload_sends_multipart_file() {
        let router = Router::new().route(
            "/wp-json/wp/v2/media",
            post(|mut multipart: Multipart| async move {
                let mut file_name = String::new();
                let mut title = String::new();
                let mut parent: Option<u64> = None;
                while let Some(field) = multipart.next_field().await.unwrap() {
                    match field.name() {
                        Some("file") => file_name = field.file_name().unwrap_or_default().to_string(),
                        Some("title") => title = field.text().await.unwrap(),
                        Some("post") => parent = field.text().await.unwrap().parse().ok(),
                        _ => {}
                    }
                }
                axum::Json(json!({
                    "id": 77,
                    "mime_type": "image/png",
                    "source_url": format!("https://example.com/uploads/{file_name}"),
                    "title": { "rendered": title },
                    "post": parent
                }))
            }),
        );
        let client = test_client(&spawn_site(router).await);

        let text = upload(
            &client,
            &args(json!({
                "data_base64": "iVBORw0K",
                "file_name": "logo.png",
                "title": "Logo",
                "post": 12
            })),
            ToolAccess::default(),
        )
        .await
        .unwrap();
        // Only POST /media is routed, so a follow-up update call would fail.
        assert!(text.contains("#77 [image/png] Logo"));
        assert!(text.contains("attached to post #12"));
        assert!(text.contains("https://example.com/uploads/logo.png"));
    }

    #[tokio::test]
    async fn delete_is_always_forced() {
        let router = Router::new().route(
            "/wp-json/wp/v2/media/{id}",
            delete_route(|RawQuery(query): RawQuery| async move {
                assert_eq!(query.as_deref(), Some("force=true"));
                axum::Json(json!({ "deleted": true, "previous": { "id": 5 } }))
            }),
        );
        let client = test_client(&spawn_site(router).await);

        let text = delete(&client, &args(json!({ "id": 5, "force": false })))
            .await
            .unwrap();
        assert_eq!(text, "Permanently deleted media item #5.");
    }
}
