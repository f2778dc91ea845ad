use std::future::Future;

use serde::Serialize;
use serde_json::{Map, Value, json};
use wp_mcp_core::error::codes;

use super::args::{
    arg_bool, arg_optional_choice, arg_optional_string, arg_optional_string_array,
    arg_optional_text, arg_optional_u64, arg_per_page, required_string, required_u64,
};
use super::{ToolDefinition, ToolError, list_header};
use crate::util::{html_to_text, to_pretty_json, truncate_chars};
use crate::wordpress::models::Comment;
use crate::wordpress::{QueryParams, ResourceKind, WpClient, WpError};

const STATUSES: [&str; 5] = ["approve", "hold", "spam", "trash", "all"];
const MODERATION_ACTIONS: [&str; 4] = ["approve", "hold", "spam", "trash"];
const WRITABLE_STATUSES: [&str; 4] = ["approve", "hold", "spam", "trash"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListCommentsParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub search: Option<String>,
    pub post: Option<u64>,
    pub status: Option<String>,
    pub author_email: Option<String>,
    pub order: Option<String>,
}

impl ListCommentsParams {
    pub fn from_args(args: &Map<String, Value>) -> Result<Self, ToolError> {
        Ok(Self {
            page: arg_optional_u64(args, "page")?,
            per_page: arg_per_page(args)?,
            search: arg_optional_string(args, "search")?,
            post: arg_optional_u64(args, "post")?,
            status: arg_optional_choice(args, "status", &STATUSES)?,
            author_email: arg_optional_string(args, "author_email")?,
            order: arg_optional_choice(args, "order", &["asc", "desc"])?,
        })
    }

    pub fn to_query(&self) -> QueryParams {
        QueryParams::new()
            .opt("page", self.page)
            .opt("per_page", self.per_page)
            .opt("search", self.search.as_ref())
            .opt("post", self.post)
            .opt("status", self.status.as_ref())
            .opt("author_email", self.author_email.as_ref())
            .opt("order", self.order.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentFields {
    pub post: Option<u64>,
    pub parent: Option<u64>,
    pub content: Option<String>,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    pub status: Option<String>,
}

impl CommentFields {
    pub fn from_args(args: &Map<String, Value>) -> Result<Self, ToolError> {
        Ok(Self {
            post: arg_optional_u64(args, "post")?,
            parent: arg_optional_u64(args, "parent")?,
            content: arg_optional_text(args, "content")?,
            author_name: arg_optional_string(args, "author_name")?,
            author_email: arg_optional_string(args, "author_email")?,
            status: arg_optional_choice(args, "status", &WRITABLE_STATUSES)?,
        })
    }

    pub fn to_body(&self) -> Map<String, Value> {
        let mut body = Map::new();
        if let Some(post) = self.post {
            body.insert("post".into(), post.into());
        }
        if let Some(parent) = self.parent {
            body.insert("parent".into(), parent.into());
        }
        for (key, value) in [
            ("content", &self.content),
            ("author_name", &self.author_name),
            ("author_email", &self.author_email),
            ("status", &self.status),
        ] {
            if let Some(value) = value {
                body.insert(key.into(), Value::String(value.clone()));
            }
        }
        body
    }
}

/// Per-id result of a bulk operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkItemOutcome {
    pub id: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Apply `op` to each id in order. A failure is recorded and the batch
/// carries on with the next id.
pub async fn run_bulk<F, Fut>(ids: &[u64], mut op: F) -> Vec<BulkItemOutcome>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<(), WpError>>,
{
    let mut outcomes = Vec::with_capacity(ids.len());
    for &id in ids {
        let outcome = match op(id).await {
            Ok(()) => BulkItemOutcome {
                id,
                success: true,
                error: None,
            },
            Err(err) => {
                tracing::warn!(comment_id = id, error = %err, "bulk moderation item failed");
                BulkItemOutcome {
                    id,
                    success: false,
                    error: Some(err.to_string()),
                }
            }
        };
        outcomes.push(outcome);
    }
    outcomes
}

fn summary_line(comment: &Comment) -> String {
    let author = if comment.author_name.is_empty() {
        "anonymous"
    } else {
        comment.author_name.as_str()
    };
    format!(
        "#{} [{}] on post #{} by {}: {}",
        comment.id,
        comment.status,
        comment.post,
        author,
        truncate_chars(&html_to_text(&comment.content.rendered), 160)
    )
}

pub async fn list(client: &WpClient, args: &Map<String, Value>) -> Result<String, ToolError> {
    let params = ListCommentsParams::from_args(args)?;
    let result = client
        .list::<Comment>(ResourceKind::Comments, &params.to_query())
        .await?;
    let mut lines = vec![list_header(&result, "comments", params.page)];
    lines.extend(result.items.iter().map(summary_line));
    Ok(lines.join("\n"))
}

pub async fn get(client: &WpClient, args: &Map<String, Value>) -> Result<String, ToolError> {
    let id = required_u64(args, "id")?;
    let comment: Value = client
        .get(ResourceKind::Comments, id, &QueryParams::new())
        .await?;
    Ok(to_pretty_json(&comment))
}

pub async fn create(client: &WpClient, args: &Map<String, Value>) -> Result<String, ToolError> {
    required_u64(args, "post")?;
    required_string(args, "content")?;
    let fields = CommentFields::from_args(args)?;
    let created: Comment = client
        .create(ResourceKind::Comments, Value::Object(fields.to_body()))
        .await?;
    Ok(format!("Created comment {}", summary_line(&created)))
}

pub async fn update(client: &WpClient, args: &Map<String, Value>) -> Result<String, ToolError> {
    let id = required_u64(args, "id")?;
    let mut fields = CommentFields::from_args(args)?;
    // A comment cannot be moved to another post.
    fields.post = None;
    let body = fields.to_body();
    if body.is_empty() {
        return Err(ToolError::no_fields_to_update());
    }
    let updated: Comment = client
        .update(ResourceKind::Comments, id, Value::Object(body))
        .await?;
    Ok(format!("Updated comment {}", summary_line(&updated)))
}

pub async fn delete(client: &WpClient, args: &Map<String, Value>) -> Result<String, ToolError> {
    let id = required_u64(args, "id")?;
    let force = arg_bool(args, "force", false)?;
    client.delete(ResourceKind::Comments, id, force).await?;
    Ok(if force {
        format!("Permanently deleted comment #{id}.")
    } else {
        format!("Moved comment #{id} to the trash.")
    })
}

fn parse_ids(args: &Map<String, Value>) -> Result<Vec<u64>, ToolError> {
    let raw = match args.get("comment_ids") {
        Some(Value::Array(items)) => items.clone(),
        None | Some(Value::Null) => {
            return Err(ToolError::new(
                codes::VALIDATION_FAILED,
                "Missing required field 'comment_ids'",
            )
            .with_field("comment_ids"));
        }
        Some(_) => {
            // Comma-separated string form.
            let list = arg_optional_string_array(args, "comment_ids")?.unwrap_or_default();
            list.into_iter().map(Value::String).collect()
        }
    };
    let mut ids = Vec::with_capacity(raw.len());
    for item in &raw {
        let mut single = Map::new();
        single.insert("comment_ids".into(), item.clone());
        ids.push(required_u64(&single, "comment_ids")?);
    }
    if ids.is_empty() {
        return Err(
            ToolError::new(codes::VALIDATION_FAILED, "'comment_ids' must not be empty")
                .with_field("comment_ids"),
        );
    }
    Ok(ids)
}

pub async fn bulk_moderate(
    client: &WpClient,
    args: &Map<String, Value>,
) -> Result<String, ToolError> {
    let ids = parse_ids(args)?;
    let action = arg_optional_choice(args, "action", &MODERATION_ACTIONS)?.ok_or_else(|| {
        ToolError::new(codes::VALIDATION_FAILED, "Missing required field 'action'")
            .with_field("action")
    })?;

    let outcomes = run_bulk(&ids, |id| {
        let action = action.as_str();
        async move {
            client
                .update::<Value>(ResourceKind::Comments, id, json!({ "status": action }))
                .await
                .map(|_| ())
        }
    })
    .await;

    let succeeded = outcomes.iter().filter(|outcome| outcome.success).count();
    tracing::info!(
        action = %action,
        total = outcomes.len(),
        succeeded,
        "bulk comment moderation finished"
    );
    let report = json!({
        "action": action,
        "total": outcomes.len(),
        "succeeded": succeeded,
        "failed": outcomes.len() - succeeded,
        "results": outcomes,
    });
    Ok(format!(
        "Moderated {succeeded} of {} comments ({action}).\n{}",
        outcomes.len(),
        to_pretty_json(&report)
    ))
}

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "list_comments",
            description: "List comments, optionally filtered by post, status, author email or search text.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "page": { "type": "integer", "minimum": 1 },
                    "per_page": { "type": "integer", "minimum": 1, "maximum": 100 },
                    "search": { "type": "string" },
                    "post": { "type": "integer" },
                    "status": { "type": "string", "enum": STATUSES },
                    "author_email": { "type": "string" },
                    "order": { "type": "string", "enum": ["asc", "desc"] }
                }
            }),
        },
        ToolDefinition {
            name: "get_comment",
            description: "Get a single comment by id (full JSON).",
            input_schema: json!({
                "type": "object",
                "properties": { "id": { "type": "integer" } },
                "required": ["id"]
            }),
        },
        ToolDefinition {
            name: "create_comment",
            description: "Create a comment on a post, optionally as a reply to another comment.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "post": { "type": "integer" },
                    "parent": { "type": "integer" },
                    "content": { "type": "string" },
                    "author_name": { "type": "string" },
                    "author_email": { "type": "string" },
                    "status": { "type": "string", "enum": WRITABLE_STATUSES }
                },
                "required": ["post", "content"]
            }),
        },
        ToolDefinition {
            name: "update_comment",
            description: "Update content, author fields or status of a comment.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": { "type": "integer" },
                    "content": { "type": "string" },
                    "author_name": { "type": "string" },
                    "author_email": { "type": "string" },
                    "status": { "type": "string", "enum": WRITABLE_STATUSES }
                },
                "required": ["id"]
            }),
        },
        ToolDefinition {
            name: "delete_comment",
            description: "Delete a comment. Moves to trash unless force=true.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": { "type": "integer" },
                    "force": { "type": "boolean", "default": false }
                },
                "required": ["id"]
            }),
        },
        ToolDefinition {
            name: "bulk_moderate_comments",
            description: "Approve, hold, spam or trash several comments. Each id is processed in order; failures are reported per id.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "comment_ids": { "type": "array", "items": { "type": "integer" }, "minItems": 1 },
                    "action": { "type": "string", "enum": MODERATION_ACTIONS }
                },
                "required": ["comment_ids", "action"]
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::post;

    use super::*;
    use crate::wordpress::client::tests::{spawn_site, test_client};

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn run_bulk_continues_after_failures() {
        let ids = [11, 12, 13, 14, 15];
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = calls.clone();

        let outcomes = run_bulk(&ids, |id| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(id);
                if id == 12 || id == 15 {
                    Err(WpError::Api {
                        status: 404,
                        message: "Invalid comment ID.".to_string(),
                    })
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert_eq!(*calls.lock().unwrap(), ids.to_vec());
        let flags: Vec<bool> = outcomes.iter().map(|o| o.success).collect();
        assert_eq!(flags, vec![true, false, true, true, false]);
        assert_eq!(
            outcomes[1].error.as_deref(),
            Some("WordPress API error (404): Invalid comment ID.")
        );
        assert_eq!(outcomes[0].error, None);
    }

    #[tokio::test]
    async fn bulk_moderate_reports_each_id() {
        let router = Router::new().route(
            "/wp-json/wp/v2/comments/{id}",
            post(|Path(id): Path<u64>, axum::Json(body): axum::Json<Value>| async move {
                assert_eq!(body, json!({ "status": "spam" }));
                if id == 2 {
                    (
                        StatusCode::NOT_FOUND,
                        axum::Json(json!({ "code": "rest_comment_invalid_id", "message": "Invalid comment ID." })),
                    )
                        .into_response()
                } else {
                    axum::Json(json!({ "id": id, "status": "spam" })).into_response()
                }
            }),
        );
        let client = test_client(&spawn_site(router).await);

        let text = bulk_moderate(
            &client,
            &args(json!({ "comment_ids": [1, 2, 3], "action": "spam" })),
        )
        .await
        .unwrap();
        assert!(text.starts_with("Moderated 2 of 3 comments (spam)."));
        assert!(text.contains("\"failed\": 1"));
        assert!(text.contains("Invalid comment ID."));
    }

    #[tokio::test]
    async fn bulk_moderate_validates_input() {
        let client = test_client("http://127.0.0.1:9");
        let err = bulk_moderate(&client, &args(json!({ "comment_ids": [], "action": "spam" })))
            .await
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("comment_ids"));

        let err = bulk_moderate(&client, &args(json!({ "comment_ids": [1], "action": "delete" })))
            .await
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("action"));
    }

    #[test]
    fn comment_ids_accept_comma_string() {
        assert_eq!(
            parse_ids(&args(json!({ "comment_ids": "4, 5,6" }))).unwrap(),
            vec![4, 5, 6]
        );
    }

    #[test]
    fn list_params_encode_post_and_status() {
        let params =
            ListCommentsParams::from_args(&args(json!({ "post": 9, "status": "hold" }))).unwrap();
        assert_eq!(params.to_query().encode(), "?post=9&status=hold");
    }

    #[tokio::test]
    async fn update_ignores_post_reassignment() {
        let client = test_client("http://127.0.0.1:9");
        let err = update(&client, &args(json!({ "id": 3, "post": 8 })))
            .await
            .unwrap_err();
        assert_eq!(err.message, "No fields provided to update");
    }
}
