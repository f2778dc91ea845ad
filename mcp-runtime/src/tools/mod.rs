//! MCP tool surface: one handler per content operation.
//!
//! Handlers parse their arguments into a per-operation struct, make one or
//! more [`WpClient`] calls and render a plain-text result for the agent.

mod args;
pub mod comments;
pub mod content;
pub mod media;
pub mod settings;
pub mod taxonomy;
pub mod users;

use serde_json::{Map, Value, json};
use wp_mcp_core::error::codes;

use crate::wordpress::{ListResult, WpClient, WpError};

#[derive(Debug, Clone, PartialEq)]
pub struct ToolError {
    pub code: String,
    pub message: String,
    pub field: Option<String>,
    pub docs_hint: Option<String>,
    pub details: Option<Value>,
}

impl ToolError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            field: None,
            docs_hint: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_docs_hint(mut self, docs_hint: impl Into<String>) -> Self {
        self.docs_hint = Some(docs_hint.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn no_fields_to_update() -> Self {
        ToolError::new(codes::VALIDATION_FAILED, "No fields provided to update")
            .with_docs_hint("Pass at least one field to change besides 'id'.")
    }

    pub fn not_configured() -> Self {
        ToolError::new(
            codes::WORDPRESS_NOT_CONFIGURED,
            "WordPress credentials are not configured",
        )
        .with_docs_hint(
            "Set WORDPRESS_SITE_URL, WORDPRESS_USERNAME and WORDPRESS_APP_PASSWORD and restart.",
        )
    }

    /// Single text block shown to the agent.
    pub fn to_text(&self) -> String {
        let mut text = format!("Error [{}]: {}", self.code, self.message);
        if let Some(field) = &self.field {
            text.push_str(&format!(" (field: {field})"));
        }
        if let Some(hint) = &self.docs_hint {
            text.push_str(&format!("\nHint: {hint}"));
        }
        text
    }

    pub fn to_value(&self) -> Value {
        let mut payload = json!({
            "error": self.code,
            "message": self.message
        });
        if let Some(field) = &self.field {
            payload["field"] = Value::String(field.clone());
        }
        if let Some(docs_hint) = &self.docs_hint {
            payload["docs_hint"] = Value::String(docs_hint.clone());
        }
        if let Some(details) = &self.details {
            payload["details"] = details.clone();
        }
        payload
    }
}

impl From<WpError> for ToolError {
    fn from(err: WpError) -> Self {
        let status = err.status_code();
        let code = match &err {
            WpError::Transport { .. } => codes::CONNECTION_ERROR,
            WpError::Api { .. } | WpError::Decode { .. } => codes::UPSTREAM_ERROR,
            WpError::InvalidRequest(_) => codes::VALIDATION_FAILED,
            WpError::InvalidConfig(_) => codes::WORDPRESS_NOT_CONFIGURED,
        };
        let tool_error = ToolError::new(code, err.to_string());
        if status == 0 {
            tool_error
        } else {
            tool_error.with_details(json!({ "status": status }))
        }
    }
}

/// Capabilities a session grants its tool calls beyond the WordPress API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolAccess {
    /// `upload_media` may read `file_path` from this machine's filesystem.
    /// Only the stdio binary, running as the user's own process, sets this.
    pub local_files: bool,
}

impl ToolAccess {
    pub const LOCAL: ToolAccess = ToolAccess { local_files: true };
}

#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    let mut tools = Vec::new();
    tools.extend(content::definitions());
    tools.extend(comments::definitions());
    tools.extend(media::definitions());
    tools.extend(taxonomy::definitions());
    tools.extend(users::definitions());
    tools.extend(settings::definitions());
    tools
}

pub fn is_known_tool(name: &str) -> bool {
    tool_definitions().iter().any(|tool| tool.name == name)
}

/// Dispatch one tool call. Unknown names are rejected by the caller first.
pub async fn call_tool(
    client: &WpClient,
    name: &str,
    args: &Map<String, Value>,
    access: ToolAccess,
) -> Result<String, ToolError> {
    use content::ContentKind::{Page, Post};

    match name {
        "list_posts" => content::list(client, Post, args).await,
        "get_post" => content::get(client, Post, args).await,
        "create_post" => content::create(client, Post, args).await,
        "update_post" => content::update(client, Post, args).await,
        "delete_post" => content::delete(client, Post, args).await,
        "list_pages" => content::list(client, Page, args).await,
        "get_page" => content::get(client, Page, args).await,
        "create_page" => content::create(client, Page, args).await,
        "update_page" => content::update(client, Page, args).await,
        "delete_page" => content::delete(client, Page, args).await,
        "list_comments" => comments::list(client, args).await,
        "get_comment" => comments::get(client, args).await,
        "create_comment" => comments::create(client, args).await,
        "update_comment" => comments::update(client, args).await,
        "delete_comment" => comments::delete(client, args).await,
        "bulk_moderate_comments" => comments::bulk_moderate(client, args).await,
        "list_media" => media::list(client, args).await,
        "get_media" => media::get(client, args).await,
        "upload_media" => media::upload(client, args, access).await,
        "update_media" => media::update(client, args).await,
        "delete_media" => media::delete(client, args).await,
        "list_categories" => taxonomy::list(client, taxonomy::Taxonomy::Category, args).await,
        "create_category" => taxonomy::create(client, taxonomy::Taxonomy::Category, args).await,
        "list_tags" => taxonomy::list(client, taxonomy::Taxonomy::Tag, args).await,
        "create_tag" => taxonomy::create(client, taxonomy::Taxonomy::Tag, args).await,
        "list_users" => users::list(client, args).await,
        "get_user" => users::get(client, args).await,
        "get_current_user" => users::current(client).await,
        "get_settings" => settings::get(client).await,
        "update_settings" => settings::update(client, args).await,
        _ => Err(ToolError::new(
            codes::NOT_FOUND,
            format!("Unknown tool '{name}'"),
        )),
    }
}

/// Header line for list results; zero totals mean WordPress sent no counts.
pub(crate) fn list_header<T>(result: &ListResult<T>, plural: &str, page: Option<u64>) -> String {
    if result.is_empty() {
        return format!("No {plural} found.");
    }
    let page = page.unwrap_or(1);
    match (result.total, result.total_pages) {
        (0, _) => format!("Showing {} {plural} (total unknown).", result.items.len()),
        (total, 0) => format!("Showing {} of {total} {plural}.", result.items.len()),
        (total, pages) => format!(
            "Showing {} of {total} {plural} (page {page} of {pages}).",
            result.items.len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wordpress::PageInfo;

    #[test]
    fn tool_names_are_unique() {
        let tools = tool_definitions();
        let mut names: Vec<&str> = tools.iter().map(|tool| tool.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), tools.len());
        assert_eq!(tools.len(), 30);
    }

    #[test]
    fn every_schema_is_an_object_schema() {
        for tool in tool_definitions() {
            assert_eq!(tool.input_schema["type"], "object", "{}", tool.name);
            assert!(!tool.description.is_empty(), "{}", tool.name);
        }
    }

    #[test]
    fn api_errors_keep_status_and_message() {
        let err: ToolError = WpError::Api {
            status: 404,
            message: "Invalid post ID.".to_string(),
        }
        .into();
        assert_eq!(err.code, "upstream_error");
        assert_eq!(err.message, "WordPress API error (404): Invalid post ID.");
        assert_eq!(err.details, Some(json!({ "status": 404 })));
        assert!(err.to_text().starts_with("Error [upstream_error]: WordPress API error (404)"));
    }

    #[test]
    fn list_header_treats_zero_totals_as_unknown() {
        let known = ListResult::new(vec![1, 2], PageInfo { total: 42, total_pages: 3 });
        assert_eq!(
            list_header(&known, "posts", Some(2)),
            "Showing 2 of 42 posts (page 2 of 3)."
        );
        let unknown = ListResult::new(vec![1], PageInfo::default());
        assert_eq!(list_header(&unknown, "posts", None), "Showing 1 posts (total unknown).");
        let empty: ListResult<u8> = ListResult::new(Vec::new(), PageInfo::default());
        assert_eq!(list_header(&empty, "tags", None), "No tags found.");
    }
}
