use serde_json::{Map, Value, json};
use wp_mcp_core::error::codes;

use super::{ToolDefinition, ToolError};
use crate::util::to_pretty_json;
use crate::wordpress::WpClient;

/// Core settings exposed by `/settings`. Anything else is rejected locally
/// rather than silently ignored by WordPress.
const WRITABLE_SETTINGS: [&str; 13] = [
    "title",
    "description",
    "url",
    "email",
    "timezone",
    "date_format",
    "time_format",
    "start_of_week",
    "language",
    "posts_per_page",
    "default_category",
    "default_comment_status",
    "default_ping_status",
];

pub async fn get(client: &WpClient) -> Result<String, ToolError> {
    let settings = client.settings().await?;
    Ok(to_pretty_json(&settings))
}

fn settings_body(args: &Map<String, Value>) -> Result<Map<String, Value>, ToolError> {
    let mut body = Map::new();
    for (key, value) in args {
        if !WRITABLE_SETTINGS.contains(&key.as_str()) {
            return Err(ToolError::new(
                codes::VALIDATION_FAILED,
                format!("Unknown setting '{key}'"),
            )
            .with_field(key.clone())
            .with_details(json!({ "allowed": WRITABLE_SETTINGS })));
        }
        if !value.is_null() {
            body.insert(key.clone(), value.clone());
        }
    }
    if body.is_empty() {
        return Err(ToolError::no_fields_to_update());
    }
    Ok(body)
}

pub async fn update(client: &WpClient, args: &Map<String, Value>) -> Result<String, ToolError> {
    let body = settings_body(args)?;
    let changed: Vec<String> = body.keys().cloned().collect();
    let settings = client.update_settings(Value::Object(body)).await?;
    Ok(format!(
        "Updated settings: {}\n{}",
        changed.join(", "),
        to_pretty_json(&settings)
    ))
}

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_settings",
            description: "Read the site settings (title, tagline, timezone, formats, defaults).",
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        ToolDefinition {
            name: "update_settings",
            description: "Update one or more site settings. Requires an administrator account.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "description": { "type": "string" },
                    "url": { "type": "string" },
                    "email": { "type": "string" },
                    "timezone": { "type": "string" },
                    "date_format": { "type": "string" },
                    "time_format": { "type": "string" },
                    "start_of_week": { "type": "integer", "minimum": 0, "maximum": 6 },
                    "language": { "type": "string" },
                    "posts_per_page": { "type": "integer", "minimum": 1 },
                    "default_category": { "type": "integer" },
                    "default_comment_status": { "type": "string", "enum": ["open", "closed"] },
                    "default_ping_status": { "type": "string", "enum": ["open", "closed"] }
                }
            }),
        },
    ]
}
