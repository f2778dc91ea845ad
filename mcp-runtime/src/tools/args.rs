use serde_json::{Map, Value};
use wp_mcp_core::error::codes;

use super::ToolError;

fn invalid(key: &str, message: String) -> ToolError {
    ToolError::new(codes::VALIDATION_FAILED, message).with_field(key)
}

pub(crate) fn arg_bool(args: &Map<String, Value>, key: &str, default: bool) -> Result<bool, ToolError> {
    Ok(arg_optional_bool(args, key)?.unwrap_or(default))
}

pub(crate) fn arg_optional_bool(args: &Map<String, Value>, key: &str) -> Result<Option<bool>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(v)) => Ok(Some(*v)),
        Some(_) => Err(invalid(key, format!("'{key}' must be a boolean"))),
    }
}

pub(crate) fn required_string(args: &Map<String, Value>, key: &str) -> Result<String, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Err(invalid(key, format!("Missing required field '{key}'"))),
        Some(Value::String(v)) if !v.trim().is_empty() => Ok(v.clone()),
        Some(Value::String(_)) => Err(invalid(key, format!("'{key}' must not be empty"))),
        Some(_) => Err(invalid(key, format!("'{key}' must be a string"))),
    }
}

/// Optional string; an empty string counts as absent.
pub(crate) fn arg_optional_string(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<String>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(v)) if v.trim().is_empty() => Ok(None),
        Some(Value::String(v)) => Ok(Some(v.clone())),
        Some(_) => Err(invalid(key, format!("'{key}' must be a string"))),
    }
}

/// Optional text that may legitimately be set to an empty string
/// (e.g. clearing an excerpt or alt text).
pub(crate) fn arg_optional_text(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<String>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(v)) => Ok(Some(v.clone())),
        Some(_) => Err(invalid(key, format!("'{key}' must be a string"))),
    }
}

fn as_u64(value: &Value, key: &str) -> Result<u64, ToolError> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| invalid(key, format!("'{key}' must be an unsigned integer"))),
        // Agents frequently quote numeric ids.
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| invalid(key, format!("'{key}' must be an unsigned integer"))),
        _ => Err(invalid(key, format!("'{key}' must be an unsigned integer"))),
    }
}

pub(crate) fn arg_optional_u64(args: &Map<String, Value>, key: &str) -> Result<Option<u64>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => as_u64(value, key).map(Some),
    }
}

pub(crate) fn required_u64(args: &Map<String, Value>, key: &str) -> Result<u64, ToolError> {
    arg_optional_u64(args, key)?
        .ok_or_else(|| invalid(key, format!("Missing required field '{key}'")))
}

/// Page size, clamped to the 1..=100 range WordPress accepts.
pub(crate) fn arg_per_page(args: &Map<String, Value>) -> Result<Option<u64>, ToolError> {
    Ok(arg_optional_u64(args, "per_page")?.map(|n| n.clamp(1, 100)))
}

pub(crate) fn arg_optional_string_array(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<Vec<String>>, ToolError> {
    let Some(value) = args.get(key) else {
        return Ok(None);
    };
    match value {
        Value::Null => Ok(None),
        // A single string is accepted as a one-element list.
        Value::String(single) => Ok(Some(
            single
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                let text = item
                    .as_str()
                    .ok_or_else(|| invalid(key, format!("'{key}' items must be strings")))?;
                let normalized = text.trim();
                if !normalized.is_empty() {
                    out.push(normalized.to_string());
                }
            }
            Ok(Some(out))
        }
        _ => Err(invalid(key, format!("'{key}' must be an array of strings"))),
    }
}

pub(crate) fn arg_optional_u64_array(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<Vec<u64>>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| as_u64(item, key))
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(single @ (Value::Number(_) | Value::String(_))) => Ok(Some(vec![as_u64(single, key)?])),
        Some(_) => Err(invalid(key, format!("'{key}' must be an array of integers"))),
    }
}

/// Restrict a string argument to a fixed vocabulary.
pub(crate) fn arg_optional_choice(
    args: &Map<String, Value>,
    key: &str,
    allowed: &[&str],
) -> Result<Option<String>, ToolError> {
    let Some(value) = arg_optional_string(args, key)? else {
        return Ok(None);
    };
    let normalized = value.trim().to_lowercase();
    if allowed.contains(&normalized.as_str()) {
        Ok(Some(normalized))
    } else {
        Err(invalid(
            key,
            format!("'{key}' must be one of: {}", allowed.join(", ")),
        ))
    }
}
