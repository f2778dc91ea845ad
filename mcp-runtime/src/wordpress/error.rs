use serde_json::Value;

/// Every way a WordPress REST call can fail.
///
/// `Api` carries the status and the message extracted from the response
/// body; `Transport` means no response was received at all.
#[derive(Debug, thiserror::Error)]
pub enum WpError {
    #[error("Failed to reach WordPress at {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("WordPress API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Unexpected response from WordPress ({status}): {message}")]
    Decode { status: u16, message: String },
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Invalid WordPress configuration: {0}")]
    InvalidConfig(String),
}

impl WpError {
    /// HTTP status of the failed call, 0 when the upstream never answered.
    pub fn status_code(&self) -> u16 {
        match self {
            WpError::Api { status, .. } | WpError::Decode { status, .. } => *status,
            WpError::Transport { .. } | WpError::InvalidRequest(_) | WpError::InvalidConfig(_) => 0,
        }
    }

    pub(crate) fn from_error_body(status: u16, body: &str) -> Self {
        WpError::Api {
            status,
            message: extract_error_message(body),
        }
    }
}

/// Pull the most useful message out of an error response body.
///
/// Priority: JSON `message`, then JSON `code`, then the raw body text.
pub fn extract_error_message(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        let field = |key: &str| {
            map.get(key)
                .and_then(Value::as_str)
                .filter(|text| !text.trim().is_empty())
                .map(str::to_string)
        };
        if let Some(message) = field("message").or_else(|| field("code")) {
            return message;
        }
    }
    body.to_string()
}
