use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Subcommand};
use serde_json::{Map, Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use uuid::Uuid;
use wp_mcp_core::auth::Credential;

pub mod tools;
mod util;
pub mod wordpress;

use tools::{ToolAccess, ToolError, call_tool, is_known_tool, tool_definitions};
use util::to_pretty_json;
use wordpress::{WpClient, WpError};

pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
pub const MCP_SERVER_NAME: &str = "wp-mcp";

#[derive(Subcommand)]
pub enum McpCommands {
    /// Run the WordPress MCP server over stdio
    Serve(WordPressArgs),
    /// Verify the configured credentials against the site and exit
    Check(WordPressArgs),
}

/// WordPress connection settings shared by every binary.
#[derive(Args, Clone, Debug, Default)]
pub struct WordPressArgs {
    /// Site root, e.g. https://example.com
    #[arg(long, env = "WORDPRESS_SITE_URL")]
    pub site_url: Option<String>,
    /// Account that owns the application password
    #[arg(long, env = "WORDPRESS_USERNAME")]
    pub username: Option<String>,
    /// Application password (Users > Profile > Application Passwords)
    #[arg(long, env = "WORDPRESS_APP_PASSWORD", hide_env_values = true)]
    pub app_password: Option<String>,
}

impl WordPressArgs {
    /// `Ok(None)` when any of the three settings is missing.
    pub fn build_client(&self) -> Result<Option<WpClient>, WpError> {
        let (Some(site_url), Some(username), Some(app_password)) = (
            non_empty(&self.site_url),
            non_empty(&self.username),
            non_empty(&self.app_password),
        ) else {
            return Ok(None);
        };
        // Application passwords are displayed in groups separated by spaces.
        let secret: String = app_password.chars().filter(|c| !c.is_whitespace()).collect();
        WpClient::new(site_url, &Credential::new(username, secret)).map(Some)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub async fn run(command: McpCommands) -> i32 {
    match command {
        McpCommands::Serve(args) => {
            let client = match args.build_client() {
                Ok(client) => client,
                Err(err) => {
                    tracing::error!(error = %err, "invalid WordPress configuration");
                    return 1;
                }
            };
            if client.is_none() {
                tracing::warn!(
                    "WordPress credentials missing; tools will report wordpress_not_configured"
                );
            }
            let server = McpServer::new(client.map(Arc::new), format!("stdio-{}", Uuid::now_v7()))
                .with_access(ToolAccess::LOCAL);
            let stdin = BufReader::new(tokio::io::stdin());
            let stdout = tokio::io::stdout();
            match server.serve_lines(stdin, stdout).await {
                Ok(()) => 0,
                Err(err) => {
                    tracing::error!(error = %err, "stdio transport failed");
                    1
                }
            }
        }
        McpCommands::Check(args) => {
            let client = match args.build_client() {
                Ok(Some(client)) => client,
                Ok(None) => {
                    eprintln!("{}", to_pretty_json(&ToolError::not_configured().to_value()));
                    return 1;
                }
                Err(err) => {
                    eprintln!("{}", to_pretty_json(&ToolError::from(err).to_value()));
                    return 1;
                }
            };
            match tools::users::current(&client).await {
                Ok(text) => {
                    println!(
                        "{}",
                        to_pretty_json(&json!({
                            "status": "ok",
                            "site_url": client.site_url(),
                            "api_base": client.api_base(),
                            "message": text,
                        }))
                    );
                    0
                }
                Err(err) => {
                    eprintln!("{}", to_pretty_json(&err.to_value()));
                    2
                }
            }
        }
    }
}

/// JSON-RPC dispatcher for one MCP session.
///
/// Holds no per-request state, so the HTTP gateway creates one per SSE
/// session and the stdio binary one per process.
pub struct McpServer {
    client: Option<Arc<WpClient>>,
    session_id: String,
    access: ToolAccess,
}

impl McpServer {
    /// A server without local file access; see [`McpServer::with_access`].
    pub fn new(client: Option<Arc<WpClient>>, session_id: impl Into<String>) -> Self {
        Self {
            client,
            session_id: session_id.into(),
            access: ToolAccess::default(),
        }
    }

    pub fn with_access(mut self, access: ToolAccess) -> Self {
        self.access = access;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Newline-delimited JSON-RPC loop; returns on EOF.
    pub async fn serve_lines<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!(
            event = "mcp_session_started",
            session_id = %self.session_id,
            wordpress_configured = self.client.is_some(),
            "serving MCP over stdio"
        );
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            for response in self.handle_raw_message(&line).await {
                let mut encoded = serde_json::to_vec(&response).map_err(std::io::Error::other)?;
                encoded.push(b'\n');
                writer.write_all(&encoded).await?;
            }
            writer.flush().await?;
        }
        tracing::info!(event = "mcp_session_ended", session_id = %self.session_id, "stdin closed");
        Ok(())
    }

    /// Parse one wire message; malformed JSON yields a -32700 response.
    pub async fn handle_raw_message(&self, raw: &str) -> Vec<Value> {
        match serde_json::from_str::<Value>(raw) {
            Ok(incoming) => self.handle_incoming_message(incoming).await,
            Err(err) => vec![error_response(
                Value::Null,
                RpcError::parse_error(format!("Invalid JSON: {err}")),
            )],
        }
    }

    pub async fn handle_incoming_message(&self, incoming: Value) -> Vec<Value> {
        let mut responses = Vec::new();

        if let Some(batch) = incoming.as_array() {
            if batch.is_empty() {
                responses.push(error_response(
                    Value::Null,
                    RpcError::invalid_request("Batch request must not be empty"),
                ));
                return responses;
            }
            for item in batch {
                if let Some(response) = self.handle_single_message(item.clone()).await {
                    responses.push(response);
                }
            }
            return responses;
        }

        if let Some(response) = self.handle_single_message(incoming).await {
            responses.push(response);
        }
        responses
    }

    async fn handle_single_message(&self, incoming: Value) -> Option<Value> {
        let Some(obj) = incoming.as_object() else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };

        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            let id = obj.get("id").cloned().unwrap_or(Value::Null);
            return Some(error_response(
                id,
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        let Some(method) = obj.get("method").and_then(Value::as_str) else {
            // A client response; this server never issues requests.
            return None;
        };

        let params = obj.get("params").cloned().unwrap_or(Value::Null);
        match obj.get("id").cloned() {
            Some(id) => Some(match self.handle_request(method, params).await {
                Ok(payload) => success_response(id, payload),
                Err(err) => error_response(id, err),
            }),
            None => {
                tracing::debug!(session_id = %self.session_id, method, "notification");
                None
            }
        }
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(self.initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(tools_list_payload()),
            "tools/call" => self.handle_tools_call(params).await,
            "resources/list" => Ok(json!({ "resources": [] })),
            "prompts/list" => Ok(json!({ "prompts": [] })),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    fn initialize_payload(&self) -> Value {
        let instructions = match &self.client {
            Some(client) => format!(
                "Manage the WordPress site at {} through its REST API. List tools accept page/per_page; deletes of posts, pages and comments go to the trash unless force=true; media deletes are permanent.",
                client.site_url()
            ),
            None => "WordPress credentials are not configured; every tool call will fail until WORDPRESS_SITE_URL, WORDPRESS_USERNAME and WORDPRESS_APP_PASSWORD are set.".to_string(),
        };
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false },
                "resources": { "listChanged": false },
                "prompts": { "listChanged": false }
            },
            "serverInfo": {
                "name": MCP_SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            },
            "instructions": instructions
        })
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;

        let args = match params.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::Null) | None => Map::new(),
            Some(_) => {
                return Err(RpcError::invalid_params(
                    "tools/call 'arguments' must be an object",
                ));
            }
        };

        if !is_known_tool(name) {
            return Err(RpcError::invalid_params(format!("Unknown tool: {name}")));
        }

        let Some(client) = &self.client else {
            return Ok(tool_result(ToolError::not_configured().to_text(), true));
        };

        let started = Instant::now();
        let outcome = call_tool(client, name, &args, self.access).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(text) => {
                tracing::info!(
                    event = "tool_call",
                    session_id = %self.session_id,
                    tool = name,
                    elapsed_ms,
                    "tool succeeded"
                );
                Ok(tool_result(text, false))
            }
            Err(err) => {
                tracing::warn!(
                    event = "tool_call",
                    session_id = %self.session_id,
                    tool = name,
                    elapsed_ms,
                    error = %err.code,
                    message = %err.message,
                    "tool failed"
                );
                Ok(tool_result(err.to_text(), true))
            }
        }
    }
}

fn tools_list_payload() -> Value {
    let tools: Vec<Value> = tool_definitions()
        .into_iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "inputSchema": tool.input_schema,
            })
        })
        .collect();
    json!({ "tools": tools })
}

fn tool_result(text: String, is_error: bool) -> Value {
    let mut result = json!({
        "content": [{ "type": "text", "text": text }]
    });
    if is_error {
        result["isError"] = Value::Bool(true);
    }
    result
}

#[derive(Debug)]
struct RpcError {
    code: i64,
    message: String,
    data: Option<Value>,
}

impl RpcError {
    fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: -32700,
            message: message.into(),
            data: None,
        }
    }

    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
            data: None,
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
            data: Some(json!({ "method": method })),
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
            data: None,
        }
    }
}

fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn error_response(id: Value, error: RpcError) -> Value {
    let mut payload = json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": error.code,
            "message": error.message
        }
    });
    if let Some(data) = error.data {
        payload["error"]["data"] = data;
    }
    payload
}
