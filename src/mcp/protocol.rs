//! MCP JSON-RPC protocol implementation

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::error::{ProbeError, Result};

/// MCP JSON-RPC request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl McpRequest {
    /// Notifications never get a response
    pub fn is_notification(&self) -> bool {
        self.id.is_none() || self.method.starts_with("notifications/")
    }
}

/// MCP JSON-RPC response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

/// MCP error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl McpResponse {
    /// Create a success response
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<Value>, code: i64, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(McpError {
                code,
                message,
                data: None,
            }),
        }
    }

    /// Create error from ProbeError
    pub fn from_error(id: Option<Value>, err: ProbeError) -> Self {
        Self::error(id, err.code(), err.to_string())
    }
}

/// Trait for handling MCP requests
///
/// Called from blocking worker threads; implementations may block for as
/// long as an audit takes.
pub trait McpHandler: Send + Sync {
    fn handle_request(&self, request: McpRequest) -> McpResponse;
}

/// Turn one input line into the response to write, if any
pub fn process_line<H: McpHandler + ?Sized>(handler: &H, line: &str) -> Option<McpResponse> {
    match serde_json::from_str::<McpRequest>(line) {
        Ok(request) => {
            let notification = request.is_notification();
            let response = handler.handle_request(request);
            (!notification).then_some(response)
        }
        Err(e) => Some(McpResponse::error(
            None,
            -32700,
            format!("Parse error: {}", e),
        )),
    }
}

/// MCP Server handling stdio communication
///
/// Requests are dispatched onto the blocking pool as they arrive, so a slow
/// audit does not hold up other calls. Responses go out through a single
/// writer task, one JSON document per line, in completion order.
pub struct McpServer<H>
where
    H: McpHandler,
{
    handler: Arc<H>,
}

impl<H: McpHandler + 'static> McpServer<H> {
    /// Create a new MCP server
    pub fn new(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Run the server until stdin closes and in-flight requests finish
    pub async fn run(&self) -> Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel::<McpResponse>();

        let writer = tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();
            while let Some(response) = rx.recv().await {
                let line = match serde_json::to_string(&response) {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::error!("Failed to serialize response: {}", e);
                        continue;
                    }
                };
                if let Err(e) = write_line(&mut stdout, &line).await {
                    tracing::error!("Error writing stdout: {}", e);
                    break;
                }
            }
        });

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break, // EOF
                Err(e) => {
                    tracing::error!("Error reading stdin: {}", e);
                    break;
                }
            };
            let trimmed = line.trim().to_string();
            if trimmed.is_empty() {
                continue;
            }

            let handler = Arc::clone(&self.handler);
            let tx = tx.clone();
            tokio::task::spawn_blocking(move || {
                if let Some(response) = process_line(handler.as_ref(), &trimmed) {
                    // The writer only goes away once every sender is dropped
                    let _ = tx.send(response);
                }
            });
        }

        drop(tx);
        writer
            .await
            .map_err(|e| ProbeError::Internal(format!("stdout writer failed: {}", e)))
    }
}

async fn write_line(stdout: &mut tokio::io::Stdout, line: &str) -> std::io::Result<()> {
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}

/// Standard MCP methods
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const LIST_TOOLS: &str = "tools/list";
    pub const CALL_TOOL: &str = "tools/call";
    pub const PING: &str = "ping";
}

/// MCP tool definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// MCP initialize result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

/// Server capabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    pub tools: Option<ToolsCapability>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsCapability {
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Server info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl Default for InitializeResult {
    fn default() -> Self {
        Self {
            protocol_version: "2024-11-05".to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: ServerInfo {
                name: "wcag-probe".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }
}

/// Tool call result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
}

impl ToolCallResult {
    /// Create a text result
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: None,
        }
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: Some(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    impl McpHandler for Echo {
        fn handle_request(&self, request: McpRequest) -> McpResponse {
            McpResponse::success(request.id, json!({"method": request.method}))
        }
    }

    #[test]
    fn test_notifications_get_no_response() {
        let line = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
        assert!(process_line(&Echo, line).is_none());

        let with_id = r#"{"jsonrpc":"2.0","id":3,"method":"notifications/cancelled"}"#;
        assert!(process_line(&Echo, with_id).is_none());
    }

    #[test]
    fn test_request_gets_response() {
        let line = r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#;
        let response = process_line(&Echo, line).unwrap();
        assert_eq!(response.id, Some(json!(7)));
        assert_eq!(response.result.unwrap()["method"], "ping");
    }

    #[test]
    fn test_parse_error() {
        let response = process_line(&Echo, "{not json").unwrap();
        assert_eq!(response.error.unwrap().code, -32700);
        assert!(response.id.is_none());
    }

    #[test]
    fn test_error_result_serialization() {
        let value = serde_json::to_value(ToolCallResult::error("boom")).unwrap();
        assert_eq!(value["isError"], true);
        assert_eq!(value["content"][0]["type"], "text");
        assert_eq!(value["content"][0]["text"], "boom");

        let ok = serde_json::to_value(ToolCallResult::text("fine")).unwrap();
        assert!(ok.get("isError").is_none());
    }

    #[test]
    fn test_from_error_uses_code() {
        let response = McpResponse::from_error(
            Some(json!(1)),
            ProbeError::InvalidInput("missing url".into()),
        );
        let error = response.error.unwrap();
        assert_eq!(error.code, -32602);
        assert!(error.message.contains("missing url"));
    }
}
