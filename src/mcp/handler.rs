//! Request handler wiring the audit operations to MCP

use serde::Deserialize;
use serde_json::{json, Value};

use super::protocol::{
    methods, InitializeResult, McpHandler, McpRequest, McpResponse, ToolCallResult,
};
use super::tools::get_tool_definitions;
use crate::audit::{AuditOptions, Auditor, Target};
use crate::config::{EngineKind, WcagLevel};
use crate::error::{ProbeError, Result};
use crate::report::{render_keyboard, OutputFormat};

/// Arguments shared by `analyze_url`, `analyze_html` and `test_keyboard`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ToolArgs {
    url: Option<String>,
    html: Option<String>,
    engine: Option<String>,
    level: Option<String>,
    include_keyboard: Option<bool>,
    format: Option<String>,
}

impl ToolArgs {
    fn parse(arguments: Value) -> Result<Self> {
        if arguments.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(arguments)
            .map_err(|e| ProbeError::InvalidInput(format!("bad arguments: {}", e)))
    }

    fn options(&self) -> AuditOptions {
        AuditOptions {
            engine: self.engine.as_deref().map(EngineKind::parse_or_default),
            level: self.level.as_deref().map(WcagLevel::parse_or_default),
            include_keyboard: self.include_keyboard,
        }
    }

    fn format(&self) -> OutputFormat {
        self.format
            .as_deref()
            .map(OutputFormat::parse_or_default)
            .unwrap_or_default()
    }

    fn required(value: &Option<String>, name: &str) -> Result<String> {
        value
            .clone()
            .ok_or_else(|| ProbeError::InvalidInput(format!("'{}' is required", name)))
    }

    fn target(&self) -> Result<Target> {
        match (&self.url, &self.html) {
            (Some(url), None) => Ok(Target::Url(url.trim().to_string())),
            (None, Some(html)) => Ok(Target::Html(html.clone())),
            (Some(_), Some(_)) => Err(ProbeError::InvalidInput(
                "give either 'url' or 'html', not both".to_string(),
            )),
            (None, None) => Err(ProbeError::InvalidInput(
                "one of 'url' or 'html' is required".to_string(),
            )),
        }
    }
}

/// MCP request handler
pub struct ProbeHandler {
    auditor: Auditor,
}

impl ProbeHandler {
    pub fn new(auditor: Auditor) -> Self {
        Self { auditor }
    }

    /// Run a tool; failures become `isError` results, never protocol errors
    pub fn handle_tool_call(&self, name: &str, arguments: Value) -> ToolCallResult {
        let started = std::time::Instant::now();
        let outcome = match name {
            "analyze_url" => self.tool_analyze_url(arguments),
            "analyze_html" => self.tool_analyze_html(arguments),
            "test_keyboard" => self.tool_test_keyboard(arguments),
            _ => Err(ProbeError::InvalidInput(format!("Unknown tool: {}", name))),
        };

        match outcome {
            Ok(text) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                tracing::info!(tool = name, elapsed_ms, "Tool call finished");
                ToolCallResult::text(text)
            }
            Err(e) => {
                tracing::warn!(tool = name, code = e.code(), "Tool call failed: {}", e);
                let hint = if e.is_retryable() {
                    " (transient; retrying may help)"
                } else {
                    ""
                };
                ToolCallResult::error(format!("{}{}", e, hint))
            }
        }
    }

    fn tool_analyze_url(&self, arguments: Value) -> Result<String> {
        let args = ToolArgs::parse(arguments)?;
        let url = ToolArgs::required(&args.url, "url")?;
        let report = self.auditor.analyze_url(&url, &args.options())?;
        report.render(args.format())
    }

    fn tool_analyze_html(&self, arguments: Value) -> Result<String> {
        let args = ToolArgs::parse(arguments)?;
        let html = ToolArgs::required(&args.html, "html")?;
        let report = self.auditor.analyze_html(&html, &args.options())?;
        report.render(args.format())
    }

    fn tool_test_keyboard(&self, arguments: Value) -> Result<String> {
        let args = ToolArgs::parse(arguments)?;
        let target = args.target()?;
        let result = self.auditor.test_keyboard(&target)?;
        render_keyboard(target.label(), &result, args.format())
    }
}

impl McpHandler for ProbeHandler {
    fn handle_request(&self, request: McpRequest) -> McpResponse {
        match request.method.as_str() {
            methods::INITIALIZE => {
                let result = InitializeResult::default();
                McpResponse::success(request.id, json!(result))
            }
            methods::INITIALIZED => {
                // Notification, no response needed
                McpResponse::success(request.id, json!({}))
            }
            methods::PING => McpResponse::success(request.id, json!({})),
            methods::LIST_TOOLS => {
                let tools = get_tool_definitions();
                McpResponse::success(request.id, json!({"tools": tools}))
            }
            methods::CALL_TOOL => {
                let name = request
                    .params
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                let arguments = request
                    .params
                    .get("arguments")
                    .cloned()
                    .unwrap_or(json!({}));

                let result = self.handle_tool_call(name, arguments);
                McpResponse::success(request.id, json!(result))
            }
            _ => McpResponse::error(
                request.id,
                -32601,
                format!("Method not found: {}", request.method),
            ),
        }
    }
}
