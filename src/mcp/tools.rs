//! MCP tool definitions for wcag-probe

use serde_json::json;

use super::protocol::ToolDefinition;

/// All tool definitions for wcag-probe
pub const TOOL_DEFINITIONS: &[(&str, &str, &str)] = &[
    (
        "analyze_url",
        "Audit a live web page for WCAG accessibility issues. Renders the page in Chrome, runs axe-core and/or IBM Equal Access, and (by default) an automated keyboard walk that finds keyboard traps, unreachable controls and dialogs that ignore Escape.",
        r#"{
            "type": "object",
            "properties": {
                "url": {"type": "string", "description": "Page to audit (http, https or file URL)"},
                "engine": {"type": "string", "enum": ["axe", "ace", "both"], "description": "Rule engine; defaults to the server setting"},
                "level": {"type": "string", "description": "WCAG conformance target such as 'wcag21aa', 'WCAG 2.2 AA' or 'wcag2a'; defaults to the server setting"},
                "include_keyboard": {"type": "boolean", "description": "Run the keyboard walk; defaults to the server setting"},
                "format": {"type": "string", "enum": ["markdown", "json"], "default": "markdown"}
            },
            "required": ["url"]
        }"#,
    ),
    (
        "analyze_html",
        "Audit an HTML document passed inline. Same checks as analyze_url; relative resources in the markup will not load.",
        r#"{
            "type": "object",
            "properties": {
                "html": {"type": "string", "description": "Complete HTML document or fragment"},
                "engine": {"type": "string", "enum": ["axe", "ace", "both"]},
                "level": {"type": "string", "description": "WCAG conformance target"},
                "include_keyboard": {"type": "boolean"},
                "format": {"type": "string", "enum": ["markdown", "json"], "default": "markdown"}
            },
            "required": ["html"]
        }"#,
    ),
    (
        "test_keyboard",
        "Run only the keyboard walk: Tab through the page, press Enter on button-like controls, press Escape in dialogs. Reports focus order, keyboard traps, unfocusable interactive elements, dialog escapes and Enter activations. Give exactly one of url or html.",
        r#"{
            "type": "object",
            "properties": {
                "url": {"type": "string", "description": "Page to test"},
                "html": {"type": "string", "description": "Inline HTML to test instead of a URL"},
                "format": {"type": "string", "enum": ["markdown", "json"], "default": "markdown"}
            }
        }"#,
    ),
];

/// Get all tool definitions as ToolDefinition structs
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    TOOL_DEFINITIONS
        .iter()
        .map(|(name, description, schema)| ToolDefinition {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: serde_json::from_str(schema).unwrap_or(json!({})),
        })
        .collect()
}
