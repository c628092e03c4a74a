//! Audit reports and their Markdown / JSON renderings

use std::collections::BTreeMap;
use std::fmt::Write;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::WcagLevel;
use crate::engines::EngineReport;
use crate::error::{ProbeError, Result};
use crate::keyboard::keyboard_violations;
use crate::types::{Impact, KeyboardTestResult, Violation};

/// Nodes listed per violation in Markdown before the rest are summarized
const MAX_LISTED_NODES: usize = 10;

/// Focus order entries listed in Markdown
const MAX_LISTED_FOCUS: usize = 50;

/// Tool output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}

impl OutputFormat {
    pub fn parse_or_default(value: &str) -> Self {
        value.parse().unwrap_or_else(|e: ProbeError| {
            tracing::warn!("{}; using markdown", e);
            OutputFormat::Markdown
        })
    }
}

impl FromStr for OutputFormat {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "markdown" | "md" | "text" => Ok(OutputFormat::Markdown),
            "json" => Ok(OutputFormat::Json),
            _ => Err(ProbeError::Config(format!("Unknown output format: {}", s))),
        }
    }
}

/// Result of one audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub run_id: Uuid,
    pub url: String,
    pub engines: Vec<String>,
    pub level: String,
    pub timestamp: DateTime<Utc>,
    pub violations: Vec<Violation>,
    pub passes: usize,
    pub incomplete: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyboard: Option<KeyboardTestResult>,
}

impl AuditReport {
    pub fn new(url: impl Into<String>, level: &WcagLevel) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            url: url.into(),
            engines: Vec::new(),
            level: level.to_string(),
            timestamp: Utc::now(),
            violations: Vec::new(),
            passes: 0,
            incomplete: 0,
            keyboard: None,
        }
    }

    /// Fold one engine's findings in
    pub fn merge_engine(&mut self, report: EngineReport) {
        self.engines.push(report.engine);
        self.violations.extend(report.violations);
        self.passes += report.passes;
        self.incomplete += report.incomplete;
    }

    /// Attach a keyboard result; its findings also become violation records
    pub fn attach_keyboard(&mut self, result: KeyboardTestResult) {
        self.violations.extend(keyboard_violations(&result));
        self.keyboard = Some(result);
    }

    /// Number of failing elements across all violations
    pub fn affected_nodes(&self) -> usize {
        self.violations.iter().map(|v| v.nodes.len()).sum()
    }

    /// Violations per impact, most severe first; unrated rules are skipped
    pub fn impact_counts(&self) -> Vec<(Impact, usize)> {
        let mut counts: BTreeMap<Impact, usize> = BTreeMap::new();
        for impact in self.violations.iter().filter_map(|v| v.impact) {
            *counts.entry(impact).or_default() += 1;
        }
        counts.into_iter().rev().collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Accessibility Report\n");
        let _ = writeln!(out, "- **URL:** {}", self.url);
        let _ = writeln!(out, "- **Standard:** {}", self.level);
        let _ = writeln!(out, "- **Engines:** {}", display_list(&self.engines));
        let _ = writeln!(
            out,
            "- **Run:** {} ({})\n",
            self.run_id,
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        );

        let _ = writeln!(out, "## Summary\n");
        if self.violations.is_empty() {
            let _ = writeln!(out, "No violations found.\n");
        } else {
            let _ = writeln!(
                out,
                "{} violations affecting {} elements.\n",
                self.violations.len(),
                self.affected_nodes()
            );
            let _ = writeln!(out, "| Impact | Rules |");
            let _ = writeln!(out, "|--------|-------|");
            for (impact, count) in self.impact_counts() {
                let _ = writeln!(out, "| {} | {} |", impact, count);
            }
            let _ = writeln!(out);
        }
        let _ = writeln!(
            out,
            "Passed rules: {}. Results needing manual review: {}.\n",
            self.passes, self.incomplete
        );

        if !self.violations.is_empty() {
            let _ = writeln!(out, "## Violations\n");
            let mut ordered: Vec<&Violation> = self.violations.iter().collect();
            ordered.sort_by(|a, b| b.impact.cmp(&a.impact));
            for (i, violation) in ordered.into_iter().enumerate() {
                write_violation(&mut out, i + 1, violation);
            }
        }

        if let Some(keyboard) = &self.keyboard {
            out.push_str(&keyboard_markdown(keyboard));
        }

        out
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Markdown => Ok(self.to_markdown()),
            OutputFormat::Json => self.to_json(),
        }
    }
}

fn write_violation(out: &mut String, number: usize, violation: &Violation) {
    let impact = violation
        .impact
        .map(|i| i.to_string())
        .unwrap_or_else(|| "unrated".to_string());
    let _ = writeln!(out, "### {}. `{}` ({})\n", number, violation.id, impact);
    let _ = writeln!(out, "**{}**\n", violation.help);
    if !violation.description.is_empty() && violation.description != violation.help {
        let _ = writeln!(out, "{}\n", violation.description);
    }
    if !violation.help_url.is_empty() {
        let _ = writeln!(out, "More: {}\n", violation.help_url);
    }
    if !violation.tags.is_empty() {
        let _ = writeln!(out, "Tags: {}\n", violation.tags.join(", "));
    }

    for node in violation.nodes.iter().take(MAX_LISTED_NODES) {
        let target = node.target.join(" ");
        match &node.failure_summary {
            Some(summary) => {
                let _ = writeln!(out, "- `{}`: {}", target, one_line(summary));
            }
            None => {
                let _ = writeln!(out, "- `{}`", target);
            }
        }
    }
    if violation.nodes.len() > MAX_LISTED_NODES {
        let _ = writeln!(
            out,
            "- ...and {} more",
            violation.nodes.len() - MAX_LISTED_NODES
        );
    }
    let _ = writeln!(out);
}

/// Markdown section for a keyboard walk
pub fn keyboard_markdown(result: &KeyboardTestResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "## Keyboard Navigation\n");
    let _ = writeln!(
        out,
        "- Focusable elements: {}",
        result.total_focusable_elements
    );
    let _ = writeln!(out, "- Elements reached with Tab: {}", result.tested_elements);
    let _ = writeln!(out, "- Keyboard traps: {}", result.keyboard_traps.len());
    let _ = writeln!(
        out,
        "- Unfocusable interactive elements: {}\n",
        result.unfocusable_interactive.len()
    );

    if !result.keyboard_traps.is_empty() {
        let _ = writeln!(out, "### Keyboard Traps\n");
        for trap in &result.keyboard_traps {
            let _ = writeln!(out, "- `{}`: {}", trap.selector, trap.issue);
        }
        let _ = writeln!(out);
    }

    if !result.unfocusable_interactive.is_empty() {
        let _ = writeln!(out, "### Unfocusable Interactive Elements\n");
        for element in &result.unfocusable_interactive {
            match &element.role {
                Some(role) => {
                    let _ = writeln!(out, "- `{}` (role `{}`)", element.selector, role);
                }
                None => {
                    let _ = writeln!(out, "- `{}` (event handler)", element.selector);
                }
            }
        }
        let _ = writeln!(out);
    }

    if !result.dialog_escapes.is_empty() {
        let _ = writeln!(out, "### Dialog Escape\n");
        for escape in &result.dialog_escapes {
            let status = if escape.escaped_successfully {
                "closed"
            } else {
                "FAILED"
            };
            let _ = writeln!(
                out,
                "- `{}`: {}. {}",
                escape.dialog_selector, status, escape.note
            );
        }
        let _ = writeln!(out);
    }

    if !result.button_activations.is_empty() {
        let _ = writeln!(out, "### Enter Activation\n");
        let _ = writeln!(out, "| Element | Activated | Dialog | Expanded | Note |");
        let _ = writeln!(out, "|---------|-----------|--------|----------|------|");
        for activation in &result.button_activations {
            let _ = writeln!(
                out,
                "| `{}` | {} | {} | {} | {} |",
                cell(&activation.selector),
                yes_no(activation.activated),
                yes_no(activation.triggered_dialog),
                yes_no(activation.expanded_content),
                cell(&activation.note)
            );
        }
        let _ = writeln!(out);
    }

    if !result.focus_order.is_empty() {
        let _ = writeln!(out, "### Focus Order\n");
        for item in result.focus_order.iter().take(MAX_LISTED_FOCUS) {
            let _ = writeln!(out, "{}. `{}`", item.index, item.selector);
        }
        if result.focus_order.len() > MAX_LISTED_FOCUS {
            let _ = writeln!(
                out,
                "\n...and {} more",
                result.focus_order.len() - MAX_LISTED_FOCUS
            );
        }
        let _ = writeln!(out);
    }

    out
}

/// Render a standalone keyboard result
pub fn render_keyboard(
    url: &str,
    result: &KeyboardTestResult,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
            "url": url,
            "keyboard": result,
            "violations": keyboard_violations(result),
        }))?),
        OutputFormat::Markdown => Ok(format!(
            "# Keyboard Accessibility Report\n\n- **URL:** {}\n\n{}",
            url,
            keyboard_markdown(result)
        )),
    }
}

fn display_list(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn cell(text: &str) -> String {
    one_line(text).replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ButtonActivation, FocusOrderItem, KeyboardTrap, ViolationNode};
    use pretty_assertions::assert_eq;

    fn violation(id: &str, impact: Impact, nodes: usize) -> Violation {
        Violation {
            id: id.to_string(),
            impact: Some(impact),
            tags: vec!["wcag2a".to_string()],
            description: format!("{} description", id),
            help: format!("{} help", id),
            help_url: format!("https://example.test/{}", id),
            nodes: (0..nodes)
                .map(|i| ViolationNode {
                    html: format!("<img id=\"i{}\">", i),
                    target: vec![format!("#i{}", i)],
                    failure_summary: Some("Fix this\nnow".to_string()),
                })
                .collect(),
        }
    }

    fn report() -> AuditReport {
        let mut report = AuditReport::new("https://example.test", &WcagLevel::default());
        report.merge_engine(EngineReport {
            engine: "axe".to_string(),
            violations: vec![
                violation("image-alt", Impact::Critical, 12),
                violation("region", Impact::Moderate, 1),
            ],
            passes: 20,
            incomplete: 2,
        });
        report
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(OutputFormat::parse_or_default("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse_or_default("md"), OutputFormat::Markdown);
        assert_eq!(OutputFormat::parse_or_default("xml"), OutputFormat::Markdown);
    }

    #[test]
    fn test_merge_and_counts() {
        let mut report = report();
        report.merge_engine(EngineReport {
            engine: "ace".to_string(),
            violations: vec![violation("img_alt_valid", Impact::Serious, 1)],
            passes: 5,
            incomplete: 0,
        });

        assert_eq!(report.engines, vec!["axe", "ace"]);
        assert_eq!(report.passes, 25);
        assert_eq!(report.affected_nodes(), 14);
        assert_eq!(
            report.impact_counts(),
            vec![(Impact::Critical, 1), (Impact::Serious, 1), (Impact::Moderate, 1)]
        );
    }

    #[test]
    fn test_keyboard_findings_become_violations() {
        let mut report = report();
        report.attach_keyboard(KeyboardTestResult {
            total_focusable_elements: 1,
            tested_elements: 1,
            keyboard_traps: vec![KeyboardTrap {
                selector: "div#trap".into(),
                html: "<div id=\"trap\">".into(),
                issue: "stuck".into(),
            }],
            ..Default::default()
        });

        assert_eq!(report.violations.len(), 3);
        assert_eq!(report.violations[2].id, "keyboard-trap");
        assert!(report.keyboard.is_some());
    }

    #[test]
    fn test_markdown_rendering() {
        let mut report = report();
        report.attach_keyboard(KeyboardTestResult {
            total_focusable_elements: 2,
            tested_elements: 2,
            focus_order: vec![FocusOrderItem {
                index: 1,
                selector: "a#home".into(),
                html: "<a id=\"home\">".into(),
                tag_name: "a".into(),
            }],
            button_activations: vec![ButtonActivation {
                selector: "button#menu".into(),
                html: "<button id=\"menu\">".into(),
                activated: true,
                triggered_dialog: false,
                expanded_content: true,
                note: "aria-expanded changed | toggled".into(),
            }],
            ..Default::default()
        });

        let md = report.to_markdown();
        assert!(md.starts_with("# Accessibility Report"));
        assert!(md.contains("- **Standard:** WCAG 2.1 AA"));
        assert!(md.contains("### 1. `image-alt` (critical)"));
        assert!(md.contains("- `#i0`: Fix this now"));
        assert!(md.contains("- ...and 2 more"));
        assert!(md.contains("## Keyboard Navigation"));
        assert!(md.contains("1. `a#home`"));
        assert!(md.contains("aria-expanded changed \\| toggled"));
    }

    #[test]
    fn test_empty_report() {
        let report = AuditReport::new("about:blank", &WcagLevel::default());
        let md = report.to_markdown();
        assert!(md.contains("No violations found."));
        assert!(md.contains("- **Engines:** none"));
    }

    #[test]
    fn test_json_rendering() {
        let json: serde_json::Value =
            serde_json::from_str(&report().render(OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["url"], "https://example.test");
        assert_eq!(json["violations"][0]["helpUrl"], "https://example.test/image-alt");
        assert!(json.get("keyboard").is_none());
        assert!(json["runId"].is_string());
    }

    #[test]
    fn test_standalone_keyboard_render() {
        let result = KeyboardTestResult::default();
        let json: serde_json::Value = serde_json::from_str(
            &render_keyboard("https://example.test", &result, OutputFormat::Json).unwrap(),
        )
        .unwrap();
        assert_eq!(json["keyboard"]["testedElements"], 0);
        assert!(json["violations"].as_array().unwrap().is_empty());

        let md = render_keyboard("https://example.test", &result, OutputFormat::Markdown).unwrap();
        assert!(md.starts_with("# Keyboard Accessibility Report"));
    }
}
