//! axe-core engine

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use super::{AccessibilityEngine, EngineReport};
use crate::browser::PageHandle;
use crate::config::{Conformance, WcagLevel, WcagVersion};
use crate::error::{ProbeError, Result};
use crate::types::{Impact, Violation, ViolationNode};

const ENGINE: &str = "axe";

pub struct AxeEngine {
    source: Arc<str>,
    best_practices: bool,
}

impl AxeEngine {
    pub fn new(source: Arc<str>, best_practices: bool) -> Self {
        Self {
            source,
            best_practices,
        }
    }
}

/// axe rule tags covering every version and tier up to `level`
pub fn axe_tags(level: &WcagLevel, best_practices: bool) -> Vec<String> {
    let versions: &[(WcagVersion, &str)] = &[
        (WcagVersion::V20, "wcag2"),
        (WcagVersion::V21, "wcag21"),
        (WcagVersion::V22, "wcag22"),
    ];
    let tiers: &[(Conformance, &str)] = &[
        (Conformance::A, "a"),
        (Conformance::AA, "aa"),
        (Conformance::AAA, "aaa"),
    ];

    let mut tags: Vec<String> = versions
        .iter()
        .filter(|(version, _)| *version <= level.version)
        .flat_map(|(_, prefix)| {
            tiers
                .iter()
                .filter(|(tier, _)| *tier <= level.conformance)
                .map(move |(_, suffix)| format!("{}{}", prefix, suffix))
        })
        .collect();
    if best_practices {
        tags.push("best-practice".to_string());
    }
    tags
}

#[derive(Debug, Deserialize)]
struct AxeResults {
    #[serde(default)]
    violations: Vec<AxeRule>,
    #[serde(default)]
    passes: Vec<Value>,
    #[serde(default)]
    incomplete: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AxeRule {
    id: String,
    #[serde(default)]
    impact: Option<Impact>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    help: String,
    #[serde(default)]
    help_url: String,
    #[serde(default)]
    nodes: Vec<AxeNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AxeNode {
    #[serde(default)]
    html: String,
    #[serde(default)]
    target: Vec<Value>,
    #[serde(default)]
    failure_summary: Option<String>,
}

/// Targets inside shadow roots / iframes come as nested selector lists
fn flatten_target(target: &Value) -> String {
    match target {
        Value::String(s) => s.clone(),
        Value::Array(parts) => parts
            .iter()
            .map(flatten_target)
            .collect::<Vec<_>>()
            .join(" >>> "),
        other => other.to_string(),
    }
}

/// Parse the JSON produced by `axe.run`
pub fn parse_axe_results(json: &str) -> Result<EngineReport> {
    let results: AxeResults = serde_json::from_str(json)
        .map_err(|e| ProbeError::engine(ENGINE, format!("unreadable results: {}", e)))?;

    let violations = results
        .violations
        .into_iter()
        .map(|rule| Violation {
            id: rule.id,
            impact: rule.impact,
            tags: rule.tags,
            description: rule.description,
            help: rule.help,
            help_url: rule.help_url,
            nodes: rule
                .nodes
                .into_iter()
                .map(|node| ViolationNode {
                    html: node.html,
                    target: node.target.iter().map(flatten_target).collect(),
                    failure_summary: node.failure_summary,
                })
                .collect(),
        })
        .collect();

    Ok(EngineReport {
        engine: ENGINE.to_string(),
        violations,
        passes: results.passes.len(),
        incomplete: results.incomplete.len(),
    })
}

impl AccessibilityEngine for AxeEngine {
    fn name(&self) -> &'static str {
        ENGINE
    }

    fn scan(&self, page: &dyn PageHandle, level: &WcagLevel) -> Result<EngineReport> {
        page.inject_script(&self.source)
            .map_err(|e| ProbeError::engine(ENGINE, format!("injection failed: {}", e)))?;

        let options = json!({
            "runOnly": {"type": "tag", "values": axe_tags(level, self.best_practices)},
            "resultTypes": ["violations"],
        });
        let expression = format!(
            "(async () => JSON.stringify(await axe.run(document, {})))()",
            options
        );

        let raw = page
            .evaluate(&expression, true)
            .map_err(|e| ProbeError::engine(ENGINE, e.to_string()))?;
        let json = raw
            .as_str()
            .ok_or_else(|| ProbeError::engine(ENGINE, "axe.run returned no results"))?;

        let report = parse_axe_results(json)?;
        tracing::debug!(
            violations = report.violations.len(),
            passes = report.passes,
            "axe scan complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axe_tags_for_levels() {
        let aa21 = WcagLevel::new(WcagVersion::V21, Conformance::AA);
        assert_eq!(
            axe_tags(&aa21, false),
            vec!["wcag2a", "wcag2aa", "wcag21a", "wcag21aa"]
        );

        let a20 = WcagLevel::new(WcagVersion::V20, Conformance::A);
        assert_eq!(axe_tags(&a20, true), vec!["wcag2a", "best-practice"]);

        let aaa22 = WcagLevel::new(WcagVersion::V22, Conformance::AAA);
        assert_eq!(axe_tags(&aaa22, false).len(), 9);
    }

    #[test]
    fn test_flatten_target() {
        assert_eq!(flatten_target(&json!("#main")), "#main");
        assert_eq!(
            flatten_target(&json!(["my-widget", "button.inner"])),
            "my-widget >>> button.inner"
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_axe_results("not json").unwrap_err();
        assert!(matches!(err, ProbeError::Engine { .. }));
    }
}
