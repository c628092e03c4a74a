//! IBM Equal Access (ACE) engine
//!
//! ACE reports each result with a `[category, outcome]` pair such as
//! `["VIOLATION", "POTENTIAL"]`. Those pairs collapse into [`AceLevel`],
//! results are filtered by the configured levels, then grouped per rule
//! so the output lines up with axe's one-record-per-rule shape.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{AccessibilityEngine, EngineReport};
use crate::browser::PageHandle;
use crate::config::{WcagLevel, WcagVersion};
use crate::error::{ProbeError, Result};
use crate::types::{truncate_snippet, Impact, Violation, ViolationNode};

const ENGINE: &str = "ace";
const HELP_URL_BASE: &str = "https://able.ibm.com/rules/archives/latest/doc/en-US";

/// Normalized ACE result level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AceLevel {
    Violation,
    PotentialViolation,
    Recommendation,
    PotentialRecommendation,
    Manual,
    Pass,
}

impl AceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AceLevel::Violation => "violation",
            AceLevel::PotentialViolation => "potentialviolation",
            AceLevel::Recommendation => "recommendation",
            AceLevel::PotentialRecommendation => "potentialrecommendation",
            AceLevel::Manual => "manual",
            AceLevel::Pass => "pass",
        }
    }

    /// Collapse ACE's `[category, outcome]` pair; `None` for pairs with no level
    pub fn classify(category: &str, outcome: &str) -> Option<Self> {
        match (category, outcome) {
            (_, "PASS") => Some(AceLevel::Pass),
            (_, "MANUAL") => Some(AceLevel::Manual),
            ("VIOLATION", "FAIL") => Some(AceLevel::Violation),
            ("VIOLATION", "POTENTIAL") => Some(AceLevel::PotentialViolation),
            ("RECOMMENDATION", "FAIL") => Some(AceLevel::Recommendation),
            ("RECOMMENDATION", "POTENTIAL") => Some(AceLevel::PotentialRecommendation),
            _ => None,
        }
    }

    pub fn impact(&self) -> Option<Impact> {
        match self {
            AceLevel::Violation => Some(Impact::Serious),
            AceLevel::PotentialViolation => Some(Impact::Moderate),
            AceLevel::Recommendation
            | AceLevel::PotentialRecommendation
            | AceLevel::Manual => Some(Impact::Minor),
            AceLevel::Pass => None,
        }
    }
}

impl std::fmt::Display for AceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AceLevel {
    type Err = ProbeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect();
        match normalized.as_str() {
            "violation" => Ok(AceLevel::Violation),
            "potentialviolation" => Ok(AceLevel::PotentialViolation),
            "recommendation" => Ok(AceLevel::Recommendation),
            "potentialrecommendation" => Ok(AceLevel::PotentialRecommendation),
            "manual" => Ok(AceLevel::Manual),
            "pass" => Ok(AceLevel::Pass),
            _ => Err(ProbeError::Config(format!("Unknown ACE level: {}", s))),
        }
    }
}

/// ACE guideline policy for a WCAG version; ACE has no per-tier policies
pub fn ace_policy(level: &WcagLevel) -> &'static str {
    match level.version {
        WcagVersion::V20 => "WCAG_2_0",
        WcagVersion::V21 => "WCAG_2_1",
        WcagVersion::V22 => "WCAG_2_2",
    }
}

#[derive(Debug, Deserialize)]
struct AceReport {
    #[serde(default)]
    results: Vec<AceResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AceResult {
    rule_id: String,
    value: (String, String),
    #[serde(default)]
    path: AcePath,
    #[serde(default)]
    message: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Default, Deserialize)]
struct AcePath {
    #[serde(default)]
    dom: String,
}

/// Normalize an ACE report into per-rule violations
pub fn normalize_ace_report(json: &str, report_levels: &[AceLevel]) -> Result<EngineReport> {
    let report: AceReport = serde_json::from_str(json)
        .map_err(|e| ProbeError::engine(ENGINE, format!("unreadable report: {}", e)))?;

    let mut violations: Vec<Violation> = Vec::new();
    let mut by_rule: HashMap<String, usize> = HashMap::new();
    let mut passes = 0;
    let mut incomplete = 0;

    for result in report.results {
        let Some(level) = AceLevel::classify(&result.value.0, &result.value.1) else {
            continue;
        };
        if !report_levels.contains(&level) {
            match level {
                AceLevel::Pass => passes += 1,
                _ => incomplete += 1,
            }
            continue;
        }

        let index = *by_rule.entry(result.rule_id.clone()).or_insert_with(|| {
            violations.push(Violation {
                id: result.rule_id.clone(),
                impact: None,
                tags: vec!["ibm-equal-access".to_string()],
                description: result.message.clone(),
                help: format!("IBM Equal Access rule {}", result.rule_id),
                help_url: format!("{}/{}.html", HELP_URL_BASE, result.rule_id),
                nodes: Vec::new(),
            });
            violations.len() - 1
        });

        let violation = &mut violations[index];
        if let Some(impact) = level.impact() {
            violation.impact = violation.impact.max(Some(impact));
        }
        if !violation.tags.iter().any(|t| t == level.as_str()) {
            violation.tags.push(level.as_str().to_string());
        }
        violation.nodes.push(ViolationNode {
            html: truncate_snippet(&result.snippet),
            target: vec![result.path.dom],
            failure_summary: Some(result.message),
        });
    }

    Ok(EngineReport {
        engine: ENGINE.to_string(),
        violations,
        passes,
        incomplete,
    })
}

pub struct AceEngine {
    source: Arc<str>,
    report_levels: Vec<AceLevel>,
}

impl AceEngine {
    pub fn new(source: Arc<str>, report_levels: Vec<AceLevel>) -> Self {
        Self {
            source,
            report_levels,
        }
    }
}

impl AccessibilityEngine for AceEngine {
    fn name(&self) -> &'static str {
        ENGINE
    }

    fn scan(&self, page: &dyn PageHandle, level: &WcagLevel) -> Result<EngineReport> {
        page.inject_script(&self.source)
            .map_err(|e| ProbeError::engine(ENGINE, format!("injection failed: {}", e)))?;

        let expression = format!(
            "(async () => {{ const checker = new ace.Checker(); \
             const report = await checker.check(document, [{}]); \
             return JSON.stringify(report); }})()",
            serde_json::to_string(ace_policy(level))?
        );

        let raw = page
            .evaluate(&expression, true)
            .map_err(|e| ProbeError::engine(ENGINE, e.to_string()))?;
        let json = raw
            .as_str()
            .ok_or_else(|| ProbeError::engine(ENGINE, "checker returned no report"))?;

        let report = normalize_ace_report(json, &self.report_levels)?;
        tracing::debug!(
            policy = ace_policy(level),
            violations = report.violations.len(),
            incomplete = report.incomplete,
            "ace scan complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Conformance;

    fn result(rule: &str, category: &str, outcome: &str, dom: &str) -> serde_json::Value {
        serde_json::json!({
            "ruleId": rule,
            "value": [category, outcome],
            "path": {"dom": dom},
            "message": format!("{} failed", rule),
            "snippet": format!("<div id=\"{}\">", dom),
        })
    }

    #[test]
    fn test_classify() {
        assert_eq!(AceLevel::classify("VIOLATION", "FAIL"), Some(AceLevel::Violation));
        assert_eq!(
            AceLevel::classify("VIOLATION", "POTENTIAL"),
            Some(AceLevel::PotentialViolation)
        );
        assert_eq!(
            AceLevel::classify("RECOMMENDATION", "POTENTIAL"),
            Some(AceLevel::PotentialRecommendation)
        );
        assert_eq!(AceLevel::classify("INFORMATION", "MANUAL"), Some(AceLevel::Manual));
        assert_eq!(AceLevel::classify("VIOLATION", "PASS"), Some(AceLevel::Pass));
        assert_eq!(AceLevel::classify("INFORMATION", "FAIL"), None);
    }

    #[test]
    fn test_level_names() {
        assert_eq!(
            "potential_violation".parse::<AceLevel>().unwrap(),
            AceLevel::PotentialViolation
        );
        assert_eq!(AceLevel::PotentialRecommendation.to_string(), "potentialrecommendation");
        assert!("severe".parse::<AceLevel>().is_err());
        assert_eq!(
            serde_json::to_string(&AceLevel::PotentialViolation).unwrap(),
            "\"potentialviolation\""
        );
    }

    #[test]
    fn test_policy_ignores_tier() {
        let a = WcagLevel::new(WcagVersion::V22, Conformance::A);
        let aaa = WcagLevel::new(WcagVersion::V22, Conformance::AAA);
        assert_eq!(ace_policy(&a), "WCAG_2_2");
        assert_eq!(ace_policy(&a), ace_policy(&aaa));
    }

    #[test]
    fn test_grouping_and_filtering() {
        let report = serde_json::json!({
            "results": [
                result("img_alt_valid", "VIOLATION", "FAIL", "/html/body/img[1]"),
                result("img_alt_valid", "VIOLATION", "POTENTIAL", "/html/body/img[2]"),
                result("text_contrast", "RECOMMENDATION", "FAIL", "/html/body/p"),
                result("html_lang", "VIOLATION", "PASS", "/html"),
                result("media_track", "INFORMATION", "MANUAL", "/html/body/video"),
            ]
        });

        let normalized = normalize_ace_report(
            &report.to_string(),
            &[AceLevel::Violation, AceLevel::PotentialViolation],
        )
        .unwrap();

        assert_eq!(normalized.violations.len(), 1);
        let img = &normalized.violations[0];
        assert_eq!(img.id, "img_alt_valid");
        assert_eq!(img.nodes.len(), 2);
        assert_eq!(img.impact, Some(Impact::Serious));
        assert_eq!(
            img.tags,
            vec!["ibm-equal-access", "violation", "potentialviolation"]
        );
        assert_eq!(
            img.help_url,
            "https://able.ibm.com/rules/archives/latest/doc/en-US/img_alt_valid.html"
        );
        assert_eq!(img.nodes[1].target, vec!["/html/body/img[2]".to_string()]);
        assert_eq!(normalized.passes, 1);
        assert_eq!(normalized.incomplete, 2);
    }
}
