//! Core types for wcag-probe
//!
//! Keyboard findings mirror the shapes reported by the keyboard walk; the
//! violation types follow the axe-core result format so every engine (and
//! the keyboard walk) reports through one shape.

use serde::{Deserialize, Serialize};

/// Maximum length of an HTML snippet carried in any finding
pub const MAX_SNIPPET_LENGTH: usize = 200;

/// A visible element matching the focusability predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusableElement {
    pub selector: String,
    pub html: String,
    pub tag_name: String,
    pub tab_index: i32,
    #[serde(default)]
    pub aria_role: Option<String>,
}

/// One position in the observed Tab order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusOrderItem {
    /// 1-based, no gaps
    pub index: usize,
    pub selector: String,
    pub html: String,
    pub tag_name: String,
}

/// An element focus could not Tab away from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyboardTrap {
    pub selector: String,
    pub html: String,
    pub issue: String,
}

/// Outcome of one Escape attempt against a detected dialog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogEscape {
    pub dialog_selector: String,
    pub dialog_html: String,
    pub escaped_successfully: bool,
    pub note: String,
}

/// Outcome of one Enter activation of a button-like element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonActivation {
    pub selector: String,
    pub html: String,
    pub activated: bool,
    pub triggered_dialog: bool,
    pub expanded_content: bool,
    pub note: String,
}

/// An element with interactive semantics that the keyboard cannot reach
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnfocusableElement {
    pub selector: String,
    pub html: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Everything one keyboard walk found
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyboardTestResult {
    pub total_focusable_elements: usize,
    pub tested_elements: usize,
    pub keyboard_traps: Vec<KeyboardTrap>,
    pub unfocusable_interactive: Vec<UnfocusableElement>,
    pub focus_order: Vec<FocusOrderItem>,
    pub dialog_escapes: Vec<DialogEscape>,
    pub button_activations: Vec<ButtonActivation>,
}

impl KeyboardTestResult {
    /// Whether the walk produced anything worth reporting as a failure
    pub fn has_issues(&self) -> bool {
        !self.keyboard_traps.is_empty()
            || !self.unfocusable_interactive.is_empty()
            || self.dialog_escapes.iter().any(|d| !d.escaped_successfully)
    }
}

/// One node of an element's ancestor chain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeInfo {
    pub selector: String,
    pub html: String,
    pub tag_name: String,
    pub id: Option<String>,
    pub class_name: Option<String>,
    pub role: Option<String>,
    pub aria_modal: Option<String>,
}

/// Typed projection of `document.activeElement`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActiveElement {
    /// Focus sits on `body`/`html` (or nothing): it left all content
    pub is_document: bool,
    pub selector: String,
    pub html: String,
    pub tag_name: String,
    pub tab_index: i32,
    pub role: Option<String>,
    pub aria_expanded: Option<String>,
    pub aria_pressed: Option<String>,
    pub aria_selected: Option<String>,
    /// Child-index path from the document root; empty when unknown
    pub dom_path: String,
    /// The element itself first, then its ancestors up to (excluding) `body`
    pub chain: Vec<NodeInfo>,
}

impl ActiveElement {
    /// Focus on the document itself
    pub fn document() -> Self {
        Self {
            is_document: true,
            tag_name: "body".to_string(),
            selector: "body".to_string(),
            tab_index: -1,
            ..Default::default()
        }
    }

    /// Where the element sits: its DOM path, or its snippet when no path is known.
    /// Siblings that share a selector still differ here.
    pub fn locator(&self) -> &str {
        if self.dom_path.is_empty() {
            &self.html
        } else {
            &self.dom_path
        }
    }

    pub fn aria_state(&self) -> AriaState {
        AriaState {
            expanded: self.aria_expanded.clone(),
            pressed: self.aria_pressed.clone(),
            selected: self.aria_selected.clone(),
        }
    }
}

/// Activation-relevant ARIA attributes of one element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AriaState {
    pub expanded: Option<String>,
    pub pressed: Option<String>,
    pub selected: Option<String>,
}

/// Build the selector used to identify elements across the walk:
/// tag, then `#id`, then up to three classes.
pub fn derive_selector(tag: &str, id: Option<&str>, classes: &[&str]) -> String {
    let mut selector = tag.to_lowercase();
    if let Some(id) = id.filter(|id| !id.is_empty()) {
        selector.push('#');
        selector.push_str(id);
    }
    for class in classes.iter().filter(|c| !c.is_empty()).take(3) {
        selector.push('.');
        selector.push_str(class);
    }
    selector
}

/// Truncate an HTML snippet to [`MAX_SNIPPET_LENGTH`] characters
pub fn truncate_snippet(html: &str) -> String {
    html.chars().take(MAX_SNIPPET_LENGTH).collect()
}

/// Severity of a violation (axe-core vocabulary)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Minor,
    Moderate,
    Serious,
    Critical,
}

impl std::fmt::Display for Impact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Impact::Minor => write!(f, "minor"),
            Impact::Moderate => write!(f, "moderate"),
            Impact::Serious => write!(f, "serious"),
            Impact::Critical => write!(f, "critical"),
        }
    }
}

/// One failing element of a violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationNode {
    pub html: String,
    pub target: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_summary: Option<String>,
}

/// One rule failure, regardless of which engine reported it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub id: String,
    #[serde(default)]
    pub impact: Option<Impact>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub description: String,
    pub help: String,
    pub help_url: String,
    pub nodes: Vec<ViolationNode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_selector() {
        assert_eq!(derive_selector("BUTTON", None, &[]), "button");
        assert_eq!(
            derive_selector("div", Some("menu"), &["a", "", "b", "c", "d"]),
            "div#menu.a.b.c"
        );
        assert_eq!(derive_selector("a", Some(""), &["nav"]), "a.nav");
    }

    #[test]
    fn test_truncate_snippet_counts_chars() {
        let long = "é".repeat(300);
        assert_eq!(truncate_snippet(&long).chars().count(), MAX_SNIPPET_LENGTH);
        assert_eq!(truncate_snippet("<a>"), "<a>");
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = KeyboardTestResult {
            total_focusable_elements: 2,
            tested_elements: 1,
            ..Default::default()
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["totalFocusableElements"], 2);
        assert_eq!(json["testedElements"], 1);
        assert!(json["keyboardTraps"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_active_element_projection_defaults() {
        let active: ActiveElement = serde_json::from_value(serde_json::json!({
            "selector": "button#go",
            "tagName": "button",
            "tabIndex": 0,
            "ariaExpanded": "false",
            "chain": [{"selector": "button#go", "tagName": "button"}]
        }))
        .unwrap();
        assert!(!active.is_document);
        assert_eq!(active.aria_state().expanded.as_deref(), Some("false"));
        assert_eq!(active.chain.len(), 1);
        assert!(active.chain[0].role.is_none());
    }
}
