//! Keyboard findings as axe-compatible violation records

use crate::types::{Impact, KeyboardTestResult, Violation, ViolationNode};

pub const KEYBOARD_TRAP_RULE: &str = "keyboard-trap";
pub const DIALOG_ESCAPE_RULE: &str = "dialog-escape-failure";
pub const UNFOCUSABLE_RULE: &str = "unfocusable-interactive";

/// Flatten a keyboard result into at most three violation records
pub fn keyboard_violations(result: &KeyboardTestResult) -> Vec<Violation> {
    let mut violations = Vec::new();

    if !result.keyboard_traps.is_empty() {
        violations.push(Violation {
            id: KEYBOARD_TRAP_RULE.to_string(),
            impact: Some(Impact::Critical),
            tags: tags(&["wcag2a", "wcag212", "keyboard"]),
            description: "Keyboard focus can be moved to a component but not away from it using only the keyboard".to_string(),
            help: "Users must be able to Tab away from every focusable element".to_string(),
            help_url: "https://www.w3.org/WAI/WCAG21/Understanding/no-keyboard-trap.html".to_string(),
            nodes: result
                .keyboard_traps
                .iter()
                .map(|trap| ViolationNode {
                    html: trap.html.clone(),
                    target: vec![trap.selector.clone()],
                    failure_summary: Some(trap.issue.clone()),
                })
                .collect(),
        });
    }

    let failed_escapes: Vec<ViolationNode> = result
        .dialog_escapes
        .iter()
        .filter(|escape| !escape.escaped_successfully)
        .map(|escape| ViolationNode {
            html: escape.dialog_html.clone(),
            target: vec![escape.dialog_selector.clone()],
            failure_summary: Some(escape.note.clone()),
        })
        .collect();
    if !failed_escapes.is_empty() {
        violations.push(Violation {
            id: DIALOG_ESCAPE_RULE.to_string(),
            impact: Some(Impact::Serious),
            tags: tags(&["wcag2a", "wcag212", "keyboard", "best-practice"]),
            description: "A dialog could not be dismissed with the Escape key".to_string(),
            help: "Dialogs should close, and release focus, when Escape is pressed".to_string(),
            help_url: "https://www.w3.org/WAI/ARIA/apg/patterns/dialog-modal/".to_string(),
            nodes: failed_escapes,
        });
    }

    if !result.unfocusable_interactive.is_empty() {
        violations.push(Violation {
            id: UNFOCUSABLE_RULE.to_string(),
            impact: Some(Impact::Serious),
            tags: tags(&["wcag2a", "wcag211", "keyboard"]),
            description: "Element has interactive semantics but cannot receive keyboard focus".to_string(),
            help: "Interactive elements must be reachable with the keyboard".to_string(),
            help_url: "https://www.w3.org/WAI/WCAG21/Understanding/keyboard.html".to_string(),
            nodes: result
                .unfocusable_interactive
                .iter()
                .map(|element| ViolationNode {
                    html: element.html.clone(),
                    target: vec![element.selector.clone()],
                    failure_summary: Some(match &element.role {
                        Some(role) => format!(
                            "Element with role \"{}\" is not in the Tab order; add tabindex=\"0\" or use a native control",
                            role
                        ),
                        None => "Element has an event handler but is not in the Tab order; add tabindex=\"0\" or use a native control".to_string(),
                    }),
                })
                .collect(),
        });
    }

    violations
}

fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|t| t.to_string()).collect()
}
