//! Dialog detection over the focus ancestor chain

use serde::{Deserialize, Serialize};

use crate::types::{ActiveElement, NodeInfo};

/// Substrings of class/id names that suggest a dialog container
const DIALOG_NAME_HINTS: &[&str] = &["modal", "dialog", "popup", "overlay"];

/// Predicate deciding whether one node looks like a dialog container
pub trait DialogSignature: Send + Sync {
    fn matches(&self, node: &NodeInfo) -> bool;
}

/// Role, `aria-modal`, `<dialog>`, or a modal-ish class/id name
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicSignature;

impl DialogSignature for HeuristicSignature {
    fn matches(&self, node: &NodeInfo) -> bool {
        let role_match = node
            .role
            .as_deref()
            .map(|role| {
                role.split_whitespace()
                    .any(|r| r.eq_ignore_ascii_case("dialog") || r.eq_ignore_ascii_case("alertdialog"))
            })
            .unwrap_or(false);
        if role_match {
            return true;
        }

        if node.aria_modal.as_deref() == Some("true") || node.tag_name.eq_ignore_ascii_case("dialog")
        {
            return true;
        }

        [node.class_name.as_deref(), node.id.as_deref()]
            .into_iter()
            .flatten()
            .map(str::to_lowercase)
            .any(|name| DIALOG_NAME_HINTS.iter().any(|hint| name.contains(hint)))
    }
}

/// The dialog container focus sits in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogInfo {
    pub selector: String,
    pub html: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogState {
    pub in_dialog: bool,
    pub dialog: Option<DialogInfo>,
}

/// Finds the nearest dialog-like ancestor of the focused element
pub struct DialogDetector {
    signature: Box<dyn DialogSignature>,
}

impl Default for DialogDetector {
    fn default() -> Self {
        Self::new(HeuristicSignature)
    }
}

impl DialogDetector {
    pub fn new(signature: impl DialogSignature + 'static) -> Self {
        Self {
            signature: Box::new(signature),
        }
    }

    /// Innermost match wins
    pub fn detect(&self, active: &ActiveElement) -> DialogState {
        if active.is_document {
            return DialogState::default();
        }

        active
            .chain
            .iter()
            .find(|node| self.signature.matches(node))
            .map(|node| DialogState {
                in_dialog: true,
                dialog: Some(DialogInfo {
                    selector: node.selector.clone(),
                    html: node.html.clone(),
                }),
            })
            .unwrap_or_default()
    }
}
