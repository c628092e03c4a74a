//! Focusable-element census and unfocusable-interactive scan
//!
//! Both are read-only. The census only feeds the total count; the walk
//! discovers the real Tab order itself.

use crate::browser::PageHandle;
use crate::error::Result;
use crate::types::{FocusableElement, UnfocusableElement};

use super::page::project;
use super::scripts;

/// Roles that make an element interactive for the unfocusable scan
pub const INTERACTIVE_ROLES: &[&str] = &["button", "link", "menuitem", "tab", "checkbox", "radio"];

/// Tags that are focusable without a `tabindex`
pub(crate) const NATIVE_FOCUSABLE_TAGS: &[&str] =
    &["button", "input", "select", "textarea", "iframe", "summary"];

/// Whether an element of this kind takes focus natively
pub fn is_natively_focusable(tag: &str, has_href: bool) -> bool {
    let tag = tag.to_lowercase();
    NATIVE_FOCUSABLE_TAGS.contains(&tag.as_str()) || (has_href && (tag == "a" || tag == "area"))
}

/// Tab index the browser would report (`element.tabIndex`)
pub fn effective_tab_index(tag: &str, has_href: bool, explicit: Option<i32>) -> i32 {
    explicit.unwrap_or(if is_natively_focusable(tag, has_href) { 0 } else { -1 })
}

/// Whether an element carries interactive semantics
pub fn is_interactive(role: Option<&str>, has_handler: bool) -> bool {
    has_handler
        || role
            .map(|r| r.split_whitespace().any(|r| INTERACTIVE_ROLES.contains(&r)))
            .unwrap_or(false)
}

/// Visible elements matching the focusability predicate
pub fn survey_focusable<P: PageHandle + ?Sized>(page: &P) -> Result<Vec<FocusableElement>> {
    let raw = page.evaluate(&scripts::focusable_elements(), false)?;
    let elements: Vec<FocusableElement> = project(raw, "focusable census")?;
    tracing::debug!(count = elements.len(), "Focusable census complete");
    Ok(elements)
}

/// Visible interactive elements the keyboard cannot reach
pub fn scan_unfocusable_interactive<P: PageHandle + ?Sized>(
    page: &P,
) -> Result<Vec<UnfocusableElement>> {
    let raw = page.evaluate(&scripts::unfocusable_interactive(), false)?;
    let elements: Vec<UnfocusableElement> = project(raw, "unfocusable scan")?;
    tracing::debug!(count = elements.len(), "Unfocusable interactive scan complete");
    Ok(elements)
}
