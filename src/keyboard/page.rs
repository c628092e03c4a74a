//! Typed projection of a browser page for the keyboard walk

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::browser::{Key, PageHandle};
use crate::error::{ProbeError, Result};
use crate::types::{ActiveElement, AriaState, FocusableElement, UnfocusableElement};

use super::{scripts, survey, KeyboardPage};

/// Convert a script result (a JSON string) into a typed value
pub(crate) fn project<T: DeserializeOwned>(raw: Value, what: &str) -> Result<T> {
    match raw {
        Value::String(json) => serde_json::from_str(&json)
            .map_err(|e| ProbeError::Script(format!("{}: malformed result: {}", what, e))),
        other => Err(ProbeError::Script(format!(
            "{}: expected a JSON string, got {}",
            what, other
        ))),
    }
}

/// [`KeyboardPage`] over any [`PageHandle`]
pub struct DomPage<'a, P: PageHandle + ?Sized> {
    page: &'a P,
}

impl<'a, P: PageHandle + ?Sized> DomPage<'a, P> {
    pub fn new(page: &'a P) -> Self {
        Self { page }
    }
}

impl<P: PageHandle + ?Sized> KeyboardPage for DomPage<'_, P> {
    fn press(&mut self, key: Key) -> Result<()> {
        self.page.press_key(key)
    }

    fn settle(&mut self, wait: Duration) {
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
    }

    fn active_element(&mut self) -> Result<ActiveElement> {
        let raw = self.page.evaluate(&scripts::active_element(), false)?;
        project(raw, "active element")
    }

    fn aria_state(&mut self, selector: &str) -> Result<Option<AriaState>> {
        let raw = self.page.evaluate(&scripts::aria_state(selector), false)?;
        project(raw, "aria state")
    }

    fn focusable_elements(&mut self) -> Result<Vec<FocusableElement>> {
        survey::survey_focusable(self.page)
    }

    fn unfocusable_interactive(&mut self) -> Result<Vec<UnfocusableElement>> {
        survey::scan_unfocusable_interactive(self.page)
    }

    fn current_url(&mut self) -> Result<String> {
        self.page.url()
    }

    fn restore(&mut self, url: &str) -> Result<()> {
        let navigable = ["http://", "https://", "file://"]
            .iter()
            .any(|scheme| url.starts_with(scheme));
        if navigable {
            self.page.goto(url)?;
        } else {
            // about:blank, data: and the like: inline content
            self.page.reload_origin()?;
        }
        self.reset_focus()
    }

    fn reset_focus(&mut self) -> Result<()> {
        self.page.evaluate(&scripts::reset_focus(), false)?;
        Ok(())
    }

    fn set_navigation_guard(&mut self, enabled: bool) -> Result<()> {
        self.page.set_navigation_guard(enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_project_parses_json_string() {
        let raw = Value::String(
            json!([{"selector": "a.nav", "html": "<a>", "tagName": "a", "tabIndex": 0}])
                .to_string(),
        );
        let elements: Vec<FocusableElement> = project(raw, "census").unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].selector, "a.nav");
        assert!(elements[0].aria_role.is_none());
    }

    #[test]
    fn test_project_null_option() {
        let state: Option<AriaState> = project(Value::String("null".into()), "aria").unwrap();
        assert!(state.is_none());
    }

    #[test]
    fn test_project_rejects_non_string() {
        let err = project::<Vec<FocusableElement>>(json!({"a": 1}), "census").unwrap_err();
        assert!(matches!(err, ProbeError::Script(_)));
        assert!(err.to_string().contains("census"));
    }
}
