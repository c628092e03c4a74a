//! Browser boundary
//!
//! Everything that touches a live page goes through [`PageHandle`]. The
//! Chrome DevTools implementation lives in [`chrome`]; the keyboard walk and
//! the rule engines only ever see the trait.

pub mod chrome;

pub use chrome::{BrowserSession, ChromePage};

use serde_json::Value;

use crate::error::Result;

/// Keys the audits simulate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Tab,
    Enter,
    Escape,
}

impl Key {
    /// DOM `KeyboardEvent.key` name
    pub fn as_str(&self) -> &'static str {
        match self {
            Key::Tab => "Tab",
            Key::Enter => "Enter",
            Key::Escape => "Escape",
        }
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live page the audits can drive
pub trait PageHandle: Send + Sync {
    /// Navigate and wait for the load to finish
    fn goto(&self, url: &str) -> Result<()>;

    /// Replace the document with inline HTML
    fn set_content(&self, html: &str) -> Result<()>;

    /// Return to whatever the page was first opened with (URL or inline HTML)
    fn reload_origin(&self) -> Result<()>;

    /// Evaluate a script resource in page context, discarding its value
    fn inject_script(&self, source: &str) -> Result<()> {
        self.evaluate(source, false).map(|_| ())
    }

    /// Evaluate an expression in page context and return its value
    fn evaluate(&self, expression: &str, await_promise: bool) -> Result<Value>;

    /// Simulate one key press (down + up)
    fn press_key(&self, key: Key) -> Result<()>;

    /// Current document URL
    fn url(&self) -> Result<String>;

    /// While enabled, top-level navigations not started by this handle are aborted
    fn set_navigation_guard(&self, enabled: bool) -> Result<()>;

    /// Release the page; further calls are errors
    fn close(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names() {
        assert_eq!(Key::Tab.as_str(), "Tab");
        assert_eq!(Key::Enter.to_string(), "Enter");
        assert_eq!(Key::Escape.as_str(), "Escape");
    }
}
