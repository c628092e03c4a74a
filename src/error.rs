//! Error types for wcag-probe

use thiserror::Error;

/// Result type alias for wcag-probe operations
pub type Result<T> = std::result::Result<T, ProbeError>;

/// Main error type for wcag-probe
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Page script error: {0}")]
    Script(String),

    #[error("{engine} engine error: {message}")]
    Engine { engine: String, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    #[cfg(feature = "remote-scripts")]
    Http(#[from] reqwest::Error),

    #[error("HTTP request error: {0}")]
    #[cfg(not(feature = "remote-scripts"))]
    Http(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProbeError {
    /// Check if the caller may reasonably re-invoke the failed operation
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProbeError::Navigation { .. } | ProbeError::Browser(_) | ProbeError::Http(_)
        )
    }

    /// Get error code for MCP protocol
    pub fn code(&self) -> i64 {
        match self {
            ProbeError::InvalidInput(_) => -32602,
            ProbeError::Navigation { .. } => -32010,
            ProbeError::Engine { .. } => -32011,
            ProbeError::Browser(_) => -32012,
            _ => -32000,
        }
    }

    /// Wrap an error raised by the browser driver
    pub fn browser(err: impl std::fmt::Display) -> Self {
        ProbeError::Browser(err.to_string())
    }

    pub fn engine(engine: impl Into<String>, message: impl Into<String>) -> Self {
        ProbeError::Engine {
            engine: engine.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ProbeError::InvalidInput("x".into()).code(), -32602);
        assert_eq!(ProbeError::engine("axe", "boom").code(), -32011);
        assert_eq!(ProbeError::Internal("x".into()).code(), -32000);
    }

    #[test]
    fn test_navigation_is_retryable() {
        let err = ProbeError::Navigation {
            url: "https://example.com".into(),
            reason: "timeout".into(),
        };
        assert!(err.is_retryable());
        assert!(!ProbeError::Script("bad".into()).is_retryable());
        assert_eq!(
            err.to_string(),
            "Navigation to https://example.com failed: timeout"
        );
    }
}
