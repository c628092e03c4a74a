//! Audit orchestration
//!
//! Each operation opens its own [`BrowserSession`], so concurrent calls
//! never share a page. The session closes when the call returns, whether
//! it succeeded or not.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::browser::{BrowserSession, PageHandle};
use crate::config::{AuditConfig, EngineKind, WcagLevel};
use crate::engines::{create_engines, ScriptLoader};
use crate::error::{ProbeError, Result};
use crate::keyboard::{DomPage, KeyboardWalk};
use crate::report::AuditReport;
use crate::types::KeyboardTestResult;

/// Label used in reports for inline HTML
pub const INLINE_HTML_LABEL: &str = "inline-html";

/// What a keyboard test runs against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Url(String),
    Html(String),
}

impl Target {
    pub fn label(&self) -> &str {
        match self {
            Target::Url(url) => url,
            Target::Html(_) => INLINE_HTML_LABEL,
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Target::Url(url) => validate_url(url),
            Target::Html(html) if html.trim().is_empty() => {
                Err(ProbeError::InvalidInput("html must not be empty".to_string()))
            }
            Target::Html(_) => Ok(()),
        }
    }

    fn load(&self, page: &dyn PageHandle) -> Result<()> {
        match self {
            Target::Url(url) => page.goto(url),
            Target::Html(html) => page.set_content(html),
        }
    }
}

/// Per-call overrides of the configured defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditOptions {
    pub engine: Option<EngineKind>,
    pub level: Option<WcagLevel>,
    pub include_keyboard: Option<bool>,
}

/// Accept http(s) and file URLs only
pub fn validate_url(url: &str) -> Result<()> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ProbeError::InvalidInput("url must not be empty".to_string()));
    }
    let supported = ["http://", "https://", "file://"]
        .iter()
        .any(|scheme| url.len() > scheme.len() && url.starts_with(scheme));
    if !supported {
        return Err(ProbeError::InvalidInput(format!(
            "unsupported url '{}': expected http://, https:// or file://",
            url
        )));
    }
    Ok(())
}

/// Runs audits against the process-wide configuration
pub struct Auditor {
    config: Arc<AuditConfig>,
    loader: ScriptLoader,
}

impl Auditor {
    pub fn new(config: Arc<AuditConfig>) -> Self {
        let loader = ScriptLoader::new(config.scripts.clone());
        Self { config, loader }
    }

    /// Use an explicit script loader (pre-loaded bundles, tests)
    pub fn with_loader(config: Arc<AuditConfig>, loader: ScriptLoader) -> Self {
        Self { config, loader }
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn analyze_url(&self, url: &str, options: &AuditOptions) -> Result<AuditReport> {
        self.analyze(&Target::Url(url.trim().to_string()), options)
    }

    pub fn analyze_html(&self, html: &str, options: &AuditOptions) -> Result<AuditReport> {
        self.analyze(&Target::Html(html.to_string()), options)
    }

    /// Keyboard walk only, no rule engines
    pub fn test_keyboard(&self, target: &Target) -> Result<KeyboardTestResult> {
        target.validate()?;
        let session = BrowserSession::launch(&self.config.browser)?;
        target.load(session.page())?;
        self.run_keyboard(session.page())
    }

    fn analyze(&self, target: &Target, options: &AuditOptions) -> Result<AuditReport> {
        target.validate()?;
        let session = BrowserSession::launch(&self.config.browser)?;
        target.load(session.page())?;
        self.audit_page(session.page(), target.label(), options)
    }

    /// Engines, then the keyboard walk, against a page that is already loaded
    pub fn audit_page(
        &self,
        page: &dyn PageHandle,
        label: &str,
        options: &AuditOptions,
    ) -> Result<AuditReport> {
        let engine = options.engine.unwrap_or(self.config.engine);
        let level = options.level.unwrap_or(self.config.level);
        let include_keyboard = options.include_keyboard.unwrap_or(self.config.keyboard_test);

        tracing::info!(page = label, %engine, %level, include_keyboard, "Starting audit");

        let mut report = AuditReport::new(label, &level);
        for scanner in create_engines(engine, &self.loader, &self.config)? {
            let result = scanner.scan(page, &level)?;
            tracing::info!(
                engine = scanner.name(),
                violations = result.violations.len(),
                "Engine scan finished"
            );
            report.merge_engine(result);
        }

        if include_keyboard {
            // Engine findings stand on their own; a walk that cannot start
            // drops the keyboard section instead of the whole report.
            match self.run_keyboard(page) {
                Ok(keyboard) => report.attach_keyboard(keyboard),
                Err(e) => tracing::warn!("Keyboard test skipped: {}", e),
            }
        }

        tracing::info!(
            page = label,
            violations = report.violations.len(),
            "Audit complete"
        );
        Ok(report)
    }

    fn run_keyboard(&self, page: &dyn PageHandle) -> Result<KeyboardTestResult> {
        let mut dom = DomPage::new(page);
        KeyboardWalk::new(self.config.walk.clone()).run(&mut dom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::Key;
    use crate::types::Impact;
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    /// Answers engine calls with canned reports and records injections
    struct CannedPage {
        injected: Mutex<Vec<String>>,
    }

    impl CannedPage {
        fn new() -> Self {
            Self {
                injected: Mutex::new(Vec::new()),
            }
        }
    }

    impl PageHandle for CannedPage {
        fn goto(&self, _url: &str) -> Result<()> {
            Ok(())
        }

        fn set_content(&self, _html: &str) -> Result<()> {
            Ok(())
        }

        fn reload_origin(&self) -> Result<()> {
            Ok(())
        }

        fn inject_script(&self, source: &str) -> Result<()> {
            self.injected.lock().push(source.to_string());
            Ok(())
        }

        fn evaluate(&self, expression: &str, _await_promise: bool) -> Result<Value> {
            if expression.contains("axe.run") {
                let results = json!({
                    "violations": [{
                        "id": "image-alt",
                        "impact": "critical",
                        "tags": ["wcag2a"],
                        "description": "Images must have alternate text",
                        "help": "Images must have alternate text",
                        "helpUrl": "https://dequeuniversity.com/rules/axe/4.10/image-alt",
                        "nodes": [{"html": "<img src=\"a.png\">", "target": ["img"]}]
                    }],
                    "passes": [{}, {}],
                    "incomplete": []
                });
                return Ok(Value::String(results.to_string()));
            }
            if expression.contains("ace.Checker") {
                let report = json!({"results": [{
                    "ruleId": "img_alt_valid",
                    "value": ["VIOLATION", "FAIL"],
                    "path": {"dom": "/html[1]/body[1]/img[1]"},
                    "message": "The image has neither an accessible name nor is marked as decorative",
                    "snippet": "<img src=\"a.png\">"
                }]});
                return Ok(Value::String(report.to_string()));
            }
            Err(ProbeError::Script(format!("unexpected expression: {}", expression)))
        }

        fn press_key(&self, _key: Key) -> Result<()> {
            Ok(())
        }

        fn url(&self) -> Result<String> {
            Ok("https://example.test/".to_string())
        }

        fn set_navigation_guard(&self, _enabled: bool) -> Result<()> {
            Ok(())
        }

        fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    fn auditor() -> Auditor {
        Auditor::with_loader(
            Arc::new(AuditConfig::default()),
            ScriptLoader::preloaded("/* axe */", "/* ace */"),
        )
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.com").is_ok());
        assert!(validate_url("file:///tmp/page.html").is_ok());
        assert!(matches!(validate_url(""), Err(ProbeError::InvalidInput(_))));
        assert!(validate_url("example.com").is_err());
        assert!(validate_url("https://").is_err());
        assert!(validate_url("javascript:alert(1)").is_err());
    }

    #[test]
    fn test_empty_html_rejected() {
        let err = Target::Html("  ".to_string()).validate().unwrap_err();
        assert_eq!(err.code(), -32602);
        assert_eq!(Target::Html("<p>".into()).label(), INLINE_HTML_LABEL);
    }

    #[test]
    fn test_audit_page_with_both_engines() {
        let page = CannedPage::new();
        let options = AuditOptions {
            engine: Some(EngineKind::Both),
            include_keyboard: Some(false),
            ..Default::default()
        };

        let report = auditor()
            .audit_page(&page, "https://example.test/", &options)
            .unwrap();

        assert_eq!(report.engines, vec!["axe", "ace"]);
        assert_eq!(report.violations.len(), 2);
        assert_eq!(report.violations[0].impact, Some(Impact::Critical));
        assert_eq!(report.violations[1].id, "img_alt_valid");
        assert_eq!(report.passes, 2);
        assert!(report.keyboard.is_none());
        assert_eq!(page.injected.lock().len(), 2);
    }

    #[test]
    fn test_keyboard_failure_keeps_engine_results() {
        let page = CannedPage::new();
        let options = AuditOptions {
            include_keyboard: Some(true),
            ..Default::default()
        };

        // The canned page cannot answer the census script
        let report = auditor().audit_page(&page, "x", &options).unwrap();
        assert_eq!(report.violations.len(), 1);
        assert!(report.keyboard.is_none());
    }
}
