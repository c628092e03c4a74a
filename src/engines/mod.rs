//! Accessibility rule engines
//!
//! Both engines are third-party JavaScript bundles injected into the page
//! and consumed as opaque scanners:
//! - axe-core (`axe.run`), impact severities used as-is
//! - IBM Equal Access (`ace.Checker`), whose level taxonomy is normalized
//!   into the common [`Violation`](crate::types::Violation) shape
//!
//! # Feature Flags
//!
//! - `remote-scripts`: engine bundles may be downloaded from an http(s) URL

mod ace;
mod axe;
mod loader;

pub use ace::{ace_policy, normalize_ace_report, AceEngine, AceLevel};
pub use axe::{axe_tags, parse_axe_results, AxeEngine};
pub use loader::{load_script, ScriptLoader};

use serde::{Deserialize, Serialize};

use crate::browser::PageHandle;
use crate::config::{AuditConfig, EngineKind, WcagLevel};
use crate::error::Result;
use crate::types::Violation;

/// What one engine run found
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineReport {
    pub engine: String,
    pub violations: Vec<Violation>,
    /// Rules that passed
    pub passes: usize,
    /// Results needing manual review, not reported as violations
    pub incomplete: usize,
}

/// A rule engine run against a loaded page
pub trait AccessibilityEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Inject the engine into `page` and scan it
    fn scan(&self, page: &dyn PageHandle, level: &WcagLevel) -> Result<EngineReport>;
}

/// Instantiate the engines selected by `kind`
pub fn create_engines(
    kind: EngineKind,
    loader: &ScriptLoader,
    config: &AuditConfig,
) -> Result<Vec<Box<dyn AccessibilityEngine>>> {
    let mut engines: Vec<Box<dyn AccessibilityEngine>> = Vec::new();
    if matches!(kind, EngineKind::Axe | EngineKind::Both) {
        engines.push(Box::new(AxeEngine::new(
            loader.axe()?,
            config.best_practices,
        )));
    }
    if matches!(kind, EngineKind::Ace | EngineKind::Both) {
        engines.push(Box::new(AceEngine::new(
            loader.ace()?,
            config.ace_report_levels.clone(),
        )));
    }
    Ok(engines)
}
