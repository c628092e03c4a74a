//! Process-wide audit configuration
//!
//! Built once at startup (see the binaries) and passed by reference into
//! every component that needs it. Malformed engine or level strings never
//! fail a request: they fall back to the documented defaults.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::engines::AceLevel;
use crate::error::ProbeError;

/// Default axe-core bundle location
pub const DEFAULT_AXE_SCRIPT: &str = "https://unpkg.com/axe-core@4.10.2/axe.min.js";

/// Default IBM Equal Access checker bundle location
pub const DEFAULT_ACE_SCRIPT: &str = "https://unpkg.com/accessibility-checker-engine@latest/ace.js";

static LEVEL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:wcag)?(?:(2)\.?([0-2])?)?(a{1,3})$").expect("level pattern is valid")
});

/// Which rule engine(s) run for an audit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Axe,
    Ace,
    /// Run both engines and merge their violations
    Both,
}

impl EngineKind {
    /// Parse an engine name, falling back to the default on bad input
    pub fn parse_or_default(value: &str) -> Self {
        value.parse().unwrap_or_else(|e: ProbeError| {
            tracing::warn!("{}; using engine '{}'", e, EngineKind::default());
            EngineKind::default()
        })
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineKind::Axe => write!(f, "axe"),
            EngineKind::Ace => write!(f, "ace"),
            EngineKind::Both => write!(f, "both"),
        }
    }
}

impl FromStr for EngineKind {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "axe" | "axe-core" => Ok(EngineKind::Axe),
            "ace" | "ibm" | "equal-access" | "accessibility-checker" => Ok(EngineKind::Ace),
            "both" | "all" => Ok(EngineKind::Both),
            _ => Err(ProbeError::Config(format!("Unknown engine: {}", s))),
        }
    }
}

/// WCAG specification version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WcagVersion {
    #[serde(rename = "2.0")]
    V20,
    #[serde(rename = "2.1")]
    V21,
    #[serde(rename = "2.2")]
    V22,
}

/// WCAG conformance tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Conformance {
    A,
    AA,
    AAA,
}

/// Normalized conformance target (version x tier)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WcagLevel {
    pub version: WcagVersion,
    pub conformance: Conformance,
}

impl Default for WcagLevel {
    fn default() -> Self {
        Self {
            version: WcagVersion::V21,
            conformance: Conformance::AA,
        }
    }
}

impl WcagLevel {
    pub fn new(version: WcagVersion, conformance: Conformance) -> Self {
        Self {
            version,
            conformance,
        }
    }

    /// Parse a level string, falling back to WCAG 2.1 AA on bad input
    pub fn parse_or_default(value: &str) -> Self {
        value.parse().unwrap_or_else(|e: ProbeError| {
            tracing::warn!("{}; using level '{}'", e, WcagLevel::default());
            WcagLevel::default()
        })
    }
}

impl std::fmt::Display for WcagLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let version = match self.version {
            WcagVersion::V20 => "2.0",
            WcagVersion::V21 => "2.1",
            WcagVersion::V22 => "2.2",
        };
        let tier = match self.conformance {
            Conformance::A => "A",
            Conformance::AA => "AA",
            Conformance::AAA => "AAA",
        };
        write!(f, "WCAG {} {}", version, tier)
    }
}

impl FromStr for WcagLevel {
    type Err = ProbeError;

    /// Accepts `wcag21aa`, `WCAG 2.1 AA`, `WCAG2AA`, `2.2-aaa`, `aa`, ...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect();

        let caps = LEVEL_PATTERN
            .captures(&normalized)
            .ok_or_else(|| ProbeError::Config(format!("Unknown WCAG level: {}", s)))?;

        let version = match (caps.get(1), caps.get(2).map(|m| m.as_str())) {
            (None, _) => WcagVersion::V21,
            (Some(_), None) | (Some(_), Some("0")) => WcagVersion::V20,
            (Some(_), Some("1")) => WcagVersion::V21,
            (Some(_), Some(_)) => WcagVersion::V22,
        };
        let conformance = match caps.get(3).map(|m| m.as_str().len()) {
            Some(1) => Conformance::A,
            Some(2) => Conformance::AA,
            _ => Conformance::AAA,
        };

        Ok(WcagLevel::new(version, conformance))
    }
}

/// Tunable constants of the keyboard walk
///
/// The defaults are empirical; none of them is derived from anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkTuning {
    /// Wait after each Tab before reading focus
    pub tab_settle_ms: u64,
    /// Wait after an Enter activation
    pub activation_settle_ms: u64,
    /// Wait after an Escape
    pub escape_settle_ms: u64,
    /// Consecutive identical focus reads that count as a trap
    pub trap_repeat_threshold: u32,
    /// Escape attempts allowed on the trap path per walk
    pub max_dialog_escapes: u32,
    /// Extra Tab presses allowed beyond the focusable census
    pub step_padding: usize,
    /// Absolute ceiling on Tab presses
    pub step_ceiling: usize,
}

impl Default for WalkTuning {
    fn default() -> Self {
        Self {
            tab_settle_ms: 100,
            activation_settle_ms: 500,
            escape_settle_ms: 300,
            trap_repeat_threshold: 3,
            max_dialog_escapes: 5,
            step_padding: 10,
            step_ceiling: 150,
        }
    }
}

impl WalkTuning {
    /// Settle waits of zero, for driving the walk against an in-memory page
    pub fn immediate() -> Self {
        Self {
            tab_settle_ms: 0,
            activation_settle_ms: 0,
            escape_settle_ms: 0,
            ..Self::default()
        }
    }

    pub fn tab_settle(&self) -> Duration {
        Duration::from_millis(self.tab_settle_ms)
    }

    pub fn activation_settle(&self) -> Duration {
        Duration::from_millis(self.activation_settle_ms)
    }

    pub fn escape_settle(&self) -> Duration {
        Duration::from_millis(self.escape_settle_ms)
    }

    /// Number of Tab presses allowed for a page with `total` focusable elements
    pub fn step_budget(&self, total: usize) -> usize {
        total.saturating_add(self.step_padding).min(self.step_ceiling)
    }
}

/// Browser launch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Chrome/Chromium executable (auto-detected when unset)
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    pub sandbox: bool,
    /// Page load budget
    pub navigation_timeout_ms: u64,
    pub window_size: (u32, u32),
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            sandbox: true,
            navigation_timeout_ms: 30_000,
            window_size: (1280, 1024),
        }
    }
}

impl BrowserConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}

/// Where engine bundles come from: a file path (`~` allowed) or an http(s) URL
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptSources {
    pub axe: String,
    pub ace: String,
}

impl Default for ScriptSources {
    fn default() -> Self {
        Self {
            axe: DEFAULT_AXE_SCRIPT.to_string(),
            ace: DEFAULT_ACE_SCRIPT.to_string(),
        }
    }
}

/// Complete configuration for audits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Default engine when a request does not name one
    pub engine: EngineKind,
    /// Default conformance target
    pub level: WcagLevel,
    /// Run the keyboard walk as part of `analyze_*` by default
    pub keyboard_test: bool,
    /// Include axe `best-practice` rules
    pub best_practices: bool,
    /// ACE result levels reported as violations
    pub ace_report_levels: Vec<AceLevel>,
    pub browser: BrowserConfig,
    pub scripts: ScriptSources,
    pub walk: WalkTuning,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            level: WcagLevel::default(),
            keyboard_test: true,
            best_practices: false,
            ace_report_levels: vec![AceLevel::Violation, AceLevel::PotentialViolation],
            browser: BrowserConfig::default(),
            scripts: ScriptSources::default(),
            walk: WalkTuning::default(),
        }
    }
}

/// Parse a comma-separated ACE level list, skipping unknown entries
pub fn parse_ace_levels(value: &str) -> Vec<AceLevel> {
    let levels: Vec<AceLevel> = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<AceLevel>() {
            Ok(level) => Some(level),
            Err(e) => {
                tracing::warn!("{}; ignoring", e);
                None
            }
        })
        .collect();

    if levels.is_empty() {
        AuditConfig::default().ace_report_levels
    } else {
        levels
    }
}
