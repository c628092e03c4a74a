//! wcag-probe - accessibility auditing over MCP
//!
//! Renders pages in Chrome, scans them with axe-core and/or IBM Equal
//! Access, and explores them with simulated keyboard input to find
//! keyboard traps, unreachable controls and dialogs that ignore Escape.

pub mod audit;
pub mod browser;
pub mod config;
pub mod engines;
pub mod error;
pub mod keyboard;
pub mod mcp;
pub mod report;
pub mod types;

pub use audit::{AuditOptions, Auditor, Target};
pub use config::{AuditConfig, EngineKind, WalkTuning, WcagLevel};
pub use error::{ProbeError, Result};
pub use keyboard::{keyboard_violations, run_keyboard_test, KeyboardPage, KeyboardWalk};
pub use report::{AuditReport, OutputFormat};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
