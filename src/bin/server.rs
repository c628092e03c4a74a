//! wcag-probe MCP Server
//!
//! Run with: wcag-probe-server

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wcag_probe::config::{
    parse_ace_levels, AuditConfig, BrowserConfig, EngineKind, ScriptSources, WalkTuning,
    WcagLevel, DEFAULT_ACE_SCRIPT, DEFAULT_AXE_SCRIPT,
};
use wcag_probe::mcp::{McpServer, ProbeHandler};
use wcag_probe::Auditor;

#[derive(Parser, Debug)]
#[command(name = "wcag-probe-server")]
#[command(about = "wcag-probe MCP server for accessibility audits")]
#[command(version)]
struct Args {
    /// Default rule engine (axe, ace, both)
    #[arg(long, env = "WCAG_PROBE_ENGINE", default_value = "axe")]
    engine: String,

    /// Default WCAG conformance target (e.g. wcag21aa, "WCAG 2.2 AA")
    #[arg(long, env = "WCAG_PROBE_LEVEL", default_value = "wcag21aa")]
    level: String,

    /// Run the keyboard walk as part of analyze_* by default
    #[arg(long, env = "WCAG_PROBE_KEYBOARD", default_value_t = true, action = clap::ArgAction::Set)]
    keyboard: bool,

    /// Include axe best-practice rules
    #[arg(long, env = "WCAG_PROBE_BEST_PRACTICES")]
    best_practices: bool,

    /// ACE result levels reported as violations (comma-separated)
    #[arg(
        long,
        env = "WCAG_PROBE_ACE_LEVELS",
        default_value = "violation,potentialviolation"
    )]
    ace_levels: String,

    /// Chrome/Chromium executable (auto-detected when unset)
    #[arg(long, env = "WCAG_PROBE_CHROME_PATH")]
    chrome_path: Option<PathBuf>,

    /// Run Chrome headless
    #[arg(long, env = "WCAG_PROBE_HEADLESS", default_value_t = true, action = clap::ArgAction::Set)]
    headless: bool,

    /// Disable the Chrome sandbox (needed in some containers)
    #[arg(long, env = "WCAG_PROBE_NO_SANDBOX")]
    no_sandbox: bool,

    /// Page load timeout in ms
    #[arg(long, env = "WCAG_PROBE_NAV_TIMEOUT_MS", default_value = "30000")]
    nav_timeout_ms: u64,

    /// axe-core bundle: file path or URL
    #[arg(long, env = "WCAG_PROBE_AXE_SCRIPT", default_value = DEFAULT_AXE_SCRIPT)]
    axe_script: String,

    /// IBM Equal Access bundle: file path or URL
    #[arg(long, env = "WCAG_PROBE_ACE_SCRIPT", default_value = DEFAULT_ACE_SCRIPT)]
    ace_script: String,

    /// Wait after each Tab press in ms
    #[arg(long, env = "WCAG_PROBE_TAB_SETTLE_MS", default_value = "100")]
    tab_settle_ms: u64,

    /// Wait after an Enter activation in ms
    #[arg(long, env = "WCAG_PROBE_ACTION_SETTLE_MS", default_value = "500")]
    action_settle_ms: u64,

    /// Consecutive identical focus reads that count as a keyboard trap
    #[arg(
        long,
        env = "WCAG_PROBE_TRAP_THRESHOLD",
        default_value = "3",
        value_parser = clap::value_parser!(u32).range(2..)
    )]
    trap_threshold: u32,

    /// Log as JSON lines
    #[arg(long, env = "WCAG_PROBE_LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn audit_config(&self) -> AuditConfig {
        AuditConfig {
            engine: EngineKind::parse_or_default(&self.engine),
            level: WcagLevel::parse_or_default(&self.level),
            keyboard_test: self.keyboard,
            best_practices: self.best_practices,
            ace_report_levels: parse_ace_levels(&self.ace_levels),
            browser: BrowserConfig {
                chrome_path: self.chrome_path.clone(),
                headless: self.headless,
                sandbox: !self.no_sandbox,
                navigation_timeout_ms: self.nav_timeout_ms,
                ..BrowserConfig::default()
            },
            scripts: ScriptSources {
                axe: self.axe_script.clone(),
                ace: self.ace_script.clone(),
            },
            walk: WalkTuning {
                tab_settle_ms: self.tab_settle_ms,
                activation_settle_ms: self.action_settle_ms,
                trap_repeat_threshold: self.trap_threshold,
                ..WalkTuning::default()
            },
        }
    }
}

fn init_logging(json: bool) {
    // stdout is for MCP protocol
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wcag_probe=info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_json);

    // Parsed after the subscriber is up so fallbacks are logged
    let config = args.audit_config();
    tracing::info!(
        engine = %config.engine,
        level = %config.level,
        keyboard = config.keyboard_test,
        headless = config.browser.headless,
        "wcag-probe server starting"
    );

    let handler = ProbeHandler::new(Auditor::new(Arc::new(config)));
    McpServer::new(handler).run().await?;

    tracing::info!("stdin closed, shutting down");
    Ok(())
}
