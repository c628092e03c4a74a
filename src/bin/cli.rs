//! wcag-probe CLI
//!
//! Run the same audits as the MCP server from a terminal or CI job.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wcag_probe::config::{
    parse_ace_levels, AuditConfig, BrowserConfig, EngineKind, ScriptSources, WcagLevel,
    DEFAULT_ACE_SCRIPT, DEFAULT_AXE_SCRIPT,
};
use wcag_probe::report::render_keyboard;
use wcag_probe::{AuditOptions, Auditor, OutputFormat, Target};

#[derive(Parser)]
#[command(name = "wcag-probe")]
#[command(about = "Accessibility audits with axe-core, IBM Equal Access and keyboard exploration")]
#[command(version)]
struct Cli {
    /// Chrome/Chromium executable (auto-detected when unset)
    #[arg(long, global = true, env = "WCAG_PROBE_CHROME_PATH")]
    chrome_path: Option<PathBuf>,

    /// Disable the Chrome sandbox
    #[arg(long, global = true, env = "WCAG_PROBE_NO_SANDBOX")]
    no_sandbox: bool,

    /// Show the browser window
    #[arg(long, global = true)]
    headful: bool,

    /// axe-core bundle: file path or URL
    #[arg(long, global = true, env = "WCAG_PROBE_AXE_SCRIPT", default_value = DEFAULT_AXE_SCRIPT)]
    axe_script: String,

    /// IBM Equal Access bundle: file path or URL
    #[arg(long, global = true, env = "WCAG_PROBE_ACE_SCRIPT", default_value = DEFAULT_ACE_SCRIPT)]
    ace_script: String,

    /// Output format (markdown, json)
    #[arg(short, long, global = true, default_value = "markdown")]
    format: String,

    /// Output file (- for stdout)
    #[arg(short, long, global = true, default_value = "-")]
    output: String,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// A URL, or an HTML file to load inline
#[derive(Args)]
struct PageArgs {
    /// Page URL
    #[arg(required_unless_present = "html_file", conflicts_with = "html_file")]
    url: Option<String>,

    /// Audit the contents of a local HTML file instead
    #[arg(long)]
    html_file: Option<PathBuf>,
}

impl PageArgs {
    fn target(&self) -> anyhow::Result<Target> {
        match (&self.url, &self.html_file) {
            (Some(url), _) => Ok(Target::Url(url.clone())),
            (None, Some(path)) => {
                let path = shellexpand::tilde(&path.to_string_lossy()).to_string();
                let html = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path))?;
                Ok(Target::Html(html))
            }
            (None, None) => anyhow::bail!("give a URL or --html-file"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the rule engines (and the keyboard walk) against a page
    Analyze {
        #[command(flatten)]
        page: PageArgs,
        /// Rule engine (axe, ace, both)
        #[arg(short, long, env = "WCAG_PROBE_ENGINE", default_value = "axe")]
        engine: String,
        /// WCAG conformance target
        #[arg(short, long, env = "WCAG_PROBE_LEVEL", default_value = "wcag21aa")]
        level: String,
        /// Include axe best-practice rules
        #[arg(long)]
        best_practices: bool,
        /// ACE result levels reported as violations (comma-separated)
        #[arg(long, default_value = "violation,potentialviolation")]
        ace_levels: String,
        /// Skip the keyboard walk
        #[arg(long)]
        no_keyboard: bool,
        /// Exit with status 1 when any violation is found
        #[arg(long)]
        fail_on_violations: bool,
    },
    /// Run only the keyboard walk
    Keyboard {
        #[command(flatten)]
        page: PageArgs,
        /// Exit with status 1 when a keyboard issue is found
        #[arg(long)]
        fail_on_violations: bool,
    },
}

fn write_output(output: &str, text: &str) -> anyhow::Result<()> {
    if output == "-" {
        let mut stdout = io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.write_all(b"\n")?;
    } else {
        let path = shellexpand::tilde(output).to_string();
        std::fs::write(&path, text).with_context(|| format!("writing {}", path))?;
        eprintln!("Report written to {}", path);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "wcag_probe=debug"
    } else {
        "wcag_probe=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    let format = OutputFormat::parse_or_default(&cli.format);
    let mut config = AuditConfig {
        browser: BrowserConfig {
            chrome_path: cli.chrome_path.clone(),
            headless: !cli.headful,
            sandbox: !cli.no_sandbox,
            ..BrowserConfig::default()
        },
        scripts: ScriptSources {
            axe: cli.axe_script.clone(),
            ace: cli.ace_script.clone(),
        },
        ..AuditConfig::default()
    };

    let failed = match cli.command {
        Commands::Analyze {
            page,
            engine,
            level,
            best_practices,
            ace_levels,
            no_keyboard,
            fail_on_violations,
        } => {
            config.best_practices = best_practices;
            config.ace_report_levels = parse_ace_levels(&ace_levels);
            let options = AuditOptions {
                engine: Some(EngineKind::parse_or_default(&engine)),
                level: Some(WcagLevel::parse_or_default(&level)),
                include_keyboard: Some(!no_keyboard),
            };

            let auditor = Auditor::new(Arc::new(config));
            let report = match page.target()? {
                Target::Url(url) => auditor.analyze_url(&url, &options)?,
                Target::Html(html) => auditor.analyze_html(&html, &options)?,
            };
            write_output(&cli.output, &report.render(format)?)?;
            fail_on_violations && !report.violations.is_empty()
        }

        Commands::Keyboard {
            page,
            fail_on_violations,
        } => {
            let target = page.target()?;
            let auditor = Auditor::new(Arc::new(config));
            let result = auditor.test_keyboard(&target)?;
            write_output(&cli.output, &render_keyboard(target.label(), &result, format)?)?;
            fail_on_violations && result.has_issues()
        }
    };

    if failed {
        std::process::exit(1);
    }
    Ok(())
}
