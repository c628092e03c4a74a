//! Engine bundle loading
//!
//! Bundles are fetched once per process and shared by every audit.

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;

use crate::config::ScriptSources;
use crate::error::{ProbeError, Result};

const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Lazily loads and caches the axe and ACE bundles
pub struct ScriptLoader {
    sources: ScriptSources,
    axe: OnceCell<Arc<str>>,
    ace: OnceCell<Arc<str>>,
}

impl ScriptLoader {
    pub fn new(sources: ScriptSources) -> Self {
        Self {
            sources,
            axe: OnceCell::new(),
            ace: OnceCell::new(),
        }
    }

    /// Pre-loaded bundles, bypassing the configured sources
    pub fn preloaded(axe: impl Into<Arc<str>>, ace: impl Into<Arc<str>>) -> Self {
        let loader = Self::new(ScriptSources::default());
        let _ = loader.axe.set(axe.into());
        let _ = loader.ace.set(ace.into());
        loader
    }

    pub fn axe(&self) -> Result<Arc<str>> {
        self.axe
            .get_or_try_init(|| load_script(&self.sources.axe).map(Arc::from))
            .cloned()
    }

    pub fn ace(&self) -> Result<Arc<str>> {
        self.ace
            .get_or_try_init(|| load_script(&self.sources.ace).map(Arc::from))
            .cloned()
    }
}

/// Read a bundle from a file path (`~` expanded) or an http(s) URL
///
/// Must not be called from inside an async task; remote fetches block.
pub fn load_script(location: &str) -> Result<String> {
    let location = location.trim();
    let source = if location.starts_with("http://") || location.starts_with("https://") {
        fetch_remote(location)?
    } else {
        let path = shellexpand::tilde(location).to_string();
        std::fs::read_to_string(&path).map_err(|e| {
            ProbeError::Config(format!("Cannot read engine script {}: {}", path, e))
        })?
    };

    if source.trim().is_empty() {
        return Err(ProbeError::Config(format!(
            "Engine script {} is empty",
            location
        )));
    }

    tracing::info!(location, bytes = source.len(), "Loaded engine script");
    Ok(source)
}

#[cfg(feature = "remote-scripts")]
fn fetch_remote(url: &str) -> Result<String> {
    let client = reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()?;
    let response = client.get(url).send()?.error_for_status()?;
    Ok(response.text()?)
}

#[cfg(not(feature = "remote-scripts"))]
fn fetch_remote(url: &str) -> Result<String> {
    let _ = FETCH_TIMEOUT;
    Err(ProbeError::Config(format!(
        "Cannot fetch {}: built without the remote-scripts feature; point the script at a local file",
        url
    )))
}
