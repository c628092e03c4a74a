//! Chrome DevTools implementation of [`PageHandle`]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::browser::tab::{RequestInterceptor, RequestPausedDecision};
use headless_chrome::browser::transport::{SessionId, Transport};
use headless_chrome::protocol::cdp::Fetch::events::RequestPausedEvent;
use headless_chrome::protocol::cdp::Fetch::FailRequest;
use headless_chrome::protocol::cdp::Network::ErrorReason;
use headless_chrome::{Browser, LaunchOptions, Tab};
use parking_lot::Mutex;
use serde_json::Value;

use super::{Key, PageHandle};
use crate::config::BrowserConfig;
use crate::error::{ProbeError, Result};

/// How long an idle browser process may live before Chrome tears it down
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(600);

/// What the page was first opened with
#[derive(Debug, Clone)]
enum PageOrigin {
    Url(String),
    Inline(String),
}

/// One Chrome tab
pub struct ChromePage {
    tab: Arc<Tab>,
    guard: Arc<AtomicBool>,
    origin: Mutex<Option<PageOrigin>>,
    closed: AtomicBool,
}

impl ChromePage {
    /// Wrap a tab and install the navigation guard interceptor
    pub fn new(tab: Arc<Tab>, config: &BrowserConfig) -> Result<Self> {
        tab.set_default_timeout(config.navigation_timeout());

        let guard = Arc::new(AtomicBool::new(false));
        let interceptor: Arc<dyn RequestInterceptor + Send + Sync> =
            Arc::new(navigation_guard(Arc::clone(&guard)));
        tab.enable_fetch(None, None).map_err(ProbeError::browser)?;
        tab.enable_request_interception(interceptor)
            .map_err(ProbeError::browser)?;

        Ok(Self {
            tab,
            guard,
            origin: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ProbeError::Browser("page already closed".to_string()));
        }
        Ok(())
    }

    /// Run `f` with the guard lifted, restoring its previous state afterwards
    fn unguarded<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let previous = self.guard.swap(false, Ordering::SeqCst);
        let result = f();
        self.guard.store(previous, Ordering::SeqCst);
        result
    }

    fn navigate(&self, url: &str) -> Result<()> {
        self.ensure_open()?;
        self.unguarded(|| {
            self.tab
                .navigate_to(url)
                .and_then(|tab| tab.wait_until_navigated())
                .map(|_| ())
                .map_err(|e| ProbeError::Navigation {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
        })
    }

    fn write_document(&self, html: &str) -> Result<()> {
        self.navigate("about:blank")?;
        let literal = serde_json::to_string(html)?;
        self.evaluate(
            &format!("document.open(); document.write({}); document.close();", literal),
            false,
        )?;
        Ok(())
    }
}

/// Abort document requests while `guard` is set
fn navigation_guard(
    guard: Arc<AtomicBool>,
) -> impl Fn(Arc<Transport>, SessionId, RequestPausedEvent) -> RequestPausedDecision + Send + Sync
{
    move |_transport, _session, event| {
        if !guard.load(Ordering::SeqCst) {
            return RequestPausedDecision::Continue(None);
        }

        // Read through JSON so we only depend on the wire field names
        let params = match serde_json::to_value(&event.params) {
            Ok(params) => params,
            Err(_) => return RequestPausedDecision::Continue(None),
        };
        let is_document = params.get("resourceType").and_then(Value::as_str) == Some("Document");
        let request_id = params.get("requestId").and_then(Value::as_str);

        match (is_document, request_id) {
            (true, Some(request_id)) => {
                tracing::debug!(
                    url = params["request"]["url"].as_str().unwrap_or_default(),
                    "Blocked navigation during keyboard walk"
                );
                RequestPausedDecision::Fail(FailRequest {
                    request_id: request_id.to_string(),
                    error_reason: ErrorReason::BlockedByClient,
                })
            }
            _ => RequestPausedDecision::Continue(None),
        }
    }
}

impl PageHandle for ChromePage {
    fn goto(&self, url: &str) -> Result<()> {
        self.navigate(url)?;
        self.origin
            .lock()
            .get_or_insert_with(|| PageOrigin::Url(url.to_string()));
        Ok(())
    }

    fn set_content(&self, html: &str) -> Result<()> {
        self.write_document(html)?;
        self.origin
            .lock()
            .get_or_insert_with(|| PageOrigin::Inline(html.to_string()));
        Ok(())
    }

    fn reload_origin(&self) -> Result<()> {
        let origin = self.origin.lock().clone();
        match origin {
            Some(PageOrigin::Url(url)) => self.navigate(&url),
            Some(PageOrigin::Inline(html)) => self.write_document(&html),
            None => Err(ProbeError::Browser(
                "page has no origin to reload".to_string(),
            )),
        }
    }

    fn evaluate(&self, expression: &str, await_promise: bool) -> Result<Value> {
        self.ensure_open()?;
        let object = self
            .tab
            .evaluate(expression, await_promise)
            .map_err(|e| ProbeError::Script(e.to_string()))?;
        Ok(object.value.unwrap_or(Value::Null))
    }

    fn press_key(&self, key: Key) -> Result<()> {
        self.ensure_open()?;
        self.tab
            .press_key(key.as_str())
            .map(|_| ())
            .map_err(ProbeError::browser)
    }

    fn url(&self) -> Result<String> {
        self.ensure_open()?;
        Ok(self.tab.get_url())
    }

    fn set_navigation_guard(&self, enabled: bool) -> Result<()> {
        self.guard.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.tab.close(false).map(|_| ()).map_err(ProbeError::browser)
    }
}

/// A browser process plus one page, scoped to a single tool invocation
///
/// Dropping the session closes the page and then the browser, whichever way
/// the invocation ends.
pub struct BrowserSession {
    page: ChromePage,
    // Declared after `page`: fields drop in order, so the tab closes first.
    _browser: Browser,
}

impl BrowserSession {
    /// Launch Chrome and open a fresh tab
    pub fn launch(config: &BrowserConfig) -> Result<Self> {
        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(config.sandbox)
            .path(config.chrome_path.clone())
            .window_size(Some(config.window_size))
            .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
            .build()
            .map_err(|e| ProbeError::Browser(format!("invalid launch options: {}", e)))?;

        let browser = Browser::new(options).map_err(ProbeError::browser)?;
        let tab = browser.new_tab().map_err(ProbeError::browser)?;
        let page = ChromePage::new(tab, config)?;

        tracing::debug!(headless = config.headless, "Browser session started");
        Ok(Self {
            page,
            _browser: browser,
        })
    }

    pub fn page(&self) -> &ChromePage {
        &self.page
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Err(e) = self.page.close() {
            tracing::debug!("Error closing page: {}", e);
        }
        tracing::debug!("Browser session closed");
    }
}
