//! Session controller — owns the live browsing session end to end.
//!
//! Lifecycle: `Uninitialized → Initializing → Ready → QueryInFlight → Ready …
//! → Closed`. A startup failure lands in `Faulted`; the only way out is a
//! fresh `initialize`, which retries the launch from scratch — queries and
//! login never proceed from a faulted session. The controller exclusively
//! owns the `Browser` and its single `Page`; nothing else touches the handle.

use anyhow::{anyhow, Context, Result};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::{Browser, Element, Page};
use futures::StreamExt;
use rand::distr::{Distribution, Uniform};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::core::config::ResearchTimings;
use crate::research::browser;

/// The conversational search UI this engine drives.
pub const TARGET_URL: &str = "https://www.perplexity.ai";

/// The primary query input. Its presence doubles as the authenticated-state
/// indicator during login.
pub const QUERY_INPUT_SELECTOR: &str = "textarea[placeholder='Ask anything...']";

/// Ordered lookup chain for the email field on the login form.
const EMAIL_INPUT_SELECTORS: &[&str] = &[
    "input[type='email']",
    "input[name='email']",
    "input[placeholder='Email']",
];

/// Login-trigger labels, tried in order against visible buttons/links.
/// CSS cannot match by text, so the click happens in page JS.
const LOGIN_TRIGGER_LABELS: &[&str] = &["log in", "login", "sign in"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    QueryInFlight,
    Closed,
    Faulted,
}

pub struct SessionController {
    state: SessionState,
    headless: bool,
    timings: ResearchTimings,
    browser: Option<Browser>,
    page: Option<Page>,
    handler_task: Option<tokio::task::JoinHandle<()>>,
}

impl SessionController {
    pub fn new(headless: bool, timings: ResearchTimings) -> Self {
        Self {
            state: SessionState::Uninitialized,
            headless,
            timings,
            browser: None,
            page: None,
            handler_task: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Launch the browser with stealth defaults and open the working tab.
    ///
    /// Startup errors are logged and reported as `Ok(false)` and the session
    /// is `Faulted`. Calling again retries the launch from scratch — the
    /// transient causes (browser not yet installed, stale lock, resource
    /// pressure) are exactly the ones a user fixes and re-attempts.
    pub async fn initialize(&mut self) -> Result<bool> {
        if self.state == SessionState::Ready {
            return Ok(true);
        }
        self.state = SessionState::Initializing;

        match self.try_initialize().await {
            Ok(()) => {
                info!("✅ Browser session initialized");
                self.state = SessionState::Ready;
                Ok(true)
            }
            Err(e) => {
                error!("❌ Failed to initialize browser session: {:#}", e);
                self.state = SessionState::Faulted;
                Ok(false)
            }
        }
    }

    async fn try_initialize(&mut self) -> Result<()> {
        let exe = browser::find_chrome_executable().ok_or_else(|| {
            anyhow!("No browser found. Install Chrome, Chromium, or Brave. Set CHROME_EXECUTABLE if installed in a non-standard location.")
        })?;

        let config = browser::build_session_config(&exe, self.headless)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| anyhow!("Failed to launch browser ({}): {}", exe, e))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("CDP handler error: {}", e);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| anyhow!("Failed to open working tab: {}", e))?;

        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(
            browser::WEBDRIVER_MASK_SCRIPT,
        ))
        .await
        .map_err(|e| anyhow!("Failed to inject webdriver mask: {}", e))?;

        self.browser = Some(browser);
        self.page = Some(page);
        self.handler_task = Some(handler_task);
        Ok(())
    }

    /// Navigate to the target site and establish a usable login state.
    ///
    /// Idempotent: an already-authenticated session (query input present)
    /// returns success immediately. A missing login trigger is treated as
    /// *probably already authenticated* — a permissive default; callers must
    /// not assume this guarantees a logged-in state. Verification codes and
    /// other out-of-band steps remain a human's job.
    pub async fn authenticate(&mut self, email: &str) -> Result<bool> {
        match self.try_authenticate(email).await {
            Ok(ok) => Ok(ok),
            Err(e) => {
                error!("❌ Login failed: {:#}", e);
                Ok(false)
            }
        }
    }

    async fn try_authenticate(&mut self, email: &str) -> Result<bool> {
        let post_nav = self.timings.post_nav_delay;
        let element_wait = self.timings.element_wait;
        let page = self.page()?;

        info!("🌐 Navigating to {}", TARGET_URL);
        page.goto(TARGET_URL)
            .await
            .context("navigation to target site failed")?;
        tokio::time::sleep(post_nav).await;

        if page.find_element(QUERY_INPUT_SELECTOR).await.is_ok() {
            info!("✅ Already signed in (query input present)");
            return Ok(true);
        }

        if !self.click_login_trigger().await {
            warn!("⚠️ Login trigger not found — assuming an existing session");
            return Ok(true);
        }
        info!("✅ Login trigger clicked");
        tokio::time::sleep(post_nav).await;

        let page = self.page()?;
        for selector in EMAIL_INPUT_SELECTORS {
            let Ok(field) = wait_for_element(page, selector, element_wait).await else {
                continue;
            };
            field.focus().await.context("email field focus failed")?;
            field.type_str(email).await.context("email entry failed")?;
            field
                .press_key("Enter")
                .await
                .context("email submit failed")?;
            info!("✅ Email submitted");
            break;
        }
        tokio::time::sleep(post_nav).await;

        info!("🔐 Complete any verification step manually if prompted");
        Ok(true)
    }

    /// Click the first visible button/link whose text matches a login label.
    /// Returns `false` when no trigger exists on the page.
    async fn click_login_trigger(&self) -> bool {
        let labels = LOGIN_TRIGGER_LABELS
            .iter()
            .map(|l| format!("'{}'", l))
            .collect::<Vec<_>>()
            .join(", ");
        let js = format!(
            r#"(() => {{
                const labels = [{labels}];
                const nodes = document.querySelectorAll('button, a');
                for (const el of nodes) {{
                    const text = (el.innerText || '').trim().toLowerCase();
                    if (labels.some(l => text.includes(l))) {{ el.click(); return true; }}
                }}
                return false;
            }})()"#
        );

        let Some(page) = self.page.as_ref() else {
            return false;
        };
        page.evaluate(js)
            .await
            .ok()
            .and_then(|v| v.into_value::<bool>().ok())
            .unwrap_or(false)
    }

    /// Locate and clear the query input, then submit one sub-query with
    /// incremental human-paced typing. Flips the session to `QueryInFlight`;
    /// the orchestrator calls [`complete_query`](Self::complete_query) after
    /// extraction.
    pub async fn submit_query(&mut self, query: &str) -> Result<()> {
        let element_wait = self.timings.element_wait;
        let base_ms = self.timings.typing_delay.as_millis() as u64;
        let page = self.page()?.clone();

        let input = wait_for_element(&page, QUERY_INPUT_SELECTOR, element_wait)
            .await
            .context("query input not found within bounded wait")?;
        self.state = SessionState::QueryInFlight;

        // Clear any leftover text through the DOM so the framework notices.
        page.evaluate(format!(
            r#"(() => {{
                const el = document.querySelector("{QUERY_INPUT_SELECTOR}");
                if (el) {{ el.value = ''; el.dispatchEvent(new Event('input', {{bubbles: true}})); }}
            }})()"#
        ))
        .await
        .context("query input clear failed")?;
        input.click().await.context("query input click failed")?;

        // Pre-draw the per-character jitter; the RNG is not Send and must not
        // be held across an await.
        let delays: Vec<u64> = {
            let mut rng = rand::rng();
            let lo = base_ms / 2;
            let hi = base_ms + base_ms / 2 + 1;
            let dist = Uniform::new(lo, hi).expect("valid typing jitter range");
            query.chars().map(|_| dist.sample(&mut rng)).collect()
        };

        for (ch, delay) in query.chars().zip(delays) {
            input
                .type_str(ch.to_string())
                .await
                .context("typing into query input failed")?;
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }

        input
            .press_key("Enter")
            .await
            .context("query submit failed")?;
        Ok(())
    }

    /// Return the session to `Ready` after a sub-query's extraction finished.
    pub fn complete_query(&mut self) {
        if self.state == SessionState::QueryInFlight {
            self.state = SessionState::Ready;
        }
    }

    /// The live page handle. Errors when the session never started or was closed.
    pub fn page(&self) -> Result<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| anyhow!("no live session (state: {:?})", self.state))
    }

    /// Release the session handle. Safe to call repeatedly; a session that
    /// never started simply transitions to `Closed`.
    pub async fn close(&mut self) {
        self.page = None;
        if let Some(mut b) = self.browser.take() {
            if let Err(e) = b.close().await {
                warn!("Browser close error (non-fatal): {}", e);
            }
            let _ = b.wait().await;
            info!("🔚 Browser session closed");
        }
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
        if self.state != SessionState::Faulted {
            self.state = SessionState::Closed;
        }
    }
}

/// Poll for an element until it appears or the bounded wait elapses.
pub async fn wait_for_element(
    page: &Page,
    selector: &str,
    timeout: Duration,
) -> Result<Element> {
    let poll = Duration::from_millis(250);
    let start = std::time::Instant::now();
    loop {
        match page.find_element(selector).await {
            Ok(el) => return Ok(el),
            Err(_) if start.elapsed() < timeout => tokio::time::sleep(poll.min(timeout)).await,
            Err(e) => return Err(anyhow!("element '{}' not found: {}", selector, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn close_is_idempotent_without_initialize() {
        let mut session = SessionController::new(true, ResearchTimings::immediate());
        assert_eq!(session.state(), SessionState::Uninitialized);

        session.close().await;
        assert_eq!(session.state(), SessionState::Closed);
        // Second close never raises and leaves no live handle.
        session.close().await;
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.page().is_err());
    }

    #[tokio::test]
    async fn queries_require_a_live_session() {
        let mut session = SessionController::new(true, ResearchTimings::immediate());
        let err = session.submit_query("anything").await.unwrap_err();
        assert!(err.to_string().contains("no live session"));
    }

    #[test]
    fn complete_query_only_leaves_in_flight() {
        let mut session = SessionController::new(true, ResearchTimings::immediate());
        session.complete_query();
        assert_eq!(session.state(), SessionState::Uninitialized);
    }
}
