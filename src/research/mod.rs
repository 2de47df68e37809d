pub mod browser;
pub mod extract;
pub mod mock;
pub mod orchestrator;
pub mod session;

use anyhow::Result;
use async_trait::async_trait;

use crate::core::config::AppConfig;
use crate::core::types::{ResearchError, ResearchResult, ResearchTopic};

pub use mock::MockResearcher;
pub use orchestrator::LiveResearcher;

/// Common capability surface for the live and mock research backends.
///
/// Callers hold a trait object and cannot tell the variants apart except for
/// behavior under failure: the mock's `research` never returns an error.
///
/// `Send` only: the provider lives inside an async mutex, which is also what
/// guarantees a single orchestrator invocation per session handle.
#[async_trait]
pub trait ResearchProvider: Send {
    /// Start the backing session. `Ok(false)` means startup failed; the
    /// cause has already been logged and the operation cannot proceed.
    async fn initialize(&mut self) -> Result<bool>;

    /// Best-effort login. `Ok(false)` is soft: the session may already
    /// satisfy the precondition for querying, so callers log and continue.
    async fn authenticate(&mut self, email: &str) -> Result<bool>;

    /// Run the full sub-query sequence for one topic.
    async fn research(&mut self, topic: &ResearchTopic) -> Result<ResearchResult, ResearchError>;

    /// Release the backing session. Idempotent; must run on every exit path
    /// once `initialize` has succeeded.
    async fn close(&mut self);
}

/// Pick the backend for the configured mode. Demo serves canned findings
/// with no browser; production drives a live session.
pub fn make_provider(config: &AppConfig) -> Box<dyn ResearchProvider> {
    if config.resolve_demo_mode() {
        Box::new(MockResearcher::new())
    } else {
        Box::new(LiveResearcher::new(config))
    }
}
