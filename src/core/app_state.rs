use std::sync::Arc;

use crate::core::config::AppConfig;
use crate::research::{self, ResearchProvider};

/// Shared application state for the HTTP layer.
///
/// The research provider lives behind an async `Mutex` because the live
/// variant exclusively owns a single browser handle — two overlapping
/// research runs against one session are never allowed.
#[derive(Clone)]
pub struct AppState {
    pub http_client: reqwest::Client,
    pub config: Arc<AppConfig>,
    pub provider: Arc<tokio::sync::Mutex<Box<dyn ResearchProvider>>>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("demo_mode", &self.config.resolve_demo_mode())
            .finish()
    }
}

impl AppState {
    pub fn new(http_client: reqwest::Client, config: AppConfig) -> Self {
        let provider = research::make_provider(&config);
        Self {
            http_client,
            config: Arc::new(config),
            provider: Arc::new(tokio::sync::Mutex::new(provider)),
        }
    }
}
