use std::time::Duration;

// ---------------------------------------------------------------------------
// AppConfig — file-based config loader (synthscholar.json) with env-var fallback
// ---------------------------------------------------------------------------

/// Top-level config loaded from `synthscholar.json`. Every field is optional;
/// `resolve_*` methods apply env-var fallbacks and defaults.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct AppConfig {
    /// Account email for the research site login flow.
    pub email: Option<String>,
    /// Account password. Never logged. Manual verification steps stay manual.
    pub password: Option<String>,
    /// Demo mode serves canned research without launching a browser.
    pub demo_mode: Option<bool>,
    /// Run the browser headless. Defaults to the opposite of demo mode.
    pub headless: Option<bool>,

    /// LLM endpoint — e.g. `https://api.openai.com/v1` or `http://localhost:11434/v1` (Ollama).
    pub llm_base_url: Option<String>,
    /// API key. Never logged. Leave blank for key-less local endpoints.
    pub llm_api_key: Option<String>,
    /// Model name — e.g. `gpt-4o-mini`, `llama3`, `mistral`.
    pub llm_model: Option<String>,

    /// Bounded wait for locating page elements, in milliseconds.
    pub element_wait_ms: Option<u64>,
    /// Post-submit settle wait before extraction, in milliseconds.
    pub settle_delay_ms: Option<u64>,
    /// Pause between consecutive sub-queries, in milliseconds.
    pub inter_query_delay_ms: Option<u64>,
    /// Base per-character typing pace, in milliseconds.
    pub typing_delay_ms: Option<u64>,
}

/// Named wait durations for the research loop. Tests thread in near-zero
/// values here instead of patching sleeps inside the core.
#[derive(Debug, Clone)]
pub struct ResearchTimings {
    /// Bounded wait when locating the query input or a login element.
    pub element_wait: Duration,
    /// Blocking wait after submit so asynchronous rendering can finish.
    pub settle_delay: Duration,
    /// Pause between sub-queries, regardless of each one's outcome.
    pub inter_query_delay: Duration,
    /// Base pace for incremental-character typing. Jittered per character.
    pub typing_delay: Duration,
    /// Wait after a page navigation before inspecting the DOM.
    pub post_nav_delay: Duration,
}

impl Default for ResearchTimings {
    fn default() -> Self {
        Self {
            element_wait: Duration::from_secs(20),
            settle_delay: Duration::from_secs(10),
            inter_query_delay: Duration::from_secs(3),
            typing_delay: Duration::from_millis(50),
            post_nav_delay: Duration::from_secs(3),
        }
    }
}

impl ResearchTimings {
    /// Near-zero waits for unit tests.
    pub fn immediate() -> Self {
        Self {
            element_wait: Duration::from_millis(10),
            settle_delay: Duration::ZERO,
            inter_query_delay: Duration::ZERO,
            typing_delay: Duration::ZERO,
            post_nav_delay: Duration::ZERO,
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(key: &str) -> Option<bool> {
    let v = std::env::var(key).ok()?;
    let v = v.trim().to_ascii_lowercase();
    if v.is_empty() {
        return None;
    }
    Some(!matches!(v.as_str(), "0" | "false" | "no" | "off"))
}

fn env_millis(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl AppConfig {
    /// Account email: JSON field → `SYNTHSCHOLAR_EMAIL` env var → `None`.
    pub fn resolve_email(&self) -> Option<String> {
        self.email
            .clone()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| env_nonempty("SYNTHSCHOLAR_EMAIL"))
    }

    /// Account password: JSON field → `SYNTHSCHOLAR_PASSWORD` env var → `None`.
    pub fn resolve_password(&self) -> Option<String> {
        self.password
            .clone()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| env_nonempty("SYNTHSCHOLAR_PASSWORD"))
    }

    /// Demo mode: JSON field → `SYNTHSCHOLAR_DEMO` env var → `true`.
    ///
    /// Demo is the default so the server always has a working end-to-end path
    /// even on machines without a browser install or site account.
    pub fn resolve_demo_mode(&self) -> bool {
        if let Some(b) = self.demo_mode {
            return b;
        }
        env_flag("SYNTHSCHOLAR_DEMO").unwrap_or(true)
    }

    /// Headless browser: JSON field → `SYNTHSCHOLAR_HEADLESS` env var →
    /// headless in production, headed in demo mode.
    pub fn resolve_headless(&self) -> bool {
        if let Some(b) = self.headless {
            return b;
        }
        env_flag("SYNTHSCHOLAR_HEADLESS").unwrap_or(!self.resolve_demo_mode())
    }

    /// API key: JSON field → `OPENAI_API_KEY` env var → `None`.
    ///
    /// When `llm_api_key` is explicitly set to `""` in the config file, returns `Some("")`.
    /// This signals "no key required" (Ollama / LM Studio) — synthesis proceeds without auth.
    /// Returns `None` only when the field is absent from config AND `OPENAI_API_KEY` is unset.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(k) = &self.llm_api_key {
            return Some(k.trim().to_string());
        }
        env_nonempty("OPENAI_API_KEY")
    }

    /// LLM base URL: JSON field → `OPENAI_BASE_URL` env var → `https://api.openai.com/v1`.
    pub fn resolve_base_url(&self) -> String {
        self.llm_base_url
            .clone()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| env_nonempty("OPENAI_BASE_URL"))
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
    }

    /// Model name: JSON field → `SYNTHSCHOLAR_LLM_MODEL` env var → `gpt-4o-mini`.
    pub fn resolve_model(&self) -> String {
        self.llm_model
            .clone()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| env_nonempty("SYNTHSCHOLAR_LLM_MODEL"))
            .unwrap_or_else(|| "gpt-4o-mini".to_string())
    }

    /// Research-loop timings: JSON fields → `SYNTHSCHOLAR_*_MS` env vars → defaults.
    pub fn resolve_timings(&self) -> ResearchTimings {
        let defaults = ResearchTimings::default();
        let ms = |field: Option<u64>, key: &str, fallback: Duration| {
            field
                .or_else(|| env_millis(key))
                .map(Duration::from_millis)
                .unwrap_or(fallback)
        };
        ResearchTimings {
            element_wait: ms(
                self.element_wait_ms,
                "SYNTHSCHOLAR_ELEMENT_WAIT_MS",
                defaults.element_wait,
            ),
            settle_delay: ms(
                self.settle_delay_ms,
                "SYNTHSCHOLAR_SETTLE_MS",
                defaults.settle_delay,
            ),
            inter_query_delay: ms(
                self.inter_query_delay_ms,
                "SYNTHSCHOLAR_INTER_QUERY_MS",
                defaults.inter_query_delay,
            ),
            typing_delay: ms(
                self.typing_delay_ms,
                "SYNTHSCHOLAR_TYPING_MS",
                defaults.typing_delay,
            ),
            post_nav_delay: defaults.post_nav_delay,
        }
    }
}

/// Load `synthscholar.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `SYNTHSCHOLAR_CONFIG` env var path
/// 2. `./synthscholar.json` (process cwd)
/// 3. `../synthscholar.json` (repo root when running from a subdirectory)
///
/// Missing file → `AppConfig::default()` (silent, all env-var fallbacks apply).
/// Parse error → log a warning, return `AppConfig::default()`.
pub fn load_app_config() -> AppConfig {
    let candidates: Vec<std::path::PathBuf> = {
        let mut v = vec![
            std::path::PathBuf::from("synthscholar.json"),
            std::path::PathBuf::from("../synthscholar.json"),
        ];
        if let Ok(env_path) = std::env::var("SYNTHSCHOLAR_CONFIG") {
            v.insert(0, std::path::PathBuf::from(env_path));
        }
        v
    };

    for path in &candidates {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<AppConfig>(&contents) {
                Ok(cfg) => {
                    tracing::info!("synthscholar.json loaded from {}", path.display());
                    return cfg;
                }
                Err(e) => {
                    tracing::warn!(
                        "synthscholar.json parse error at {}: {} — using defaults",
                        path.display(),
                        e
                    );
                    return AppConfig::default();
                }
            },
            Err(_) => continue, // file not found at this path — try next
        }
    }

    AppConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_fields_win_over_defaults() {
        let cfg: AppConfig = serde_json::from_str(
            r#"{
                "demo_mode": false,
                "llm_model": "llama3",
                "settle_delay_ms": 0,
                "typing_delay_ms": 1
            }"#,
        )
        .unwrap();
        assert!(!cfg.resolve_demo_mode());
        assert_eq!(cfg.resolve_model(), "llama3");
        let timings = cfg.resolve_timings();
        assert_eq!(timings.settle_delay, Duration::ZERO);
        assert_eq!(timings.typing_delay, Duration::from_millis(1));
        // Untouched fields keep their defaults.
        assert_eq!(timings.inter_query_delay, Duration::from_secs(3));
    }

    #[test]
    fn empty_api_key_means_keyless_endpoint() {
        let cfg: AppConfig = serde_json::from_str(r#"{"llm_api_key": ""}"#).unwrap();
        assert_eq!(cfg.resolve_api_key(), Some(String::new()));
    }

    #[test]
    fn demo_mode_defaults_headless_off() {
        let cfg = AppConfig {
            demo_mode: Some(true),
            ..Default::default()
        };
        assert!(!cfg.resolve_headless());

        let cfg = AppConfig {
            demo_mode: Some(false),
            ..Default::default()
        };
        assert!(cfg.resolve_headless());
    }
}
