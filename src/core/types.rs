use serde::{Deserialize, Serialize};

/// Minimum characters a topic must carry after trimming.
pub const MIN_TOPIC_CHARS: usize = 3;

/// Minimum characters an extracted answer must carry before it is kept
/// as a research section.
pub const SECTION_MIN_CHARS: usize = 50;

/// A validated research topic. Identity is the trimmed raw string;
/// immutable once accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchTopic(String);

impl ResearchTopic {
    pub fn new(raw: &str) -> Result<Self, ResearchError> {
        let trimmed = raw.trim();
        if trimmed.chars().count() < MIN_TOPIC_CHARS {
            return Err(ResearchError::InvalidTopic(raw.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResearchTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One sub-query's findings. Ordering across sections matches the
/// sub-query execution order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResearchSection {
    pub sub_query: String,
    pub content: String,
}

/// Ordered outcome of running all sub-queries for one topic. An empty
/// vec is never produced on the success path — zero sections surfaces
/// as [`ResearchError::NoFindings`] instead.
pub type ResearchResult = Vec<ResearchSection>;

#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    #[error("topic too short: '{0}' (minimum {MIN_TOPIC_CHARS} characters)")]
    InvalidTopic(String),

    /// The browsing session could not start or navigate. Fatal to the
    /// whole research operation.
    #[error("research session fault")]
    SessionFault(#[source] anyhow::Error),

    /// All sub-queries were attempted and none produced a substantial
    /// section. Distinct from a session fault — the session worked, the
    /// findings did not.
    #[error("research produced no usable findings")]
    NoFindings,
}

// ── HTTP boundary types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct InitializeRequest {
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct InitializeResponse {
    pub success: bool,
    pub message: String,
    pub demo_mode: bool,
}

#[derive(Debug, Deserialize)]
pub struct ResearchRequest {
    pub topic: String,
}

#[derive(Debug, Serialize)]
pub struct ResearchResponse {
    pub success: bool,
    pub topic: String,
    pub audio_url: String,
    pub script_preview: String,
    pub script_length: usize,
    pub research_summary: String,
    pub demo_mode: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_rejects_short_input() {
        assert!(ResearchTopic::new("ai").is_err());
        assert!(ResearchTopic::new("  x  ").is_err());
        assert!(ResearchTopic::new("").is_err());
    }

    #[test]
    fn topic_trims_and_keeps_raw_text() {
        let topic = ResearchTopic::new("  quantum computing  ").unwrap();
        assert_eq!(topic.as_str(), "quantum computing");
    }

    #[test]
    fn topic_accepts_exact_minimum() {
        assert!(ResearchTopic::new("llm").is_ok());
    }
}
