//! Research orchestrator — drives the fixed sub-query sequence through the
//! live session and aggregates ordered sections.
//!
//! Sub-queries run strictly sequentially: the UI's state after one answer is
//! the precondition for the next submission, and burst traffic is exactly
//! what anti-automation defenses key on. A sub-query that fails anywhere in
//! locate/type/submit/extract is skipped and logged; only the aggregate
//! outcome crosses the boundary.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::core::config::{AppConfig, ResearchTimings};
use crate::core::types::{
    ResearchError, ResearchResult, ResearchSection, ResearchTopic, SECTION_MIN_CHARS,
};
use crate::research::session::{SessionController, TARGET_URL};
use crate::research::{extract, ResearchProvider};

/// The five research angles issued for every topic, in order.
pub fn build_sub_queries(topic: &ResearchTopic) -> Vec<String> {
    let t = topic.as_str();
    vec![
        format!("comprehensive analysis of {t} with key benefits and advantages"),
        format!("main criticisms and challenges of {t}"),
        format!("recent research and developments about {t}"),
        format!("practical applications and real-world examples of {t}"),
        format!("expert opinions and future outlook for {t}"),
    ]
}

/// Keep only substantial answers, preserving sub-query execution order.
///
/// `None` marks a sub-query that failed before extraction; `Some` content
/// still has to clear [`SECTION_MIN_CHARS`]. Zero kept sections is the
/// no-findings failure, never an empty success.
pub fn assemble_sections(
    outcomes: Vec<(String, Option<String>)>,
) -> Result<ResearchResult, ResearchError> {
    let mut sections = Vec::new();
    for (sub_query, content) in outcomes {
        match content {
            Some(content) if content.trim().chars().count() > SECTION_MIN_CHARS => {
                sections.push(ResearchSection { sub_query, content });
            }
            Some(_) => warn!("⚠️ No substantial content for: {}", sub_query),
            None => warn!("⚠️ Sub-query skipped: {}", sub_query),
        }
    }
    if sections.is_empty() {
        return Err(ResearchError::NoFindings);
    }
    Ok(sections)
}

/// Live research backend: one exclusively-owned browser session driven
/// through the sub-query loop.
pub struct LiveResearcher {
    session: SessionController,
    timings: ResearchTimings,
}

impl LiveResearcher {
    pub fn new(config: &AppConfig) -> Self {
        let timings = config.resolve_timings();
        Self {
            session: SessionController::new(config.resolve_headless(), timings.clone()),
            timings,
        }
    }

    /// One sub-query end to end. Any failure aborts only this sub-query's
    /// contribution.
    async fn run_sub_query(&mut self, query: &str) -> Option<String> {
        match self.try_sub_query(query).await {
            Ok(content) => Some(content),
            Err(e) => {
                error!("❌ Sub-query failed: {:#}", e);
                self.session.complete_query();
                None
            }
        }
    }

    async fn try_sub_query(&mut self, query: &str) -> Result<String> {
        self.session.submit_query(query).await?;

        // Fixed settle wait: answers render incrementally and there is no
        // reliable completion signal to poll for.
        tokio::time::sleep(self.timings.settle_delay).await;

        let content = extract::extract_answer(self.session.page()?).await;
        self.session.complete_query();
        Ok(content)
    }
}

#[async_trait]
impl ResearchProvider for LiveResearcher {
    async fn initialize(&mut self) -> Result<bool> {
        self.session.initialize().await
    }

    async fn authenticate(&mut self, email: &str) -> Result<bool> {
        self.session.authenticate(email).await
    }

    async fn research(&mut self, topic: &ResearchTopic) -> Result<ResearchResult, ResearchError> {
        // A fresh conversation per topic: sub-queries assume the primary
        // input is reachable from the landing page.
        let nav = async {
            let page = self.session.page()?;
            page.goto(TARGET_URL)
                .await
                .context("navigation to target site failed")?;
            Ok::<_, anyhow::Error>(())
        };
        nav.await.map_err(ResearchError::SessionFault)?;
        tokio::time::sleep(self.timings.post_nav_delay).await;

        let queries = build_sub_queries(topic);
        let total = queries.len();
        let mut outcomes = Vec::with_capacity(total);

        for (i, query) in queries.into_iter().enumerate() {
            info!("🔍 Researching ({}/{}): {}", i + 1, total, query);
            let content = self.run_sub_query(&query).await;
            if content.is_some() {
                let preview: String = query.chars().take(50).collect();
                info!("✅ Retrieved content for: {}…", preview);
            }
            outcomes.push((query, content));

            // Human pacing between questions, regardless of outcome.
            tokio::time::sleep(self.timings.inter_query_delay).await;
        }

        let result = assemble_sections(outcomes)?;
        info!("✅ Research completed with {} sections", result.len());
        Ok(result)
    }

    async fn close(&mut self) {
        self.session.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(raw: &str) -> ResearchTopic {
        ResearchTopic::new(raw).unwrap()
    }

    fn substantial(tag: &str) -> String {
        format!("{tag} {}", "detail ".repeat(20))
    }

    #[test]
    fn exactly_five_sub_queries_embedding_the_topic() {
        let queries = build_sub_queries(&topic("solid-state batteries"));
        assert_eq!(queries.len(), 5);
        for q in &queries {
            assert!(q.contains("solid-state batteries"), "missing topic in: {q}");
        }
        assert!(queries[0].contains("benefits"));
        assert!(queries[1].contains("criticisms"));
        assert!(queries[4].contains("future outlook"));
    }

    #[test]
    fn partial_success_preserves_relative_order() {
        let outcomes = vec![
            ("q1".to_string(), Some(substantial("first"))),
            ("q2".to_string(), None),
            ("q3".to_string(), Some(substantial("third"))),
            ("q4".to_string(), None),
            ("q5".to_string(), Some(substantial("fifth"))),
        ];
        let sections = assemble_sections(outcomes).unwrap();
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].sub_query, "q1");
        assert_eq!(sections[1].sub_query, "q3");
        assert_eq!(sections[2].sub_query, "q5");
        assert!(sections[1].content.starts_with("third"));
    }

    #[test]
    fn all_failures_surface_no_findings() {
        let outcomes = vec![
            ("q1".to_string(), None),
            ("q2".to_string(), None),
            ("q3".to_string(), None),
            ("q4".to_string(), None),
            ("q5".to_string(), None),
        ];
        assert!(matches!(
            assemble_sections(outcomes),
            Err(ResearchError::NoFindings)
        ));
    }

    #[test]
    fn thin_answers_are_dropped_silently() {
        let outcomes = vec![
            ("q1".to_string(), Some("too thin".to_string())),
            ("q2".to_string(), Some(substantial("kept"))),
        ];
        let sections = assemble_sections(outcomes).unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].sub_query, "q2");
    }

    #[test]
    fn boundary_length_is_not_substantial() {
        let exactly = "x".repeat(SECTION_MIN_CHARS);
        let outcomes = vec![("q1".to_string(), Some(exactly))];
        assert!(matches!(
            assemble_sections(outcomes),
            Err(ResearchError::NoFindings)
        ));
    }
}
