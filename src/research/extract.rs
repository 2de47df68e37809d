//! Content extraction — ordered selector fallback chain.
//!
//! Answer containers on conversational search UIs are unstable: class names
//! shift between releases and A/B buckets. The chain is data, not control
//! flow: each rule is one lookup that yields content-or-nothing, and the
//! first rule whose content clears its own substance threshold wins.

use anyhow::Result;
use chromiumoxide::Page;
use tracing::{info, warn};

/// Substance threshold for the primary answer-container rules.
pub const PRIMARY_MIN_CHARS: usize = 200;

/// Substance threshold for the whole-page fallback.
pub const FALLBACK_MIN_CHARS: usize = 100;

/// Returned when every rule misses. A valid *content* value, not an error:
/// it distinguishes "got something, low confidence" from "got nothing".
pub const EXTRACTION_INCOMPLETE: &str =
    "Research content extraction incomplete. Please try again.";

/// One lookup heuristic for the main answer content of a rendered page.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionRule {
    pub name: &'static str,
    pub selector: &'static str,
    pub min_chars: usize,
}

/// Primary rules in priority order. A higher-priority rule wins whenever it
/// meets its own threshold, regardless of what later rules would return.
pub const ANSWER_RULES: &[ExtractionRule] = &[
    ExtractionRule {
        name: "prose-container",
        selector: "div[class*='prose']",
        min_chars: PRIMARY_MIN_CHARS,
    },
    ExtractionRule {
        name: "answer-container",
        selector: "div[class*='answer']",
        min_chars: PRIMARY_MIN_CHARS,
    },
    ExtractionRule {
        name: "message-container",
        selector: "div[class*='message']",
        min_chars: PRIMARY_MIN_CHARS,
    },
    ExtractionRule {
        name: "content-container",
        selector: "div[class*='content']",
        min_chars: PRIMARY_MIN_CHARS,
    },
    ExtractionRule {
        name: "text-container",
        selector: "div[class*='text']",
        min_chars: PRIMARY_MIN_CHARS,
    },
    ExtractionRule {
        name: "main-flex",
        selector: "main div[class*='flex'] div[class*='flex']",
        min_chars: PRIMARY_MIN_CHARS,
    },
];

/// Last resort: all visible text under the main content area.
pub const WHOLE_PAGE_FALLBACK: ExtractionRule = ExtractionRule {
    name: "main-text",
    selector: "main",
    min_chars: FALLBACK_MIN_CHARS,
};

/// First candidate whose trimmed text exceeds the rule's substance threshold.
pub fn first_substantial(rule: &ExtractionRule, candidates: &[String]) -> Option<String> {
    candidates
        .iter()
        .map(|text| text.trim())
        .find(|text| !text.is_empty() && text.chars().count() > rule.min_chars)
        .map(str::to_string)
}

/// Walk the rule chain against a rendered page and return the best answer
/// text, or the [`EXTRACTION_INCOMPLETE`] sentinel when every rule misses.
///
/// A rule that errors (detached DOM, CDP hiccup) counts as that rule missing,
/// never as extraction failing overall.
pub async fn extract_answer(page: &Page) -> String {
    for rule in ANSWER_RULES {
        match gather_texts(page, rule.selector).await {
            Ok(texts) => {
                if let Some(content) = first_substantial(rule, &texts) {
                    info!(
                        "✅ Extraction rule '{}' matched ({} chars)",
                        rule.name,
                        content.chars().count()
                    );
                    return content;
                }
            }
            Err(e) => warn!("Extraction rule '{}' failed: {}", rule.name, e),
        }
    }

    match gather_texts(page, WHOLE_PAGE_FALLBACK.selector).await {
        Ok(texts) => {
            if let Some(content) = first_substantial(&WHOLE_PAGE_FALLBACK, &texts) {
                info!(
                    "✅ Whole-page fallback matched ({} chars)",
                    content.chars().count()
                );
                return content;
            }
        }
        Err(e) => warn!("Whole-page fallback failed: {}", e),
    }

    warn!("⚠️ No extraction rule produced qualifying content");
    EXTRACTION_INCOMPLETE.to_string()
}

async fn gather_texts(page: &Page, selector: &str) -> Result<Vec<String>> {
    let elements = page.find_elements(selector).await?;
    let mut texts = Vec::with_capacity(elements.len());
    for element in elements {
        if let Ok(Some(text)) = element.inner_text().await {
            texts.push(text);
        }
    }
    Ok(texts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Synchronous mirror of the `extract_answer` walk, fed from canned
    /// per-selector lookup results.
    fn resolve_chain(hits: &HashMap<&str, Vec<String>>) -> String {
        for rule in ANSWER_RULES {
            let texts = hits.get(rule.selector).cloned().unwrap_or_default();
            if let Some(content) = first_substantial(rule, &texts) {
                return content;
            }
        }
        let texts = hits
            .get(WHOLE_PAGE_FALLBACK.selector)
            .cloned()
            .unwrap_or_default();
        first_substantial(&WHOLE_PAGE_FALLBACK, &texts)
            .unwrap_or_else(|| EXTRACTION_INCOMPLETE.to_string())
    }

    #[test]
    fn threshold_is_strictly_exceeded() {
        let rule = &ANSWER_RULES[0];
        let at_threshold = "x".repeat(PRIMARY_MIN_CHARS);
        let over_threshold = "y".repeat(PRIMARY_MIN_CHARS + 1);
        assert_eq!(first_substantial(rule, &[at_threshold.clone()]), None);
        assert_eq!(
            first_substantial(rule, &[at_threshold, over_threshold.clone()]),
            Some(over_threshold)
        );
    }

    #[test]
    fn whitespace_only_regions_never_qualify() {
        let rule = &WHOLE_PAGE_FALLBACK;
        let padded = " ".repeat(FALLBACK_MIN_CHARS * 2);
        assert_eq!(first_substantial(rule, &[padded]), None);
    }

    #[test]
    fn primary_rule_beats_longer_fallback() {
        // 210 chars under a primary rule vs 80 under the fallback: the
        // primary rule meets its own threshold and wins outright.
        let primary = "p".repeat(210);
        let fallback = "f".repeat(80);
        let mut hits = HashMap::new();
        hits.insert("div[class*='prose']", vec![primary.clone()]);
        hits.insert("main", vec![fallback]);
        assert_eq!(resolve_chain(&hits), primary);
    }

    #[test]
    fn fallback_applies_its_lower_threshold() {
        // 150 chars fails every primary rule (200) but clears the
        // whole-page fallback (100).
        let text = "m".repeat(150);
        let mut hits = HashMap::new();
        hits.insert("div[class*='answer']", vec![text.clone()]);
        hits.insert("main", vec![text.clone()]);
        assert_eq!(resolve_chain(&hits), text);
    }

    #[test]
    fn empty_page_yields_sentinel() {
        let hits = HashMap::new();
        assert_eq!(resolve_chain(&hits), EXTRACTION_INCOMPLETE);
    }

    #[test]
    fn nested_flex_answer_beats_whole_page_fallback() {
        // Some UI buckets render the answer only inside nested flex
        // containers under `main`. The targeted rule must win over the
        // whole-`main` fallback, which would drag in nav/sidebar noise.
        let answer = "a".repeat(250);
        let noisy_main = format!("Home Library Discover {} Sign up for Pro", answer);
        let mut hits = HashMap::new();
        hits.insert(
            "main div[class*='flex'] div[class*='flex']",
            vec![answer.clone()],
        );
        hits.insert("main", vec![noisy_main]);
        assert_eq!(resolve_chain(&hits), answer);
    }

    #[test]
    fn later_rule_wins_when_earlier_rules_miss() {
        let substantial = "z".repeat(300);
        let mut hits = HashMap::new();
        hits.insert("div[class*='prose']", vec!["too short".to_string()]);
        hits.insert("div[class*='message']", vec![substantial.clone()]);
        assert_eq!(resolve_chain(&hits), substantial);
    }
}
