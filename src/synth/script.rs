//! Script synthesis — turns research sections into a narration script.
//!
//! Primary path is an OpenAI-compatible `chat/completions` call; the key-less
//! and error paths fall back to a deterministic templated script so the
//! pipeline always has narration to render.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::core::types::{ResearchResult, ResearchTopic};
use crate::core::AppState;

const SYSTEM_PROMPT: &str = "You are a professional podcast scriptwriter and educational \
content creator. Create engaging, conversational scripts that are informative yet easy to \
follow. Structure with natural flow: engaging intro, main points with evidence, \
counter-arguments, and a memorable conclusion. Pace the language for audio delivery.";

/// Synthesize a narration script for the gathered research. Never fails:
/// LLM errors and missing keys degrade to the templated fallback.
pub async fn synthesize_script(
    state: &AppState,
    topic: &ResearchTopic,
    sections: &ResearchResult,
) -> String {
    match llm_synthesize(state, topic, sections).await {
        Ok(Some(script)) => {
            info!(
                "✅ Narration script generated ({} chars)",
                script.chars().count()
            );
            script
        }
        Ok(None) => {
            info!("🎭 No LLM key configured — using templated narration");
            fallback_script(topic, sections)
        }
        Err(e) => {
            warn!("❌ Script synthesis failed: {:#} — using templated narration", e);
            fallback_script(topic, sections)
        }
    }
}

/// OpenAI-compatible synthesis. `Ok(None)` means no API key is configured
/// anywhere — skip, don't error. An explicit empty key means a key-less
/// local endpoint (Ollama / LM Studio) and proceeds without auth.
async fn llm_synthesize(
    state: &AppState,
    topic: &ResearchTopic,
    sections: &ResearchResult,
) -> Result<Option<String>> {
    let cfg = &state.config;
    let api_key = match cfg.resolve_api_key() {
        Some(k) => k,
        None => return Ok(None),
    };
    let base_url = cfg.resolve_base_url();
    let model = cfg.resolve_model();

    let user_prompt = format!(
        "TOPIC: {}\n\nRESEARCH DATA:\n{}\n\n\
         Create an engaging 5-7 minute educational podcast script.\n\n\
         REQUIREMENTS:\n\
         1. Start with a hook that makes the listener curious\n\
         2. Present key findings conversationally\n\
         3. Include specific data points and examples from the research\n\
         4. Address counter-arguments and different perspectives\n\
         5. End with practical takeaways and future implications\n\
         6. Keep language accessible but informative\n\
         7. Target 800-1200 words for audio pacing\n\n\
         Format with clear speaker directions and natural flow.",
        topic,
        pack_research(sections)
    );

    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
    let body = serde_json::json!({
        "model": model,
        "temperature": 0.7,
        "max_tokens": 1500,
        "messages": [
            {"role": "system", "content": SYSTEM_PROMPT},
            {"role": "user", "content": user_prompt}
        ]
    });

    let builder = state.http_client.post(url).json(&body);
    // Only send Authorization when a key is provided; key-less local
    // endpoints work without it.
    let builder = if api_key.is_empty() {
        builder
    } else {
        builder.bearer_auth(api_key.trim())
    };
    let response = builder
        .send()
        .await
        .context("chat.completions request failed")?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        anyhow::bail!("chat.completions failed: status={} body={}", status, text);
    }

    let value: serde_json::Value = response
        .json()
        .await
        .context("chat.completions response parse failed")?;

    let content = value
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    Ok(content)
}

/// Research sections packed for the synthesis prompt.
fn pack_research(sections: &ResearchResult) -> String {
    sections
        .iter()
        .enumerate()
        .map(|(i, s)| format!("RESEARCH AREA {}: {}\n{}\n", i + 1, s.sub_query, s.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Leading sentences of each section, used as the fallback's key points.
fn key_points(sections: &ResearchResult, limit: usize) -> Vec<String> {
    let mut points = Vec::new();
    for section in sections {
        for sentence in section.content.split('.').take(3) {
            let sentence = sentence.trim();
            if !sentence.is_empty() {
                points.push(format!("{}.", sentence));
            }
        }
    }
    points.truncate(limit);
    points
}

/// Deterministic narration used when no LLM is reachable. Same input, same
/// script — demo runs stay reproducible.
pub fn fallback_script(topic: &ResearchTopic, sections: &ResearchResult) -> String {
    let main_points = key_points(sections, 4)
        .into_iter()
        .map(|p| format!("- {p}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "WELCOME TO SYNTHSCHOLAR\nTopic: {topic}\n\n\
         [Intro music fades in]\n\n\
         HOST: \"Welcome to another episode of SynthScholar, where we turn research \
         into conversation. Today we're diving into {topic}.\"\n\n\
         [Music fades out]\n\n\
         HOST: \"If you've ever wondered about the real impact of {topic}, you're in \
         the right place. We've done the reading so you get the key insights in minutes.\"\n\n\
         MAIN CONTENT:\n{main_points}\n\n\
         HOST: \"It's not all upside — researchers point to real challenges that need \
         addressing before this matures.\"\n\n\
         KEY CHALLENGES:\n\
         - Implementation complexity across different contexts\n\
         - The need for proper regulatory frameworks\n\
         - Balancing innovation with ethical considerations\n\n\
         CONCLUSION:\n\
         HOST: \"That's our time on {topic}. The takeaway: the challenges are real, \
         but so is the opportunity for positive impact.\"\n\n\
         [Outro music fades in]\n\n\
         HOST: \"Join us next time on SynthScholar. Until then, stay curious!\"",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ResearchSection;

    fn sections() -> ResearchResult {
        vec![
            ResearchSection {
                sub_query: "q1".to_string(),
                content: "First finding here. Second sentence too. Third one. Fourth ignored."
                    .to_string(),
            },
            ResearchSection {
                sub_query: "q2".to_string(),
                content: "Counterpoint finding.".to_string(),
            },
        ]
    }

    #[test]
    fn fallback_is_deterministic_and_names_the_topic() {
        let topic = ResearchTopic::new("fusion power").unwrap();
        let a = fallback_script(&topic, &sections());
        let b = fallback_script(&topic, &sections());
        assert_eq!(a, b);
        assert!(a.contains("fusion power"));
        assert!(a.contains("First finding here."));
    }

    #[test]
    fn key_points_cap_and_sentence_split() {
        let points = key_points(&sections(), 4);
        assert_eq!(points.len(), 4);
        assert_eq!(points[0], "First finding here.");
        assert_eq!(points[3], "Counterpoint finding.");
    }

    #[test]
    fn packed_research_numbers_each_area() {
        let packed = pack_research(&sections());
        assert!(packed.contains("RESEARCH AREA 1: q1"));
        assert!(packed.contains("RESEARCH AREA 2: q2"));
    }
}
