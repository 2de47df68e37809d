//! Audio rendering — narration text to an MP3 artifact in the temp directory.
//!
//! Uses the public Google Translate TTS endpoint, which only accepts short
//! inputs: the cleaned narration is chunked at word boundaries and the MP3
//! frames are concatenated. Artifacts are uuid-named and served by the
//! download endpoint; the OS owns temp-dir cleanup.

use anyhow::{Context, Result};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::info;

use crate::core::AppState;
use crate::research::browser;

const TTS_ENDPOINT: &str = "https://translate.google.com/translate_tts";

/// Max characters per TTS request; the endpoint truncates past ~200.
const MAX_CHUNK_CHARS: usize = 180;

fn markup_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[*#`]").expect("valid markup pattern"))
}

fn stage_direction_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[[^\]]*\]").expect("valid stage-direction pattern"))
}

fn area_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"RESEARCH AREA \d+:").expect("valid area-label pattern"))
}

fn blank_runs_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n+").expect("valid blank-run pattern"))
}

fn sentence_gap_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.(\w)").expect("valid sentence-gap pattern"))
}

/// Strip markup and stage directions that read badly as speech.
pub fn clean_for_speech(text: &str) -> String {
    let text = markup_re().replace_all(text, "");
    let text = stage_direction_re().replace_all(&text, "");
    let text = area_label_re().replace_all(&text, "");
    let text = blank_runs_re().replace_all(&text, "\n");
    let text = sentence_gap_re().replace_all(&text, ". $1");
    text.trim().to_string()
}

/// Split on word boundaries into chunks the TTS endpoint will accept whole.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > max_chars {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Render the narration to an MP3 under the temp directory and return its path.
pub async fn render_narration(state: &AppState, script: &str) -> Result<PathBuf> {
    let clean = clean_for_speech(script);
    if clean.is_empty() {
        anyhow::bail!("narration is empty after cleaning");
    }

    let id = uuid::Uuid::new_v4().simple().to_string();
    let filename = format!("synthscholar_{}.mp3", &id[..8]);
    let path = std::env::temp_dir().join(&filename);

    info!(
        "🔊 Rendering narration audio ({} chars)",
        clean.chars().count()
    );

    let mut bytes: Vec<u8> = Vec::new();
    for chunk in chunk_text(&clean, MAX_CHUNK_CHARS) {
        let url = format!(
            "{}?ie=UTF-8&client=tw-ob&tl=en&q={}",
            TTS_ENDPOINT,
            utf8_percent_encode(&chunk, NON_ALPHANUMERIC)
        );
        let response = state
            .http_client
            .get(&url)
            .header(reqwest::header::USER_AGENT, browser::random_user_agent())
            .send()
            .await
            .context("tts request failed")?
            .error_for_status()
            .context("tts request rejected")?;
        bytes.extend_from_slice(&response.bytes().await.context("tts body read failed")?);
    }

    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("writing audio artifact {}", path.display()))?;

    info!("✅ Audio artifact written: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleaning_strips_markup_and_stage_directions() {
        let raw = "HOST: \"Welcome!\"\n\n[Intro music fades in]\n\n**Key** point #1.`code`";
        let clean = clean_for_speech(raw);
        assert!(!clean.contains('['));
        assert!(!clean.contains('*'));
        assert!(!clean.contains('#'));
        assert!(!clean.contains('`'));
        assert!(clean.contains("Welcome!"));
    }

    #[test]
    fn cleaning_drops_area_labels_and_spaces_sentences() {
        let raw = "RESEARCH AREA 1: overview.Next sentence";
        let clean = clean_for_speech(raw);
        assert!(!clean.contains("RESEARCH AREA"));
        assert!(clean.contains("overview. Next sentence"));
    }

    #[test]
    fn chunks_respect_word_boundaries_and_limit() {
        let text = "alpha beta gamma delta epsilon";
        let chunks = chunk_text(text, 12);
        assert!(chunks.iter().all(|c| c.chars().count() <= 12));
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn single_word_longer_than_limit_is_kept_whole() {
        let chunks = chunk_text("supercalifragilistic", 5);
        assert_eq!(chunks, vec!["supercalifragilistic".to_string()]);
    }
}
