//! End-to-end pipeline tests over the mock research backend: provider
//! substitution, section aggregation, narration fallback, and speech cleanup.

use synthscholar::config::AppConfig;
use synthscholar::research::{make_provider, MockResearcher, ResearchProvider};
use synthscholar::synth::{audio, script};
use synthscholar::types::{ResearchError, ResearchTopic};

fn init_logger() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
}

fn demo_config() -> AppConfig {
    AppConfig {
        demo_mode: Some(true),
        ..Default::default()
    }
}

#[tokio::test]
async fn demo_config_selects_a_working_provider() {
    init_logger();
    let mut provider = make_provider(&demo_config());

    assert!(provider.initialize().await.unwrap());
    assert!(provider.authenticate("demo@example.com").await.unwrap());

    let topic = ResearchTopic::new("Artificial Intelligence Trends").unwrap();
    let sections = provider.research(&topic).await.unwrap();
    assert_eq!(sections.len(), 2);
    assert!(sections[0].content.len() > 50);

    provider.close().await;
    // A second close must be a no-op.
    provider.close().await;
}

#[tokio::test]
async fn callers_cannot_get_an_empty_success_from_the_mock() {
    init_logger();
    let mut provider: Box<dyn ResearchProvider> = Box::new(MockResearcher::new());

    for raw in ["climate change policy", "quantum computing", "basket weaving"] {
        let topic = ResearchTopic::new(raw).unwrap();
        let sections = provider.research(&topic).await.unwrap();
        assert!(!sections.is_empty(), "empty result for topic: {raw}");
    }
}

#[tokio::test]
async fn narration_pipeline_produces_speakable_text() {
    init_logger();
    let mut provider = make_provider(&demo_config());
    let topic = ResearchTopic::new("underwater basket weaving").unwrap();

    let sections = provider.research(&topic).await.unwrap();
    let narration = script::fallback_script(&topic, &sections);
    assert!(narration.contains("underwater basket weaving"));

    let speech = audio::clean_for_speech(&narration);
    assert!(!speech.is_empty());
    // Stage directions and markdown never reach the TTS step.
    assert!(!speech.contains('['));
    assert!(!speech.contains('*'));
}

#[test]
fn short_topics_are_rejected_before_any_research() {
    match ResearchTopic::new("ai") {
        Err(ResearchError::InvalidTopic(raw)) => assert_eq!(raw, "ai"),
        other => panic!("expected InvalidTopic, got {other:?}"),
    }
}
