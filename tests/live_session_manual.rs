//! Manual live-session checks. These launch a real browser and talk to the
//! real site, so they are ignored by default.
//!
//! Run with: cargo test --test live_session_manual -- --ignored --nocapture

use synthscholar::config::AppConfig;
use synthscholar::research::{LiveResearcher, ResearchProvider};
use synthscholar::types::ResearchTopic;

fn init_logger() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
}

fn live_config() -> AppConfig {
    AppConfig {
        demo_mode: Some(false),
        headless: Some(true),
        ..Default::default()
    }
}

#[tokio::test]
#[ignore] // requires an installed browser and network access
async fn live_session_starts_and_closes_cleanly() {
    init_logger();
    let mut researcher = LiveResearcher::new(&live_config());

    let started = researcher.initialize().await.unwrap();
    println!("browser started: {}", started);
    if !started {
        println!("no browser available on this machine — nothing to check");
        return;
    }

    researcher.close().await;
    researcher.close().await;
}

#[tokio::test]
#[ignore] // slow: runs the full five-query research loop against the live site
async fn live_research_gathers_at_least_one_section() {
    init_logger();
    let mut researcher = LiveResearcher::new(&live_config());

    if !researcher.initialize().await.unwrap() {
        println!("no browser available on this machine — nothing to check");
        return;
    }
    let _ = researcher.authenticate("demo@example.com").await;

    let topic = ResearchTopic::new("rust programming language").unwrap();
    let outcome = researcher.research(&topic).await;
    researcher.close().await;

    match outcome {
        Ok(sections) => {
            println!("gathered {} sections", sections.len());
            for s in &sections {
                println!("- {} ({} chars)", s.sub_query, s.content.len());
            }
            assert!(!sections.is_empty());
        }
        Err(e) => {
            // Selector drift or anti-bot interference is expected from time
            // to time; surface it without failing the manual run.
            println!("live research failed: {e}");
        }
    }
}
