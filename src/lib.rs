pub mod core;
pub mod research;
pub mod synth;

// --- Primary core exports ---
pub use core::config;
pub use core::types;
pub use core::types::*;
pub use core::AppState;

pub use research::{mock, orchestrator, session, ResearchProvider};
pub use synth::{audio, script};
