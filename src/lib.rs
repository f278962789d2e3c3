// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod engine;
pub mod handle;
pub mod matcher;
pub mod metrics;
pub mod normalize;
pub mod render;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::ResponderConfig;
pub use crate::engine::{AddPatternOptions, Candidate, MatchResult, ResponseEngine, ScoredMatch};
pub use crate::handle::{start_hot_reload_thread, EngineHandle};
pub use crate::matcher::{compile_pattern, keyword_score, score, MatchRule};
pub use crate::normalize::normalize;
pub use crate::render::render;
pub use crate::store::{FileSource, PatternRecord, PatternSource, SourceError, StaticSource};

/// Build the full application router from configuration: engine, handle, API and
/// (when a recorder is supplied) `/metrics`.
pub fn app(
    cfg: ResponderConfig,
    recorder: Option<&crate::metrics::Metrics>,
) -> (axum::Router, EngineHandle) {
    let engine = ResponseEngine::from_config(cfg);
    let handle = EngineHandle::new(engine);
    let mut router = api::router(AppState {
        engine: handle.clone(),
    });
    if let Some(m) = recorder {
        router = router.merge(m.router());
    }
    (router, handle)
}
