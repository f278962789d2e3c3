// src/handle.rs
//! Thread-safe engine handle and optional file hot reload.
//!
//! Readers (`get_response`, `find_best_match`, `explain`, `all_patterns`) take
//! the read lock. Writers (`add_pattern`, `reload_patterns`) take the write lock.
//! Reload reads the source outside the lock and only swaps the prepared
//! snapshot under it, so readers never see a half-replaced collection.
//! Reloads are serialized among themselves so a slow load can never overwrite
//! the result of a later one.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread;
use std::time::{Duration, SystemTime};
use tracing::{error, info};

use crate::engine::{
    is_dev_env, prepare_reload, AddPatternOptions, Candidate, MatchResult, ResponseEngine,
    ScoredMatch,
};
use crate::store::PatternRecord;

pub const ENV_HOT_RELOAD: &str = "RESPONDER_HOT_RELOAD";
const HOT_RELOAD_POLL: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct EngineHandle {
    inner: Arc<RwLock<ResponseEngine>>,
    // held for the whole load-and-swap; readers never touch it
    reload_gate: Arc<Mutex<()>>,
}

impl EngineHandle {
    pub fn new(engine: ResponseEngine) -> Self {
        Self {
            inner: Arc::new(RwLock::new(engine)),
            reload_gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn get_response(&self, query: &str) -> Option<MatchResult> {
        match self.inner.read() {
            Ok(eng) => eng.get_response(query),
            Err(_) => {
                error!("engine lock poisoned; answering with no match");
                None
            }
        }
    }

    pub fn find_best_match(&self, query: &str) -> Option<ScoredMatch> {
        self.inner.read().ok()?.find_best_match(query)
    }

    pub fn explain(&self, query: &str) -> Vec<Candidate> {
        self.inner
            .read()
            .map(|eng| eng.explain(query))
            .unwrap_or_default()
    }

    /// Owned copy of the current collection.
    pub fn all_patterns(&self) -> Vec<PatternRecord> {
        self.inner
            .read()
            .map(|eng| eng.all_patterns().to_vec())
            .unwrap_or_default()
    }

    pub fn pattern_count(&self) -> usize {
        self.inner
            .read()
            .map(|eng| eng.all_patterns().len())
            .unwrap_or(0)
    }

    pub fn add_pattern(
        &self,
        pattern: &str,
        template: &str,
        opts: AddPatternOptions,
    ) -> Option<PatternRecord> {
        match self.inner.write() {
            Ok(mut eng) => Some(eng.add_pattern(pattern, template, opts)),
            Err(_) => {
                error!("engine lock poisoned; pattern not added");
                None
            }
        }
    }

    /// Reload from the engine's source. Returns the new count, or `None` on a poisoned lock.
    pub fn reload_patterns(&self) -> Option<usize> {
        // the gate guards no data, so a poisoned one is still usable
        let _gate = self
            .reload_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let source = self.inner.read().ok()?.source();
        let (set, ok) = prepare_reload(source.as_ref());
        match self.inner.write() {
            Ok(mut eng) => Some(eng.install(set, ok)),
            Err(_) => {
                error!("engine lock poisoned; reload dropped");
                None
            }
        }
    }
}

#[cfg(test)]
impl EngineHandle {
    /// Poison the engine lock by panicking while holding it.
    pub(crate) fn poison(&self) {
        let inner = self.inner.clone();
        let _ = thread::spawn(move || {
            let _guard = inner.write().unwrap();
            panic!("writer died holding the engine lock");
        })
        .join();
    }
}

/// Returns true if we should enable hot reload (dev/local only).
fn hot_reload_enabled() -> bool {
    std::env::var(ENV_HOT_RELOAD).ok().as_deref() == Some("1") && is_dev_env()
}

/// Start a simple polling watcher on `path` that reloads `handle` when the mtime moves.
/// Polls every 2s on a plain std thread.
pub fn start_hot_reload_thread(handle: EngineHandle, path: PathBuf) {
    if !hot_reload_enabled() {
        return;
    }
    info!(path = %path.display(), "pattern hot reload enabled");
    spawn_watcher(handle, path, HOT_RELOAD_POLL);
}

fn file_mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn spawn_watcher(handle: EngineHandle, path: PathBuf, poll: Duration) {
    // baseline taken before the first sleep; a file absent here counts as changed once it appears
    let mut last_mtime = file_mtime(&path);

    thread::spawn(move || loop {
        thread::sleep(poll);
        let current = file_mtime(&path);
        let changed = match (last_mtime, current) {
            (None, Some(_)) => true,
            (Some(prev), Some(now)) => now != prev,
            // missing or unreadable file: keep trying
            (_, None) => false,
        };
        if current.is_some() {
            last_mtime = current;
        }
        if changed {
            if let Some(n) = handle.reload_patterns() {
                info!(patterns = n, "patterns hot-reloaded");
            }
        }
    });
}
