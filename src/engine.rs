// src/engine.rs
//! Response engine: picks the best pattern for a query and renders its answer.
//!
//! Order per query:
//! 1) normalize the query once
//! 2) score every record: `max(pattern_score, keyword_score * keyword_discount)`
//! 3) keep the first record with the strictly highest score above `threshold`
//! 4) render the template and assemble a [`MatchResult`]
//!
//! The collection lives in an immutable [`PatternSet`] snapshot. Reload builds a
//! new snapshot and swaps the `Arc`; append copies-on-write if a snapshot is shared.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ResponderConfig;
use crate::matcher::{compile_pattern, keyword_score_normalized, score_compiled, MatchRule};
use crate::metrics;
use crate::normalize::normalize;
use crate::render::render;
use crate::store::{clamp01, FileSource, PatternRecord, PatternSource, StaticSource};

// Dev logging gate: RESPONDER_DEV_LOG=1 AND dev env (debug or SHUTTLE_ENV in {local,development,dev})
pub(crate) fn dev_logging_enabled() -> bool {
    std::env::var("RESPONDER_DEV_LOG").ok().as_deref() == Some("1") && is_dev_env()
}

pub(crate) fn is_dev_env() -> bool {
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("SHUTTLE_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

/// Short anonymized id for a query; raw text never reaches the logs.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn dev_log_match(event: &str, query: &str, pattern: Option<&str>, score: f32, threshold: f32) {
    if !dev_logging_enabled() {
        return;
    }
    let id = anon_hash(query);
    info!(target: "responder", %id, %score, %threshold, event, pattern = ?pattern);
}

/* ----------------------------
Pattern snapshot
---------------------------- */

#[derive(Debug, Clone)]
struct Compiled {
    normalized: String,
    wildcard: Option<Regex>,
}

impl Compiled {
    fn for_record(rec: &PatternRecord) -> Self {
        let wildcard = match compile_pattern(&rec.pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(pattern = %rec.pattern, error = %e, "wildcard compile failed; exact and overlap only");
                None
            }
        };
        Self {
            normalized: normalize(&rec.pattern),
            wildcard,
        }
    }
}

/// Ordered records plus their precompiled matchers (same index).
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    records: Vec<PatternRecord>,
    compiled: Vec<Compiled>,
}

impl PatternSet {
    pub fn build(records: Vec<PatternRecord>) -> Self {
        let compiled = records.iter().map(Compiled::for_record).collect();
        Self { records, compiled }
    }

    fn push(&mut self, rec: PatternRecord) {
        self.compiled.push(Compiled::for_record(&rec));
        self.records.push(rec);
    }

    pub fn records(&self) -> &[PatternRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Load a snapshot from `source`; any failure yields an empty set.
fn load_set(source: &dyn PatternSource) -> (PatternSet, bool) {
    match source.load() {
        Ok(records) => {
            let set = PatternSet::build(records);
            info!(source = %source.describe(), patterns = set.len(), "patterns loaded");
            (set, true)
        }
        Err(e) => {
            warn!(source = %source.describe(), error = %e, "pattern load failed; continuing with no patterns");
            (PatternSet::default(), false)
        }
    }
}

/* ----------------------------
Results
---------------------------- */

/// Best record for a query with the score that selected it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMatch {
    pub index: usize,
    pub record: PatternRecord,
    pub match_score: f32,
}

/// What callers render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub answer: String,
    pub confidence: f32,
    pub category: String,
    pub pattern: String,
    pub match_score: f32,
    pub sources: Vec<String>,
    pub is_trained_response: bool,
}

/// Per-record breakdown for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub index: usize,
    pub pattern: String,
    pub category: String,
    pub rule: MatchRule,
    pub pattern_score: f32,
    pub keyword_score: f32,
    pub combined: f32,
    pub selected: bool,
}

/// Options for [`ResponseEngine::add_pattern`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AddPatternOptions {
    /// Author prior, clamped to [0,1]. Default 0.9.
    pub confidence: f32,
    /// Default `"custom"`.
    pub category: String,
    /// Default empty.
    pub keywords: Vec<String>,
}

impl Default for AddPatternOptions {
    fn default() -> Self {
        Self {
            confidence: 0.9,
            category: "custom".to_string(),
            keywords: Vec::new(),
        }
    }
}

/* ----------------------------
Engine
---------------------------- */

pub struct ResponseEngine {
    cfg: ResponderConfig,
    source: Arc<dyn PatternSource>,
    patterns: Arc<PatternSet>,
}

impl std::fmt::Debug for ResponseEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseEngine")
            .field("source", &self.source.describe())
            .field("patterns", &self.patterns.len())
            .field("threshold", &self.cfg.matching.threshold)
            .finish()
    }
}

impl ResponseEngine {
    /// Build and load from `source`. Never fails: a broken source gives an empty engine.
    pub fn new(cfg: ResponderConfig, source: Arc<dyn PatternSource>) -> Self {
        let (set, ok) = load_set(source.as_ref());
        metrics::record_load(ok, set.len());
        Self {
            cfg,
            source,
            patterns: Arc::new(set),
        }
    }

    /// File-backed engine reading `cfg.patterns.path`.
    pub fn from_config(cfg: ResponderConfig) -> Self {
        let source = Arc::new(FileSource::new(cfg.patterns.path.clone()));
        Self::new(cfg, source)
    }

    /// In-memory engine with default configuration.
    pub fn with_records(records: Vec<PatternRecord>) -> Self {
        Self::new(
            ResponderConfig::default(),
            Arc::new(StaticSource::new(records)),
        )
    }

    pub fn config(&self) -> &ResponderConfig {
        &self.cfg
    }

    pub fn source(&self) -> Arc<dyn PatternSource> {
        self.source.clone()
    }

    /// Live collection, stored order.
    pub fn all_patterns(&self) -> &[PatternRecord] {
        self.patterns.records()
    }

    pub fn snapshot(&self) -> Arc<PatternSet> {
        self.patterns.clone()
    }

    /// `(rule, pattern_score, keyword_score, combined)` for record `i`.
    fn score_entry(&self, norm_query: &str, i: usize) -> (MatchRule, f32, f32, f32) {
        let m = &self.cfg.matching;
        let rec = &self.patterns.records[i];
        let c = &self.patterns.compiled[i];
        let sim = score_compiled(norm_query, &c.normalized, c.wildcard.as_ref(), m.wildcard_score);
        let kw = keyword_score_normalized(norm_query, &rec.keywords);
        let combined = clamp01(sim.score.max(kw * m.keyword_discount));
        (sim.rule, sim.score, kw, combined)
    }

    /// Highest-scoring record strictly above the threshold; first one wins ties.
    pub fn find_best_match(&self, query: &str) -> Option<ScoredMatch> {
        let norm_query = normalize(query);
        if norm_query.is_empty() || self.patterns.is_empty() {
            return None;
        }
        let threshold = self.cfg.matching.threshold;

        let mut best: Option<usize> = None;
        let mut best_score = 0.0f32;
        for i in 0..self.patterns.len() {
            let (_, _, _, combined) = self.score_entry(&norm_query, i);
            if combined > best_score && combined > threshold {
                best_score = combined;
                best = Some(i);
            }
        }

        best.map(|index| ScoredMatch {
            index,
            record: self.patterns.records[index].clone(),
            match_score: best_score,
        })
    }

    /// Rendered answer for `query`, or `None` when nothing clears the threshold.
    pub fn get_response(&self, query: &str) -> Option<MatchResult> {
        let threshold = self.cfg.matching.threshold;
        // blank or punctuation-only: nothing left to match on
        if normalize(query).is_empty() {
            metrics::record_query("empty", None);
            return None;
        }

        let Some(hit) = self.find_best_match(query) else {
            metrics::record_query("unmatched", None);
            dev_log_match("unmatched", query, None, 0.0, threshold);
            return None;
        };

        metrics::record_query("matched", Some(hit.match_score));
        dev_log_match(
            "matched",
            query,
            Some(&hit.record.pattern),
            hit.match_score,
            threshold,
        );

        let rec = hit.record;
        Some(MatchResult {
            answer: render(&rec.template, query, &self.cfg.response.timestamp_format),
            confidence: clamp01(rec.confidence * hit.match_score),
            category: rec.category,
            pattern: rec.pattern,
            match_score: hit.match_score,
            sources: self.cfg.response.sources.clone(),
            is_trained_response: true,
        })
    }

    /// Every record's scores for `query`, best first (stored order on ties).
    pub fn explain(&self, query: &str) -> Vec<Candidate> {
        let norm_query = normalize(query);
        if norm_query.is_empty() {
            return Vec::new();
        }
        let selected = self.find_best_match(query).map(|m| m.index);

        let mut out: Vec<Candidate> = (0..self.patterns.len())
            .map(|i| {
                let (rule, pattern_score, keyword_score, combined) =
                    self.score_entry(&norm_query, i);
                let rec = &self.patterns.records[i];
                Candidate {
                    index: i,
                    pattern: rec.pattern.clone(),
                    category: rec.category.clone(),
                    rule,
                    pattern_score,
                    keyword_score,
                    combined,
                    selected: selected == Some(i),
                }
            })
            .collect();

        // stable: equal scores keep stored order
        out.sort_by(|a, b| b.combined.total_cmp(&a.combined));
        out
    }

    /// Append a record. The pattern is uppercased (not fully normalized).
    pub fn add_pattern(
        &mut self,
        pattern: &str,
        template: &str,
        opts: AddPatternOptions,
    ) -> PatternRecord {
        let rec = PatternRecord {
            pattern: pattern.to_uppercase(),
            template: template.to_string(),
            confidence: clamp01(opts.confidence),
            category: opts.category,
            keywords: opts.keywords,
        };
        Arc::make_mut(&mut self.patterns).push(rec.clone());
        metrics::set_patterns_loaded(self.patterns.len());
        info!(pattern = %rec.pattern, category = %rec.category, total = self.patterns.len(), "pattern added");
        rec
    }

    /// Replace the whole collection from the source. Returns the new count.
    pub fn reload_patterns(&mut self) -> usize {
        let (set, ok) = load_set(self.source.as_ref());
        self.install(set, ok)
    }

    /// Swap in a snapshot prepared elsewhere (see [`crate::handle::EngineHandle::reload_patterns`]).
    pub(crate) fn install(&mut self, set: PatternSet, ok: bool) -> usize {
        metrics::record_reload(ok);
        metrics::record_load(ok, set.len());
        self.patterns = Arc::new(set);
        self.patterns.len()
    }
}

/// Prepare a snapshot from `source` without touching any engine.
pub(crate) fn prepare_reload(source: &dyn PatternSource) -> (PatternSet, bool) {
    load_set(source)
}
