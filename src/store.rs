// src/store.rs
//! Pattern records and the sources they are loaded from.
//!
//! Reference file shape (JSON):
//! ```json
//! { "categories": [
//!     { "pattern": "HOW DO I *", "template": "...", "confidence": 0.9,
//!       "category": "howto", "keywords": ["apply"] }
//! ] }
//! ```
//! The same layout is accepted as TOML using `[[categories]]` tables.
//! Entries missing `pattern`/`template` (or with wrong types) are skipped
//! with a warning; the rest of the file still loads.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_PATTERNS_PATH: &str = "config/patterns.json";

fn default_record_confidence() -> f32 {
    0.9
}
fn default_record_category() -> String {
    "general".to_string()
}

/// One author-written pattern and its canned answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRecord {
    pub pattern: String,
    pub template: String,
    #[serde(default = "default_record_confidence")]
    pub confidence: f32,
    #[serde(default = "default_record_category")]
    pub category: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl PatternRecord {
    /// Keep `confidence` inside [0,1]; NaN becomes 0.
    pub fn sanitized(mut self) -> Self {
        self.confidence = clamp01(self.confidence);
        self
    }
}

pub(crate) fn clamp01(x: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("reading patterns from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON pattern file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed TOML pattern file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("pattern file has no `categories` array")]
    MissingCategories,
}

/// Where the engine's pattern collection comes from.
pub trait PatternSource: Send + Sync {
    /// Load every record, in stored order.
    fn load(&self) -> Result<Vec<PatternRecord>, SourceError>;

    /// Short human-readable origin, used in logs.
    fn describe(&self) -> String;
}

/// JSON or TOML file on disk; format chosen by extension (`.toml` → TOML).
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_toml(&self) -> bool {
        self.path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"))
    }
}

impl PatternSource for FileSource {
    fn load(&self) -> Result<Vec<PatternRecord>, SourceError> {
        let content = fs::read_to_string(&self.path).map_err(|e| SourceError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        if self.is_toml() {
            parse_toml(&content)
        } else {
            parse_json(&content)
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Fixed in-memory records.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    records: Vec<PatternRecord>,
}

impl StaticSource {
    pub fn new(records: Vec<PatternRecord>) -> Self {
        Self { records }
    }
}

impl PatternSource for StaticSource {
    fn load(&self) -> Result<Vec<PatternRecord>, SourceError> {
        Ok(self
            .records
            .iter()
            .cloned()
            .map(PatternRecord::sanitized)
            .collect())
    }

    fn describe(&self) -> String {
        format!("static ({} records)", self.records.len())
    }
}

/// Parse the `{ "categories": [...] }` JSON shape.
pub fn parse_json(s: &str) -> Result<Vec<PatternRecord>, SourceError> {
    let root: serde_json::Value = serde_json::from_str(s)?;
    let entries = root
        .get("categories")
        .and_then(|v| v.as_array())
        .ok_or(SourceError::MissingCategories)?;

    Ok(collect_valid(entries.iter().enumerate().map(|(i, v)| {
        (i, serde_json::from_value::<PatternRecord>(v.clone()).map_err(|e| e.to_string()))
    })))
}

/// Parse the `[[categories]]` TOML shape.
pub fn parse_toml(s: &str) -> Result<Vec<PatternRecord>, SourceError> {
    let root: toml::Table = toml::from_str(s)?;
    let entries = root
        .get("categories")
        .and_then(|v| v.as_array())
        .ok_or(SourceError::MissingCategories)?;

    Ok(collect_valid(entries.iter().enumerate().map(|(i, v)| {
        (i, v.clone().try_into::<PatternRecord>().map_err(|e| e.to_string()))
    })))
}

fn collect_valid<I>(entries: I) -> Vec<PatternRecord>
where
    I: Iterator<Item = (usize, Result<PatternRecord, String>)>,
{
    entries
        .filter_map(|(i, parsed)| match parsed {
            Ok(rec) => Some(rec.sanitized()),
            Err(e) => {
                warn!(index = i, error = %e, "skipping malformed pattern entry");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_shape_loads_in_order() {
        let recs = parse_json(
            r#"{ "categories": [
                { "pattern": "HELLO", "template": "Hi!", "confidence": 0.8,
                  "category": "greeting", "keywords": ["hello", "hi"] },
                { "pattern": "HOW DO I *", "template": "Steps...", "confidence": 0.9,
                  "category": "howto", "keywords": [] }
            ] }"#,
        )
        .unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].pattern, "HELLO");
        assert_eq!(recs[0].keywords, vec!["hello", "hi"]);
        assert_eq!(recs[1].category, "howto");
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let recs = parse_json(
            r#"{ "categories": [
                { "template": "no pattern here" },
                { "pattern": 42, "template": "wrong type" },
                { "pattern": "OK", "template": "fine" }
            ] }"#,
        )
        .unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].pattern, "OK");
        assert_eq!(recs[0].confidence, 0.9);
        assert_eq!(recs[0].category, "general");
    }

    #[test]
    fn confidence_is_clamped() {
        let recs = parse_json(
            r#"{ "categories": [
                { "pattern": "A", "template": "a", "confidence": 1.7 },
                { "pattern": "B", "template": "b", "confidence": -0.2 }
            ] }"#,
        )
        .unwrap();
        assert_eq!(recs[0].confidence, 1.0);
        assert_eq!(recs[1].confidence, 0.0);
    }

    #[test]
    fn missing_wrapper_is_an_error() {
        let err = parse_json(r#"[{"pattern":"A","template":"a"}]"#).unwrap_err();
        assert!(matches!(err, SourceError::MissingCategories));
        assert!(matches!(parse_json("{ nope"), Err(SourceError::Json(_))));
    }

    #[test]
    fn toml_shape_loads() {
        let recs = parse_toml(
            r#"
[[categories]]
pattern = "WHAT IS *"
template = "It is..."
confidence = 0.85
category = "definition"
keywords = ["what"]

[[categories]]
template = "broken"
"#,
        )
        .unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].pattern, "WHAT IS *");
        assert!((recs[0].confidence - 0.85).abs() < 1e-6);
    }

    #[test]
    fn static_records_are_clamped_on_load() {
        let rec = |confidence| PatternRecord {
            pattern: "A".into(),
            template: "a".into(),
            confidence,
            category: "general".into(),
            keywords: vec![],
        };
        let src = StaticSource::new(vec![rec(1.7), rec(-3.0), rec(f32::NAN), rec(0.4)]);
        let got: Vec<f32> = src.load().unwrap().iter().map(|r| r.confidence).collect();
        assert_eq!(got, vec![1.0, 0.0, 0.0, 0.4]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let src = FileSource::new("definitely/not/here.json");
        assert!(matches!(src.load(), Err(SourceError::Io { .. })));
    }
}
