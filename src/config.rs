// src/config.rs
//! Engine configuration (TOML) with env overrides.
//!
//! ```toml
//! [matching]
//! threshold = 0.6
//! keyword_discount = 0.8
//! wildcard_score = 0.95
//!
//! [patterns]
//! path = "config/patterns.json"
//!
//! [response]
//! sources = ["Trained response library", "Pattern matching engine"]
//! timestamp_format = "%-m/%-d/%Y, %-I:%M:%S %p"
//! ```
//! Every key is optional. A missing file means all defaults.

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::matcher::DEFAULT_WILDCARD_SCORE;
use crate::render::DEFAULT_TIMESTAMP_FORMAT;
use crate::store::DEFAULT_PATTERNS_PATH;

// --- env defaults & names ---
pub const DEFAULT_CONFIG_PATH: &str = "config/responder.toml";
pub const DEFAULT_THRESHOLD: f32 = 0.6;
pub const DEFAULT_KEYWORD_DISCOUNT: f32 = 0.8;

pub const ENV_CONFIG_PATH: &str = "RESPONDER_CONFIG_PATH";
pub const ENV_THRESHOLD: &str = "RESPONDER_THRESHOLD";
pub const ENV_PATTERNS_PATH: &str = "RESPONDER_PATTERNS_PATH";

fn default_threshold() -> f32 {
    DEFAULT_THRESHOLD
}
fn default_keyword_discount() -> f32 {
    DEFAULT_KEYWORD_DISCOUNT
}
fn default_wildcard_score() -> f32 {
    DEFAULT_WILDCARD_SCORE
}
fn default_patterns_path() -> PathBuf {
    PathBuf::from(DEFAULT_PATTERNS_PATH)
}
fn default_sources() -> Vec<String> {
    vec![
        "Trained response library".to_string(),
        "Pattern matching engine".to_string(),
    ]
}
fn default_timestamp_format() -> String {
    DEFAULT_TIMESTAMP_FORMAT.to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponderConfig {
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub patterns: PatternsConfig,
    #[serde(default)]
    pub response: ResponseConfig,
}

/// Scoring knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    /// A candidate must score strictly above this to be accepted.
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    /// Multiplier applied to keyword overlap before it competes with the pattern score.
    #[serde(default = "default_keyword_discount")]
    pub keyword_discount: f32,
    /// Score given to a full wildcard match.
    #[serde(default = "default_wildcard_score")]
    pub wildcard_score: f32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            keyword_discount: DEFAULT_KEYWORD_DISCOUNT,
            wildcard_score: DEFAULT_WILDCARD_SCORE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatternsConfig {
    #[serde(default = "default_patterns_path")]
    pub path: PathBuf,
}

impl Default for PatternsConfig {
    fn default() -> Self {
        Self {
            path: default_patterns_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseConfig {
    /// Static provenance tags copied into every result.
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
    /// strftime format for `{timestamp}`.
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            timestamp_format: default_timestamp_format(),
        }
    }
}

// parse optional float env and clamp to <0.0..=1.0>
fn parse_unit_env(raw: Option<String>) -> Option<f32> {
    raw.and_then(|s| s.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
}

fn sanitize_unit(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

impl ResponderConfig {
    /// Load using RESPONDER_CONFIG_PATH or `config/responder.toml`, then apply env overrides.
    /// A missing file yields defaults; an unreadable or malformed one is an error.
    pub fn from_env() -> anyhow::Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut cfg = if path.exists() {
            Self::load_from_file(&path)?
        } else {
            info!(path = %path.display(), "no responder config file, using defaults");
            Self::default()
        };
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading responder config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing responder config at {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let mut cfg: ResponderConfig = toml::from_str(s)?;
        cfg.sanitize();
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        if let Some(t) = parse_unit_env(std::env::var(ENV_THRESHOLD).ok()) {
            self.matching.threshold = t;
        }
        if let Ok(p) = std::env::var(ENV_PATTERNS_PATH) {
            if !p.trim().is_empty() {
                self.patterns.path = PathBuf::from(p.trim());
            }
        }
    }

    fn sanitize(&mut self) {
        let m = &mut self.matching;
        m.threshold = sanitize_unit(m.threshold, DEFAULT_THRESHOLD);
        m.keyword_discount = sanitize_unit(m.keyword_discount, DEFAULT_KEYWORD_DISCOUNT);
        m.wildcard_score = sanitize_unit(m.wildcard_score, DEFAULT_WILDCARD_SCORE);
        if self.response.timestamp_format.trim().is_empty() {
            self.response.timestamp_format = default_timestamp_format();
        }
    }
}
