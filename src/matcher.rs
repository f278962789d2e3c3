// src/matcher.rs
//! Matching primitives: wildcard compilation, pattern similarity and keyword overlap.
//!
//! Similarity is a strict three-tier cascade (first rule that applies wins):
//! exact normalized equality, full wildcard match, then token overlap.

use regex::Regex;
use serde::Serialize;

use crate::normalize::{normalize, pattern_tokens, tokens};

pub const EXACT_SCORE: f32 = 1.0;
pub const DEFAULT_WILDCARD_SCORE: f32 = 0.95;

/// Which tier of the cascade produced a similarity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    Exact,
    Wildcard,
    Overlap,
}

/// Similarity of one query against one pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity {
    pub score: f32,
    pub rule: MatchRule,
}

/// Compile a pattern into an anchored, case-insensitive regex.
/// `*` becomes a lazy "any words" run and whitespace becomes `\s+`.
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let norm = normalize(pattern);
    let mut src = String::with_capacity(norm.len() * 2 + 8);
    src.push_str("(?i)^");
    let mut buf = [0u8; 4];
    for ch in norm.chars() {
        match ch {
            '*' => src.push_str(".*?"),
            ' ' => src.push_str(r"\s+"),
            c => src.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
    }
    src.push('$');
    Regex::new(&src)
}

/// Score `query` against `pattern`, compiling the wildcard regex on the fly.
/// Prefer [`score_compiled`] when the pattern is scored repeatedly.
pub fn score(query: &str, pattern: &str) -> f32 {
    let q = normalize(query);
    let p = normalize(pattern);
    let re = compile_pattern(pattern).ok();
    score_compiled(&q, &p, re.as_ref(), DEFAULT_WILDCARD_SCORE).score
}

/// Score an already normalized query against an already normalized pattern.
/// `wildcard` is the pattern's precompiled regex, if it compiled.
pub fn score_compiled(
    q: &str,
    p: &str,
    wildcard: Option<&Regex>,
    wildcard_score: f32,
) -> Similarity {
    if q == p {
        return Similarity {
            score: EXACT_SCORE,
            rule: MatchRule::Exact,
        };
    }

    if let Some(re) = wildcard {
        if re.is_match(q) {
            return Similarity {
                score: wildcard_score.clamp(0.0, 1.0),
                rule: MatchRule::Wildcard,
            };
        }
    }

    Similarity {
        score: token_overlap(q, p),
        rule: MatchRule::Overlap,
    }
}

/// Fraction of pattern tokens that contain, or are contained in, some query token.
fn token_overlap(norm_query: &str, norm_pattern: &str) -> f32 {
    let query_words = tokens(norm_query);
    let pattern_words = pattern_tokens(norm_pattern);
    if pattern_words.is_empty() {
        return 0.0;
    }

    let matched = pattern_words
        .iter()
        .filter(|pw| {
            query_words
                .iter()
                .any(|qw| pw.contains(qw) || qw.contains(pw.as_str()))
        })
        .count();

    matched as f32 / pattern_words.len() as f32
}

/// Fraction of keywords whose normalized form occurs inside the normalized query.
pub fn keyword_score(query: &str, keywords: &[String]) -> f32 {
    keyword_score_normalized(&normalize(query), keywords)
}

pub(crate) fn keyword_score_normalized(norm_query: &str, keywords: &[String]) -> f32 {
    if keywords.is_empty() {
        return 0.0;
    }
    let hits = keywords
        .iter()
        .filter(|k| norm_query.contains(normalize(k).as_str()))
        .count();
    hits as f32 / keywords.len() as f32
}
