// src/normalize.rs
//! Text normalization shared by queries, patterns and keywords.
//!
//! Both sides of every comparison go through [`normalize`], so case and
//! punctuation never influence matching. The wildcard marker `*` survives.

/// Uppercase, replace anything that is not a letter, digit, whitespace or `*`
/// with a space, then collapse whitespace runs and trim.
pub fn normalize(text: &str) -> String {
    let upper = text.to_uppercase();
    let mut out = String::with_capacity(upper.len());
    let mut pending_space = false;

    for ch in upper.chars() {
        let keep = ch.is_alphanumeric() || ch == '*';
        if keep {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        } else {
            // whitespace and punctuation both act as separators
            pending_space = true;
        }
    }
    out
}

/// Whitespace-delimited tokens of an already normalized string.
pub fn tokens(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}

/// Tokens of a normalized pattern with wildcard markers removed.
pub fn pattern_tokens(normalized_pattern: &str) -> Vec<String> {
    normalized_pattern
        .replace('*', "")
        .split_whitespace()
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
