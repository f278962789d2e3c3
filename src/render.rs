// src/render.rs
//! Answer template rendering.
//!
//! Recognized placeholders are `{timestamp}` and `{query}`. Only the FIRST
//! occurrence of each is substituted; later copies and unknown `{...}` tokens
//! are left as-is.

use chrono::{DateTime, Local, TimeZone};

pub const TIMESTAMP_TOKEN: &str = "{timestamp}";
pub const QUERY_TOKEN: &str = "{query}";

/// en-US style local date-time, e.g. `10/19/2026, 7:05:00 AM`.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Render `template` for `query` using the current local time.
pub fn render(template: &str, query: &str, timestamp_format: &str) -> String {
    render_at(template, query, &Local::now(), timestamp_format)
}

/// Render with an explicit clock value.
pub fn render_at<Tz>(
    template: &str,
    query: &str,
    now: &DateTime<Tz>,
    timestamp_format: &str,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut out = template.to_string();
    if out.contains(TIMESTAMP_TOKEN) {
        out = out.replacen(TIMESTAMP_TOKEN, &format_stamp(now, timestamp_format), 1);
    }
    if out.contains(QUERY_TOKEN) {
        out = out.replacen(QUERY_TOKEN, query, 1);
    }
    out
}

// An invalid strftime string makes chrono's Display fail; fall back to the default.
fn format_stamp<Tz>(now: &DateTime<Tz>, timestamp_format: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    use std::fmt::Write as _;
    let mut stamp = String::new();
    if write!(&mut stamp, "{}", now.format(timestamp_format)).is_ok() {
        return stamp;
    }
    now.format(DEFAULT_TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn fixed() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 15, 7, 9).unwrap()
    }

    #[test]
    fn substitutes_query_and_timestamp() {
        let out = render_at(
            "Hello {query}, time {timestamp}",
            "hi",
            &fixed(),
            DEFAULT_TIMESTAMP_FORMAT,
        );
        assert_eq!(out, "Hello hi, time 3/4/2026, 3:07:09 PM");
    }

    #[test]
    fn only_first_occurrence_is_replaced() {
        let out = render_at("{query} and {query}", "x", &fixed(), DEFAULT_TIMESTAMP_FORMAT);
        assert_eq!(out, "x and {query}");
    }

    #[test]
    fn unknown_placeholders_pass_through() {
        let out = render_at("Dear {name}", "q", &fixed(), DEFAULT_TIMESTAMP_FORMAT);
        assert_eq!(out, "Dear {name}");
    }

    #[test]
    fn query_text_is_inserted_raw() {
        // no normalization and no second pass over inserted text
        let out = render_at("You asked: {query}", "What's {timestamp}?", &fixed(), "%Y");
        assert_eq!(out, "You asked: What's {timestamp}?");
    }

    #[test]
    fn bad_format_falls_back_to_default() {
        let out = render_at("{timestamp}", "q", &fixed(), "%Q%");
        assert_eq!(out, "3/4/2026, 3:07:09 PM");
    }

    #[test]
    fn live_clock_renders_non_empty_stamp() {
        let out = render("at {timestamp}", "q", DEFAULT_TIMESTAMP_FORMAT);
        assert!(out.starts_with("at "));
        assert!(out.len() > "at ".len());
        assert!(!out.contains(TIMESTAMP_TOKEN));
    }
}
