// tests/engine_lifecycle.rs
// Loading, reloading and appending against real files on disk.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use template_matcher::{
    AddPatternOptions, EngineHandle, FileSource, ResponderConfig, ResponseEngine,
};

const ONLY_A: &str = r#"{ "categories": [
    { "pattern": "PATTERN A", "template": "answer a", "confidence": 0.9,
      "category": "a", "keywords": [] }
] }"#;

fn engine_for(path: &Path) -> ResponseEngine {
    ResponseEngine::new(ResponderConfig::default(), Arc::new(FileSource::new(path)))
}

#[test]
fn loads_json_file_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("patterns.json");
    fs::write(
        &p,
        r#"{ "categories": [
            { "pattern": "FIRST", "template": "1", "confidence": 0.5, "category": "x", "keywords": [] },
            { "pattern": "SECOND", "template": "2", "confidence": 0.6, "category": "y", "keywords": ["two"] }
        ] }"#,
    )
    .unwrap();

    let e = engine_for(&p);
    let all = e.all_patterns();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].pattern, "FIRST");
    assert_eq!(all[1].keywords, vec!["two"]);
    assert_eq!(e.get_response("second").unwrap().answer, "2");
}

#[test]
fn loads_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("patterns.toml");
    fs::write(
        &p,
        r#"
[[categories]]
pattern = "WHERE IS THE * OFFICE"
template = "See the contact page."
confidence = 0.85
category = "locations"
keywords = ["office"]
"#,
    )
    .unwrap();

    let e = engine_for(&p);
    let r = e.get_response("Where is the tax office?").unwrap();
    assert_eq!(r.match_score, 0.95);
    assert_eq!(r.category, "locations");
}

#[test]
fn missing_source_gives_empty_engine_until_reload() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("later.json");

    let mut e = engine_for(&p);
    assert!(e.all_patterns().is_empty());
    assert!(e.get_response("pattern a").is_none());

    fs::write(&p, ONLY_A).unwrap();
    assert_eq!(e.reload_patterns(), 1);
    assert_eq!(e.get_response("pattern a").unwrap().answer, "answer a");
}

#[test]
fn malformed_source_gives_empty_engine() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("broken.json");
    fs::write(&p, "{ this is not json").unwrap();
    let e = engine_for(&p);
    assert!(e.all_patterns().is_empty());
    assert!(e.get_response("anything at all").is_none());
}

#[test]
fn reload_failure_empties_the_collection() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("patterns.json");
    fs::write(&p, ONLY_A).unwrap();
    let mut e = engine_for(&p);
    assert_eq!(e.all_patterns().len(), 1);

    fs::remove_file(&p).unwrap();
    assert_eq!(e.reload_patterns(), 0);
    assert!(e.get_response("pattern a").is_none());
}

#[test]
fn bad_entries_do_not_sink_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("patterns.json");
    fs::write(
        &p,
        r#"{ "categories": [
            { "template": "orphan" },
            { "pattern": "GOOD ONE", "template": "ok" }
        ] }"#,
    )
    .unwrap();
    let e = engine_for(&p);
    assert_eq!(e.all_patterns().len(), 1);
    assert!(e.get_response("good one").is_some());
}

#[test]
fn reload_replaces_rather_than_merges() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("patterns.json");
    fs::write(&p, ONLY_A).unwrap();

    let mut e = engine_for(&p);
    e.add_pattern("PATTERN B", "answer b", AddPatternOptions::default());
    assert_eq!(e.get_response("pattern b").unwrap().pattern, "PATTERN B");

    e.reload_patterns();
    assert!(e.get_response("pattern b").is_none());
    assert_eq!(e.get_response("pattern a").unwrap().pattern, "PATTERN A");
    assert_eq!(e.all_patterns().len(), 1);
}

#[test]
fn added_pattern_is_not_written_back() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("patterns.json");
    fs::write(&p, ONLY_A).unwrap();

    let h = EngineHandle::new(engine_for(&p));
    h.add_pattern("new one", "n", AddPatternOptions::default());
    assert_eq!(fs::read_to_string(&p).unwrap(), ONLY_A);
    assert_eq!(h.reload_patterns(), Some(1));
}

#[test]
fn config_threshold_is_honored() {
    let strict = ResponderConfig::from_toml_str(
        r#"
[matching]
threshold = 0.97
"#,
    )
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("patterns.json");
    fs::write(
        &p,
        r#"{ "categories": [ { "pattern": "HOW DO I *", "template": "t" } ] }"#,
    )
    .unwrap();

    let e = ResponseEngine::new(strict, Arc::new(FileSource::new(&p)));
    // wildcard 0.95 no longer clears the bar
    assert!(e.get_response("how do i start").is_none());
    assert!(e.get_response("how do i *").is_some());
}

#[test]
fn custom_sources_and_wildcard_score_flow_into_results() {
    let mut cfg = ResponderConfig::from_toml_str(
        r#"
[matching]
wildcard_score = 0.7

[response]
sources = ["FAQ v2"]
"#,
    )
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("patterns.json");
    fs::write(
        &p,
        r#"{ "categories": [ { "pattern": "TELL ME ABOUT *", "template": "t", "confidence": 1.0 } ] }"#,
    )
    .unwrap();
    cfg.patterns.path = p;

    let e = ResponseEngine::from_config(cfg);
    let r = e.get_response("tell me about housing").unwrap();
    assert!((r.match_score - 0.7).abs() < 1e-6);
    assert_eq!(r.sources, vec!["FAQ v2"]);
}
