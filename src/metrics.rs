// src/metrics.rs
//! Prometheus metrics for the responder.
//!
//! Series:
//! - `responder_queries_total{outcome}`   matched | unmatched | empty
//! - `responder_match_score`              histogram of accepted scores
//! - `responder_patterns_loaded`          gauge, current collection size
//! - `responder_reloads_total{result}`    ok | failed
//! - `responder_load_failures_total`      initial loads and reloads that fell back to empty
//!
//! Without an installed recorder every call is a no-op.

use ::metrics::{counter, gauge, histogram};
use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub fn record_query(outcome: &'static str, score: Option<f32>) {
    counter!("responder_queries_total", "outcome" => outcome).increment(1);
    if let Some(s) = score {
        histogram!("responder_match_score").record(f64::from(s));
    }
}

pub fn set_patterns_loaded(n: usize) {
    gauge!("responder_patterns_loaded").set(n as f64);
}

pub fn record_load(ok: bool, n: usize) {
    if !ok {
        counter!("responder_load_failures_total").increment(1);
    }
    set_patterns_loaded(n);
}

pub fn record_reload(ok: bool) {
    let result = if ok { "ok" } else { "failed" };
    counter!("responder_reloads_total", "result" => result).increment(1);
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
