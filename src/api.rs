// src/api.rs
//! HTTP surface: ask, pattern management, reload, diagnostics.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::cors::CorsLayer;

use crate::engine::{AddPatternOptions, Candidate, MatchResult};
use crate::handle::EngineHandle;
use crate::store::PatternRecord;

const DEFAULT_EXPLAIN_LIMIT: usize = 10;

#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/ask", post(ask))
        .route("/patterns", get(list_patterns).post(add_pattern))
        .route("/admin/reload", post(admin_reload))
        .route("/debug/explain", get(debug_explain))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("`{0}` must not be blank")]
    Blank(&'static str),

    #[error("engine unavailable")]
    Unavailable,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Blank(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

#[derive(Deserialize)]
struct AskReq {
    query: String,
}

/// `null` when nothing matched; that is a normal outcome.
async fn ask(State(state): State<AppState>, Json(body): Json<AskReq>) -> Json<Option<MatchResult>> {
    Json(state.engine.get_response(&body.query))
}

async fn list_patterns(State(state): State<AppState>) -> Json<Vec<PatternRecord>> {
    Json(state.engine.all_patterns())
}

#[derive(Deserialize)]
struct AddPatternReq {
    pattern: String,
    template: String,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    keywords: Option<Vec<String>>,
}

impl AddPatternReq {
    fn options(&mut self) -> AddPatternOptions {
        let mut opts = AddPatternOptions::default();
        if let Some(c) = self.confidence {
            opts.confidence = c;
        }
        if let Some(c) = self.category.take() {
            opts.category = c;
        }
        if let Some(k) = self.keywords.take() {
            opts.keywords = k;
        }
        opts
    }
}

async fn add_pattern(
    State(state): State<AppState>,
    Json(mut body): Json<AddPatternReq>,
) -> Result<(StatusCode, Json<PatternRecord>), ApiError> {
    if body.pattern.trim().is_empty() {
        return Err(ApiError::Blank("pattern"));
    }
    if body.template.trim().is_empty() {
        return Err(ApiError::Blank("template"));
    }
    let opts = body.options();
    let rec = state
        .engine
        .add_pattern(&body.pattern, &body.template, opts)
        .ok_or(ApiError::Unavailable)?;
    Ok((StatusCode::CREATED, Json(rec)))
}

#[derive(Serialize)]
struct ReloadOut {
    patterns: usize,
}

async fn admin_reload(State(state): State<AppState>) -> Result<Json<ReloadOut>, ApiError> {
    let patterns = state.engine.reload_patterns().ok_or(ApiError::Unavailable)?;
    Ok(Json(ReloadOut { patterns }))
}

#[derive(Deserialize)]
struct ExplainQuery {
    q: String,
    limit: Option<usize>,
}

async fn debug_explain(
    State(state): State<AppState>,
    Query(q): Query<ExplainQuery>,
) -> Json<Vec<Candidate>> {
    let limit = q.limit.unwrap_or(DEFAULT_EXPLAIN_LIMIT);
    let mut out = state.engine.explain(&q.q);
    out.truncate(limit);
    Json(out)
}
