use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::error::ApiError;
use crate::ledger::{MoodEntry, MoodLedger};
use crate::rate_limiter::RateLimiter;
use crate::sentiment::{Sentiment, SentimentModel, SentimentService};
use crate::validation;

/// Shared application state, injected into every handler
pub type SharedState = Arc<AppState>;

/// Owns the rate limiter, sentiment service and mood ledger for the
/// process lifetime. No other component mutates them directly.
pub struct AppState {
    pub config: Config,
    pub rate_limiter: RateLimiter,
    pub sentiment: SentimentService,
    pub ledger: MoodLedger,
}

impl AppState {
    pub fn new(config: Config, model: Arc<dyn SentimentModel>) -> SharedState {
        Arc::new(Self {
            rate_limiter: RateLimiter::new(config.rate_limit_window, config.rate_limit_max),
            sentiment: SentimentService::new(model),
            ledger: MoodLedger::new(),
            config,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub services: ServiceReadiness,
}

#[derive(Debug, Serialize)]
pub struct ServiceReadiness {
    #[serde(rename = "sentimentAnalysis")]
    pub sentiment_analysis: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct MoodListResponse {
    pub moods: Vec<MoodEntry>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

const DEFAULT_PAGE_LIMIT: usize = 50;

/// Liveness report. Reachable before the sentiment model is ready and
/// exempt from rate limiting.
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    let sentiment_analysis = if state.sentiment.is_ready() {
        "ready"
    } else {
        "initializing"
    };

    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        services: ServiceReadiness { sentiment_analysis },
    })
}

/// Analyze a piece of text without persisting anything
pub async fn analyze_sentiment(
    State(state): State<SharedState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let Json(body) = body.map_err(|_| ApiError::validation("request body must be valid JSON"))?;
    let text = validation::mood_text(&body)?;

    let result = state.sentiment.analyze(&text).await?;

    Ok(Json(AnalysisResponse {
        sentiment: result.label,
        confidence: result.confidence,
        text: result.text,
    }))
}

/// Analyze and persist a mood entry.
///
/// The append runs only after analysis succeeds, so a failed request
/// never leaves a partial entry behind.
pub async fn create_mood(
    State(state): State<SharedState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<MoodEntry>), ApiError> {
    let Json(body) = body.map_err(|_| ApiError::validation("request body must be valid JSON"))?;
    let text = validation::mood_text(&body)?;

    let result = state.sentiment.analyze(&text).await?;
    let entry = state
        .ledger
        .append(result.text, result.label, result.confidence)?;

    tracing::debug!(id = %entry.id, sentiment = ?entry.sentiment, "mood entry recorded");

    Ok((StatusCode::CREATED, Json(entry)))
}

/// Paginated read of the mood ledger, most recent first
pub async fn list_moods(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<MoodListResponse>, ApiError> {
    let limit = page_param(&params, "limit", DEFAULT_PAGE_LIMIT);
    let offset = page_param(&params, "offset", 0);

    let page = state.ledger.page(limit, offset)?;

    Ok(Json(MoodListResponse {
        moods: page.items,
        total: page.total,
        limit,
        offset,
    }))
}

/// Uniform response for unmatched routes
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

// Negative or non-numeric values coerce to the default, not an error.
fn page_param(params: &HashMap<String, String>, key: &str, default: usize) -> usize {
    params
        .get(key)
        .and_then(|raw| raw.parse::<i64>().ok())
        .filter(|value| *value >= 0)
        .map(|value| value as usize)
        .unwrap_or(default)
}
