use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::models::Candidate;
use crate::services::bandit::{calculate_reward, BanditSummary};
use crate::services::context::{self, DEFAULT_POSITIVE_RATE};
use crate::services::nostalgia::{nostalgia_score, CatalogEntry, PopularityScale, ScoredEntry};
use crate::services::NostalgiaRanker;

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub user_id: String,
    pub stress_score: f64,
    pub emotion: String,
    pub birth_year: Option<i32>,
    pub positive_rate: Option<f64>,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Serialize)]
pub struct SelectResponse {
    pub index: usize,
    pub score: f64,
    pub candidate: Candidate,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub user_id: String,
    pub stress_score: f64,
    pub emotion: String,
    pub birth_year: Option<i32>,
    pub positive_rate: Option<f64>,
    pub candidate: Candidate,
    pub brings_back_memories: bool,
}

#[derive(Debug, Deserialize)]
pub struct OnboardingRequest {
    pub selected_items: Vec<Candidate>,
    pub context: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
pub struct NostalgiaScoreRequest {
    pub birth_year: i32,
    pub release_year: i32,
    pub rating_count: f64,
    pub max_count: f64,
    #[serde(default)]
    pub linear: bool,
}

#[derive(Debug, Serialize)]
pub struct NostalgiaScoreResponse {
    pub score: f64,
}

#[derive(Debug, Deserialize)]
pub struct NostalgiaRankRequest {
    pub birth_year: i32,
    pub current_year: Option<i32>,
    pub min_content_age: Option<i32>,
    #[serde(default)]
    pub linear: bool,
    pub items: Vec<CatalogEntry>,
}

fn scale(linear: bool) -> PopularityScale {
    if linear {
        PopularityScale::Linear
    } else {
        PopularityScale::Log
    }
}

fn validate_user_id(user_id: &str) -> AppResult<()> {
    if user_id.trim().is_empty() {
        return Err(AppError::InvalidInput("user_id must not be empty".to_string()));
    }
    Ok(())
}

/// Builds the context vector from request fields
fn request_context(
    stress_score: f64,
    emotion: &str,
    birth_year: Option<i32>,
    positive_rate: Option<f64>,
) -> AppResult<Vec<f64>> {
    if !(0.0..=1.0).contains(&stress_score) {
        return Err(AppError::InvalidInput(format!(
            "stress_score must be within [0, 1], got {}",
            stress_score
        )));
    }
    let positive_rate = positive_rate.unwrap_or(DEFAULT_POSITIVE_RATE);
    if !(0.0..=1.0).contains(&positive_rate) {
        return Err(AppError::InvalidInput(format!(
            "positive_rate must be within [0, 1], got {}",
            positive_rate
        )));
    }

    Ok(context::build(stress_score, emotion, birth_year, positive_rate).to_vec())
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Pick the candidate to show a user
pub async fn select(
    State(state): State<AppState>,
    Json(request): Json<SelectRequest>,
) -> AppResult<Json<SelectResponse>> {
    validate_user_id(&request.user_id)?;
    let context = request_context(
        request.stress_score,
        &request.emotion,
        request.birth_year,
        request.positive_rate,
    )?;

    let bandit = Arc::clone(&state.bandit);
    let user_id = request.user_id;
    let candidates = request.candidates;

    let (index, score, candidates) = tokio::task::spawn_blocking(move || {
        bandit
            .select(&user_id, &context, &candidates)
            .map(|(index, score)| (index, score, candidates))
    })
    .await??;

    let candidate = candidates
        .into_iter()
        .nth(index)
        .ok_or_else(|| AppError::Internal(format!("selected index {} out of range", index)))?;

    Ok(Json(SelectResponse {
        index,
        score,
        candidate,
    }))
}

/// Record how a user reacted to a shown candidate
pub async fn feedback(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> AppResult<StatusCode> {
    validate_user_id(&request.user_id)?;
    let context = request_context(
        request.stress_score,
        &request.emotion,
        request.birth_year,
        request.positive_rate,
    )?;
    let reward = calculate_reward(request.brings_back_memories);

    tracing::info!(
        user_id = %request.user_id,
        content_type = %request.candidate.content_type,
        reward = reward,
        "Recording feedback"
    );

    let bandit = Arc::clone(&state.bandit);
    tokio::task::spawn_blocking(move || {
        bandit.update(&request.user_id, &context, &request.candidate, reward)
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Seed a new user's model from their onboarding picks
pub async fn onboarding(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<OnboardingRequest>,
) -> AppResult<StatusCode> {
    validate_user_id(&user_id)?;

    let bandit = Arc::clone(&state.bandit);
    tokio::task::spawn_blocking(move || {
        bandit.warm_start_user(&user_id, &request.selected_items, request.context.as_deref())
    })
    .await??;

    Ok(StatusCode::NO_CONTENT)
}

/// Score a single item for a user's birth year
pub async fn nostalgia(Json(request): Json<NostalgiaScoreRequest>) -> Json<NostalgiaScoreResponse> {
    let score = nostalgia_score(
        request.birth_year,
        request.release_year,
        request.rating_count,
        request.max_count,
        scale(request.linear),
    );
    Json(NostalgiaScoreResponse { score })
}

/// Rank catalog items by nostalgia, dropping recent releases
pub async fn nostalgia_rank(Json(request): Json<NostalgiaRankRequest>) -> AppResult<Json<Vec<ScoredEntry>>> {
    let current_year = request
        .current_year
        .unwrap_or_else(|| chrono::Utc::now().year());

    let mut ranker = NostalgiaRanker::new().with_scale(scale(request.linear));
    if let Some(years) = request.min_content_age {
        if years < 0 {
            return Err(AppError::InvalidInput(
                "min_content_age must not be negative".to_string(),
            ));
        }
        ranker = ranker.with_min_content_age(years);
    }

    Ok(Json(ranker.rank(request.birth_year, current_year, request.items)))
}

/// Engine counters
pub async fn stats(State(state): State<AppState>) -> AppResult<Json<BanditSummary>> {
    let bandit = Arc::clone(&state.bandit);
    let summary = tokio::task::spawn_blocking(move || bandit.summary()).await?;
    Ok(Json(summary))
}
