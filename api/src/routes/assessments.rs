use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use oilwatch_core::assessment::Assessment;
use oilwatch_core::entity::normalize_entity_id;
use oilwatch_core::error::ApiError;
use oilwatch_core::sample::Sample;

use crate::error::AppError;
use crate::extract::{AppJson, AppQuery};
use crate::state::AppState;

pub const DEFAULT_HISTORY_LIMIT: i64 = 60;
pub const MAX_HISTORY_LIMIT: i64 = 500;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/assessments", get(list_assessments).post(create_assessment))
        .route("/v1/assessments/latest", get(latest_assessment))
}

/// Run one scoring cycle for a Sample
///
/// Resolves the entity's Lag State, scores the sample with the base
/// estimator, adjusts the score through the reasoning service (or the
/// deterministic fallback) and appends the result to the entity's history.
#[utoipa::path(
    post,
    path = "/v1/assessments",
    request_body = Sample,
    responses(
        (status = 201, description = "Assessment recorded", body = Assessment),
        (status = 400, description = "Invalid sample", body = ApiError),
        (status = 502, description = "Base estimator failed; nothing recorded", body = ApiError),
        (status = 500, description = "History store failed", body = ApiError)
    ),
    tag = "assessments"
)]
pub async fn create_assessment(
    State(state): State<AppState>,
    AppJson(body): AppJson<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    let assessment = state.pipeline.run_json(&body).await?;
    Ok((StatusCode::CREATED, Json(assessment)))
}

/// Query parameters for reading an entity's history
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct HistoryParams {
    /// Entity identifier; omit for the default entity
    #[serde(default)]
    pub entity: Option<String>,
    /// Maximum number of assessments to return (default 60, max 500)
    #[serde(default)]
    pub limit: Option<i64>,
}

/// List an entity's most recent assessments, oldest first
#[utoipa::path(
    get,
    path = "/v1/assessments",
    params(HistoryParams),
    responses(
        (status = 200, description = "Recent assessments, oldest first", body = Vec<Assessment>),
        (status = 500, description = "History store failed", body = ApiError)
    ),
    tag = "assessments"
)]
pub async fn list_assessments(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<HistoryParams>,
) -> Result<Json<Vec<Assessment>>, AppError> {
    let entity_id = normalize_entity_id(params.entity.as_deref());
    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let history = state
        .store
        .recent(entity_id.as_deref(), limit as usize)
        .await?;
    Ok(Json(history))
}

/// Query parameters for the latest assessment
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct LatestParams {
    /// Entity identifier; omit for the default entity
    #[serde(default)]
    pub entity: Option<String>,
}

/// Get an entity's most recent assessment
#[utoipa::path(
    get,
    path = "/v1/assessments/latest",
    params(LatestParams),
    responses(
        (status = 200, description = "Latest assessment", body = Assessment),
        (status = 404, description = "Entity has no history", body = ApiError)
    ),
    tag = "assessments"
)]
pub async fn latest_assessment(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<LatestParams>,
) -> Result<Json<Assessment>, AppError> {
    let entity_id = normalize_entity_id(params.entity.as_deref());
    let latest = state.store.latest(entity_id.as_deref()).await?;
    latest.map(Json).ok_or_else(|| AppError::NotFound {
        resource: match entity_id {
            Some(id) => format!("Assessment history for entity '{id}'"),
            None => "Assessment history for the default entity".to_string(),
        },
    })
}
