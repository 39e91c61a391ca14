use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use oilwatch_core::error::ApiError;
use oilwatch_core::history::EntitySummary;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/entities", get(list_entities))
}

/// List entities with history and their current Lag State
#[utoipa::path(
    get,
    path = "/v1/entities",
    responses(
        (status = 200, description = "Known entities", body = Vec<EntitySummary>),
        (status = 500, description = "History store failed", body = ApiError)
    ),
    tag = "assessments"
)]
pub async fn list_entities(
    State(state): State<AppState>,
) -> Result<Json<Vec<EntitySummary>>, AppError> {
    Ok(Json(state.store.entities().await?))
}
