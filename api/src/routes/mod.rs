use axum::Router;

use crate::state::AppState;

pub mod assessments;
pub mod entities;
pub mod health;

#[cfg(test)]
pub(crate) mod testing;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(assessments::router())
        .merge(entities::router())
}
