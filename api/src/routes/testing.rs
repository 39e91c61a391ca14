use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::response::Response;
use oilwatch_core::adjuster::ContextualAdjuster;
use oilwatch_core::error::EstimatorError;
use oilwatch_core::estimator::{BaseEstimator, FeatureVector};
use oilwatch_core::history::{HistoryStore, InMemoryHistoryStore};
use oilwatch_core::pipeline::ScoringPipeline;

use crate::state::AppState;

/// Returns the same raw score for every feature vector.
pub struct FixedEstimator(pub f64);

#[async_trait]
impl BaseEstimator for FixedEstimator {
    async fn estimate(&self, _features: &FeatureVector) -> Result<f64, EstimatorError> {
        Ok(self.0)
    }
}

pub struct DownEstimator;

#[async_trait]
impl BaseEstimator for DownEstimator {
    async fn estimate(&self, _features: &FeatureVector) -> Result<f64, EstimatorError> {
        Err(EstimatorError::Unavailable("model file missing".to_string()))
    }
}

pub fn app_with(estimator: Arc<dyn BaseEstimator>) -> (Router, Arc<dyn HistoryStore>) {
    let store: Arc<dyn HistoryStore> = Arc::new(InMemoryHistoryStore::new());
    let pipeline = ScoringPipeline::new(
        store.clone(),
        estimator,
        ContextualAdjuster::fallback_only(),
        60,
    );
    let router = super::router().with_state(AppState::new(pipeline));
    (router, store)
}

/// Router over an empty in-memory store, with reasoning disabled.
pub fn app(raw_score: f64) -> Router {
    app_with(Arc::new(FixedEstimator(raw_score))).0
}

pub async fn json_body(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request should build")
}
