use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::assessment::{Assessment, Confidence, NewAssessment, Provenance, TrendLabel};
use crate::band::StatusBand;
use crate::error::{EstimatorError, ReasoningError};
use crate::estimator::{BaseEstimator, FeatureVector};
use crate::reasoning::{ReasoningRequest, ReasoningService};
use crate::sample::Sample;

pub(crate) fn sample_fixture(service_performed: bool, topup_performed: bool) -> Sample {
    Sample {
        entity_id: None,
        oil_hrs: 3500.0,
        total_hrs: 98000.0,
        viscosity_40: 140.0,
        viscosity_100: None,
        viscosity_index: None,
        service_performed,
        topup_performed,
        trace_elements: BTreeMap::new(),
        lab_properties: BTreeMap::new(),
        water_content: None,
    }
}

pub(crate) fn assessment_fixture(id: i64, entity_id: Option<&str>, final_score: f64) -> Assessment {
    let mut sample = sample_fixture(false, false);
    sample.entity_id = entity_id.map(str::to_string);
    Assessment {
        id,
        entity_id: entity_id.map(str::to_string),
        created_at: Utc
            .with_ymd_and_hms(2025, 7, 11, 10, 0, 0)
            .single()
            .expect("valid timestamp"),
        sample,
        lag_score: 0.0,
        raw_score: final_score,
        final_score,
        status_band: StatusBand::classify(final_score),
        trend_label: TrendLabel::Stable,
        recommendation: "Continue routine maintenance".to_string(),
        provenance: Provenance::External,
        confidence: Confidence::High,
    }
}

/// Returns a fixed score and records every feature vector it saw.
pub(crate) struct StaticEstimator {
    pub score: f64,
    pub seen: Mutex<Vec<FeatureVector>>,
}

impl StaticEstimator {
    pub fn new(score: f64) -> Self {
        Self {
            score,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn lags(&self) -> Vec<f64> {
        self.seen
            .lock()
            .expect("lock")
            .iter()
            .map(|f| f.health_score_lag_1)
            .collect()
    }
}

#[async_trait]
impl BaseEstimator for StaticEstimator {
    async fn estimate(&self, features: &FeatureVector) -> Result<f64, EstimatorError> {
        self.seen.lock().expect("lock").push(features.clone());
        Ok(self.score)
    }
}

pub(crate) struct FailingEstimator;

#[async_trait]
impl BaseEstimator for FailingEstimator {
    async fn estimate(&self, _features: &FeatureVector) -> Result<f64, EstimatorError> {
        Err(EstimatorError::Unavailable("model file missing".to_string()))
    }
}

/// Replays a canned reasoning outcome and records every request it saw.
pub(crate) struct ScriptedReasoning {
    pub response: Result<Value, ReasoningError>,
    pub delay: Option<std::time::Duration>,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<ReasoningRequest>>,
}

impl ScriptedReasoning {
    pub fn responding(value: Value) -> Self {
        Self {
            response: Ok(value),
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: ReasoningError) -> Self {
        Self {
            response: Err(err),
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ReasoningRequest> {
        self.requests.lock().expect("lock").clone()
    }
}

#[async_trait]
impl ReasoningService for ScriptedReasoning {
    async fn assess(&self, request: &ReasoningRequest) -> Result<Value, ReasoningError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().expect("lock").push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response.clone()
    }
}

pub(crate) fn new_assessment_fixture(entity_id: Option<&str>, final_score: f64) -> NewAssessment {
    let a = assessment_fixture(0, entity_id, final_score);
    NewAssessment {
        entity_id: a.entity_id,
        created_at: a.created_at,
        sample: a.sample,
        lag_score: a.lag_score,
        raw_score: a.raw_score,
        final_score: a.final_score,
        status_band: a.status_band,
        trend_label: a.trend_label,
        recommendation: a.recommendation,
        provenance: a.provenance,
        confidence: a.confidence,
    }
}
