use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EstimatorError;
use crate::sample::Sample;

/// Feature order expected by the base regressor.
pub const FEATURE_COLUMNS: [&str; 6] = [
    "oil_hrs",
    "total_hrs",
    "viscosity_40",
    "oil_refill_start",
    "oil_topup",
    "health_score_lag_1",
];

/// Input of the base estimator. Field names match the regressor's contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub oil_hrs: f64,
    pub total_hrs: f64,
    pub viscosity_40: f64,
    pub oil_refill_start: u8,
    pub oil_topup: u8,
    pub health_score_lag_1: f64,
}

impl FeatureVector {
    /// `lag_score` must be the Lag State read at the start of the cycle.
    pub fn from_sample(sample: &Sample, lag_score: f64) -> Self {
        Self {
            oil_hrs: sample.oil_hrs,
            total_hrs: sample.total_hrs,
            viscosity_40: sample.viscosity_40,
            oil_refill_start: u8::from(sample.service_performed),
            oil_topup: u8::from(sample.topup_performed),
            health_score_lag_1: lag_score,
        }
    }
}

/// Opaque numeric regressor: features -> raw score.
#[async_trait]
pub trait BaseEstimator: Send + Sync {
    async fn estimate(&self, features: &FeatureVector) -> Result<f64, EstimatorError>;
}
