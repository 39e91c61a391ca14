use std::sync::Arc;

use chrono::Utc;

use crate::adjuster::{AdjustmentInput, ContextualAdjuster};
use crate::assessment::{Assessment, Confidence, NewAssessment};
use crate::entity::EntityResolver;
use crate::error::{CycleError, EstimatorError};
use crate::estimator::{BaseEstimator, FeatureVector};
use crate::history::HistoryStore;
use crate::sample::Sample;
use crate::trend;

/// One scoring cycle per call: resolve lag, estimate, analyze trend,
/// adjust, append.
///
/// Cycles for different entities may run concurrently. Within one entity the
/// read-lag / compute / append sequence takes no lock, so callers must keep
/// at most one cycle in flight per entity.
#[derive(Clone)]
pub struct ScoringPipeline {
    store: Arc<dyn HistoryStore>,
    resolver: EntityResolver,
    estimator: Arc<dyn BaseEstimator>,
    adjuster: ContextualAdjuster,
}

impl ScoringPipeline {
    pub fn new(
        store: Arc<dyn HistoryStore>,
        estimator: Arc<dyn BaseEstimator>,
        adjuster: ContextualAdjuster,
        window: usize,
    ) -> Self {
        Self {
            resolver: EntityResolver::new(store.clone(), window),
            store,
            estimator,
            adjuster,
        }
    }

    pub fn store(&self) -> &Arc<dyn HistoryStore> {
        &self.store
    }

    pub fn resolver(&self) -> &EntityResolver {
        &self.resolver
    }

    /// Validate a raw JSON Sample, then run a cycle for it.
    pub async fn run_json(&self, body: &serde_json::Value) -> Result<Assessment, CycleError> {
        let sample = Sample::from_json(body)?;
        self.run(sample).await
    }

    /// Score one Sample and append the result to its entity's history.
    ///
    /// The returned Assessment is exactly what was appended; if the append
    /// fails the cycle fails and nothing is reported as scored.
    pub async fn run(&self, sample: Sample) -> Result<Assessment, CycleError> {
        sample.validate()?;

        let context = self.resolver.resolve(sample.entity_id.as_deref()).await?;
        let features = FeatureVector::from_sample(&sample, context.lag_score);
        let raw_score = self.estimator.estimate(&features).await?;
        if !raw_score.is_finite() {
            return Err(EstimatorError::InvalidOutput(raw_score.to_string()).into());
        }
        let raw_score = raw_score.clamp(0.0, 1.0);

        let analysis = trend::analyze(&context.history);
        let history_scores = context.history_scores();
        let adjustment = self
            .adjuster
            .adjust(AdjustmentInput {
                raw_score,
                sample: &sample,
                trend: &analysis,
                history_scores: &history_scores,
            })
            .await;

        let result = adjustment.result;
        let entry = NewAssessment {
            entity_id: context.entity_id.clone(),
            created_at: Utc::now(),
            sample: Sample {
                entity_id: context.entity_id.clone(),
                ..sample
            },
            lag_score: context.lag_score,
            raw_score,
            final_score: result.final_score,
            status_band: result.status_band,
            trend_label: result.trend_label,
            recommendation: result.recommendation,
            provenance: adjustment.provenance,
            confidence: Confidence::from_lag(context.lag_score),
        };

        let assessment = self.store.append(entry).await.map_err(|err| {
            tracing::error!(
                entity = context.entity_id.as_deref().unwrap_or("<default>"),
                error = %err,
                "Failed to append assessment"
            );
            err
        })?;

        tracing::info!(
            entity = assessment.entity_id.as_deref().unwrap_or("<default>"),
            sequence_id = assessment.id,
            lag_score = assessment.lag_score,
            raw_score = assessment.raw_score,
            final_score = assessment.final_score,
            status_band = assessment.status_band.as_str(),
            provenance = assessment.provenance.as_str(),
            "Assessment recorded"
        );
        Ok(assessment)
    }
}
