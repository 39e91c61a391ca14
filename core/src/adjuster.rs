use std::sync::Arc;
use std::time::Duration;

use crate::assessment::{AdjustedAssessment, Provenance};
use crate::error::ReasoningError;
use crate::fallback;
use crate::reasoning::{MAX_RECENT_SCORES, ReasoningRequest, ReasoningService, validate_response};
use crate::sample::Sample;
use crate::trend::TrendAnalysis;

pub const DEFAULT_REASONING_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything the adjuster needs for one cycle.
pub struct AdjustmentInput<'a> {
    pub raw_score: f64,
    pub sample: &'a Sample,
    pub trend: &'a TrendAnalysis,
    /// Historical final scores of the entity window, oldest first
    pub history_scores: &'a [f64],
}

#[derive(Debug, Clone, PartialEq)]
pub struct Adjustment {
    pub result: AdjustedAssessment,
    pub provenance: Provenance,
}

enum State {
    Start,
    CallExternal(ReasoningRequest),
    ParseOk(AdjustedAssessment),
    CallFailed(ReasoningError),
    ParseFailed(ReasoningError),
    CallFallback,
    Done(Adjustment),
}

/// Refines a raw score through the reasoning service, falling back to the
/// deterministic classifier on any failure. No retries: the fallback is the
/// retry strategy.
#[derive(Clone)]
pub struct ContextualAdjuster {
    service: Option<Arc<dyn ReasoningService>>,
    timeout: Duration,
}

impl ContextualAdjuster {
    pub fn new(service: Arc<dyn ReasoningService>, timeout: Duration) -> Self {
        Self {
            service: Some(service),
            timeout,
        }
    }

    /// An adjuster with no reasoning service; every cycle takes the fallback.
    pub fn fallback_only() -> Self {
        Self {
            service: None,
            timeout: DEFAULT_REASONING_TIMEOUT,
        }
    }

    pub async fn adjust(&self, input: AdjustmentInput<'_>) -> Adjustment {
        let mut state = State::Start;
        loop {
            state = match state {
                State::Start => State::CallExternal(build_request(&input)),
                State::CallExternal(request) => match self.call(&request).await {
                    Ok(body) => match validate_response(&body) {
                        Ok(result) => State::ParseOk(result),
                        Err(err) => State::ParseFailed(err),
                    },
                    Err(err) => State::CallFailed(err),
                },
                State::ParseOk(result) => State::Done(Adjustment {
                    result,
                    provenance: Provenance::External,
                }),
                State::CallFailed(err) | State::ParseFailed(err) => {
                    tracing::warn!(
                        failure = err.class(),
                        error = %err,
                        "Contextual analysis unavailable; using fallback classifier"
                    );
                    State::CallFallback
                }
                State::CallFallback => State::Done(Adjustment {
                    result: fallback::classify(input.raw_score, input.sample, input.history_scores),
                    provenance: Provenance::Fallback,
                }),
                State::Done(adjustment) => return adjustment,
            };
        }
    }

    async fn call(&self, request: &ReasoningRequest) -> Result<serde_json::Value, ReasoningError> {
        let service = self.service.as_ref().ok_or(ReasoningError::NotConfigured)?;
        tokio::time::timeout(self.timeout, service.assess(request))
            .await
            .map_err(|_| ReasoningError::Timeout(self.timeout))?
    }
}

fn build_request(input: &AdjustmentInput<'_>) -> ReasoningRequest {
    let scores = input.history_scores;
    ReasoningRequest {
        raw_score: input.raw_score,
        sample: input.sample.clone(),
        trend_summary: input.trend.summary(),
        maintenance_fact: input.trend.maintenance_text(),
        recent_scores: scores[scores.len().saturating_sub(MAX_RECENT_SCORES)..].to_vec(),
    }
}
