//! Request/response contract of the external reasoning service.
//!
//! The response shape is validated in exactly one place,
//! [`validate_response`]. Anything it rejects is a [`ReasoningError`] and is
//! handled by the caller the same way as a transport failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::assessment::{AdjustedAssessment, TrendLabel, clamp_score};
use crate::band::StatusBand;
use crate::error::ReasoningError;
use crate::sample::Sample;

pub const MAX_RECOMMENDATION_CHARS: usize = 150;
/// Historical scores included in a request, most recent last.
pub const MAX_RECENT_SCORES: usize = 5;

const RESPONSE_FIELDS: [&str; 4] = ["final_score", "status_band", "trend_label", "recommendation"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReasoningRequest {
    pub raw_score: f64,
    pub sample: Sample,
    pub trend_summary: String,
    pub maintenance_fact: String,
    /// Up to five historical final scores, oldest first
    pub recent_scores: Vec<f64>,
}

/// Transport-agnostic reasoning RPC. Implementations return the response
/// body untouched; shape checks belong to [`validate_response`].
#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn assess(&self, request: &ReasoningRequest) -> Result<Value, ReasoningError>;
}

/// Strictly validate a response body.
///
/// The object must contain exactly the four contract fields. `final_score`
/// is clamped into [0, 1]; the band is re-derived from the clamped score with
/// [`StatusBand::classify`] so it never depends on which path scored it.
pub fn validate_response(body: &Value) -> Result<AdjustedAssessment, ReasoningError> {
    let obj = body
        .as_object()
        .ok_or_else(|| ReasoningError::Malformed(truncate(&body.to_string(), 80)))?;

    for key in obj.keys() {
        if !RESPONSE_FIELDS.contains(&key.as_str()) {
            return Err(schema(key, "unexpected field"));
        }
    }

    let returned_score = obj
        .get("final_score")
        .ok_or_else(|| schema("final_score", "missing"))?
        .as_f64()
        .ok_or_else(|| schema("final_score", "must be a number"))?;

    let returned_band = obj
        .get("status_band")
        .ok_or_else(|| schema("status_band", "missing"))?
        .as_str()
        .and_then(StatusBand::parse)
        .ok_or_else(|| schema("status_band", "must be one of the five band names"))?;

    let trend_label = obj
        .get("trend_label")
        .ok_or_else(|| schema("trend_label", "missing"))?
        .as_str()
        .and_then(TrendLabel::parse)
        .ok_or_else(|| schema("trend_label", "must be IMPROVING, STABLE or DEGRADING"))?;

    let recommendation = obj
        .get("recommendation")
        .ok_or_else(|| schema("recommendation", "missing"))?
        .as_str()
        .ok_or_else(|| schema("recommendation", "must be a string"))?;
    if recommendation.trim().is_empty() {
        return Err(schema("recommendation", "must not be blank"));
    }
    if recommendation.chars().count() > MAX_RECOMMENDATION_CHARS {
        return Err(schema(
            "recommendation",
            &format!("must be at most {MAX_RECOMMENDATION_CHARS} characters"),
        ));
    }

    let final_score = clamp_score(returned_score);
    let status_band = StatusBand::classify(final_score);
    if status_band != returned_band {
        tracing::warn!(
            returned = returned_band.as_str(),
            derived = status_band.as_str(),
            final_score,
            "Reasoning service band disagrees with score; using derived band"
        );
    }

    Ok(AdjustedAssessment {
        final_score,
        status_band,
        trend_label,
        recommendation: recommendation.to_string(),
    })
}

fn schema(field: &str, message: &str) -> ReasoningError {
    ReasoningError::Schema {
        field: field.to_string(),
        message: message.to_string(),
    }
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::validate_response;
    use crate::assessment::TrendLabel;
    use crate::band::StatusBand;
    use crate::error::ReasoningError;

    fn field_of(err: ReasoningError) -> String {
        match err {
            ReasoningError::Schema { field, .. } => field,
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_well_formed_response() {
        let result = validate_response(&json!({
            "final_score": 0.42,
            "status_band": "ATTENTION_REQUIRED",
            "trend_label": "DEGRADING",
            "recommendation": "Schedule inspection within 30 days"
        }))
        .expect("valid response");

        assert_eq!(result.final_score, 0.42);
        assert_eq!(result.status_band, StatusBand::AttentionRequired);
        assert_eq!(result.trend_label, TrendLabel::Degrading);
    }

    #[test]
    fn clamps_out_of_range_score_and_rederives_band() {
        let result = validate_response(&json!({
            "final_score": 1.8,
            "status_band": "NORMAL_WEAR",
            "trend_label": "STABLE",
            "recommendation": "Plan maintenance"
        }))
        .expect("clamped response");

        assert_eq!(result.final_score, 1.0);
        assert_eq!(result.status_band, StatusBand::Critical);
    }

    #[test]
    fn rejects_missing_trend_label() {
        let err = validate_response(&json!({
            "final_score": 0.3,
            "status_band": "NORMAL_WEAR",
            "recommendation": "Continue routine maintenance"
        }))
        .expect_err("missing field");
        assert_eq!(field_of(err), "trend_label");
    }

    #[test]
    fn rejects_extra_fields() {
        let err = validate_response(&json!({
            "final_score": 0.3,
            "status_band": "NORMAL_WEAR",
            "trend_label": "STABLE",
            "recommendation": "ok",
            "confidence": "high"
        }))
        .expect_err("extra field");
        assert_eq!(field_of(err), "confidence");
    }

    #[test]
    fn rejects_out_of_enum_values() {
        let err = validate_response(&json!({
            "final_score": 0.3,
            "status_band": "OPTIMAL_CONDITION",
            "trend_label": "STABLE",
            "recommendation": "ok"
        }))
        .expect_err("legacy band name");
        assert_eq!(field_of(err), "status_band");

        let err = validate_response(&json!({
            "final_score": 0.3,
            "status_band": "NORMAL_WEAR",
            "trend_label": "stable",
            "recommendation": "ok"
        }))
        .expect_err("lowercase trend");
        assert_eq!(field_of(err), "trend_label");
    }

    #[test]
    fn rejects_string_score() {
        let err = validate_response(&json!({
            "final_score": "0.3",
            "status_band": "NORMAL_WEAR",
            "trend_label": "STABLE",
            "recommendation": "ok"
        }))
        .expect_err("string score");
        assert_eq!(field_of(err), "final_score");
    }

    #[test]
    fn rejects_overlong_recommendation() {
        let err = validate_response(&json!({
            "final_score": 0.3,
            "status_band": "NORMAL_WEAR",
            "trend_label": "STABLE",
            "recommendation": "x".repeat(151)
        }))
        .expect_err("too long");
        assert_eq!(field_of(err), "recommendation");
    }

    #[test]
    fn recommendation_length_counts_padding() {
        let padded = format!("{:<160}", "Change oil");
        let err = validate_response(&json!({
            "final_score": 0.3,
            "status_band": "NORMAL_WEAR",
            "trend_label": "STABLE",
            "recommendation": padded
        }))
        .expect_err("padded past the limit");
        assert_eq!(field_of(err), "recommendation");

        let result = validate_response(&json!({
            "final_score": 0.3,
            "status_band": "NORMAL_WEAR",
            "trend_label": "STABLE",
            "recommendation": " Change oil "
        }))
        .expect("within the limit");
        assert_eq!(result.recommendation, " Change oil ");
    }

    #[test]
    fn rejects_blank_recommendation() {
        let err = validate_response(&json!({
            "final_score": 0.3,
            "status_band": "NORMAL_WEAR",
            "trend_label": "STABLE",
            "recommendation": "   "
        }))
        .expect_err("blank");
        assert_eq!(field_of(err), "recommendation");
    }

    #[test]
    fn rejects_non_object_bodies() {
        let err = validate_response(&json!(["final_score", 0.3])).expect_err("array");
        assert!(matches!(err, ReasoningError::Malformed(_)));
    }
}
