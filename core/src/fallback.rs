//! Deterministic, network-free substitute for the contextual adjuster.
//!
//! Total over every validated Sample and any history length; this is the
//! availability backstop of the scoring cycle and must never fail.

use crate::assessment::{AdjustedAssessment, TrendLabel, clamp_score};
use crate::band::StatusBand;
use crate::sample::Sample;
use crate::trend::mean;

/// Multiplier applied to the raw score when the oil was just changed.
pub const SERVICE_DISCOUNT: f64 = 0.7;
/// Number of most recent historical scores the fallback trend averages.
pub const FALLBACK_TREND_POINTS: usize = 3;
/// Distance from that mean that counts as movement.
pub const FALLBACK_TREND_THRESHOLD: f64 = 0.05;

pub const FALLBACK_RECOMMENDATION: &str = "Contextual analysis unavailable; score derived from the base model with deterministic rules. Review lab results manually before scheduling maintenance.";

/// Classify without the reasoning service.
///
/// `recent_scores` are historical final scores ordered oldest to newest.
pub fn classify(raw_score: f64, sample: &Sample, recent_scores: &[f64]) -> AdjustedAssessment {
    let mut final_score = clamp_score(raw_score);
    if sample.service_performed {
        final_score *= SERVICE_DISCOUNT;
    }

    AdjustedAssessment {
        final_score,
        status_band: StatusBand::classify(final_score),
        trend_label: trend_against_recent(final_score, recent_scores),
        recommendation: FALLBACK_RECOMMENDATION.to_string(),
    }
}

fn trend_against_recent(final_score: f64, recent_scores: &[f64]) -> TrendLabel {
    if recent_scores.len() < FALLBACK_TREND_POINTS {
        return TrendLabel::Stable;
    }
    let baseline = mean(&recent_scores[recent_scores.len() - FALLBACK_TREND_POINTS..]);
    if final_score > baseline + FALLBACK_TREND_THRESHOLD {
        TrendLabel::Degrading
    } else if final_score < baseline - FALLBACK_TREND_THRESHOLD {
        TrendLabel::Improving
    } else {
        TrendLabel::Stable
    }
}
