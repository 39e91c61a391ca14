use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::band::StatusBand;
use crate::sample::Sample;

/// Qualitative direction of an entity's health scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendLabel {
    Improving,
    Stable,
    Degrading,
}

impl TrendLabel {
    pub const ALL: [TrendLabel; 3] = [TrendLabel::Improving, TrendLabel::Stable, TrendLabel::Degrading];

    pub fn as_str(self) -> &'static str {
        match self {
            TrendLabel::Improving => "IMPROVING",
            TrendLabel::Stable => "STABLE",
            TrendLabel::Degrading => "DEGRADING",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|label| label.as_str() == value)
    }
}

/// Which path produced an Assessment's final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    External,
    Fallback,
    Seed,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::External => "external",
            Provenance::Fallback => "fallback",
            Provenance::Seed => "seed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "external" => Some(Provenance::External),
            "fallback" => Some(Provenance::Fallback),
            "seed" => Some(Provenance::Seed),
            _ => None,
        }
    }
}

/// How much history backed the base estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// A previous assessment supplied the lag feature
    High,
    /// No usable history; the lag feature was 0
    Medium,
    /// Imported from a seed snapshot
    Historical,
}

impl Confidence {
    pub fn from_lag(lag_score: f64) -> Self {
        if lag_score == 0.0 {
            Confidence::Medium
        } else {
            Confidence::High
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Historical => "historical",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "high" => Some(Confidence::High),
            "medium" => Some(Confidence::Medium),
            "historical" => Some(Confidence::Historical),
            _ => None,
        }
    }
}

/// The refined outcome of one cycle, before it is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AdjustedAssessment {
    pub final_score: f64,
    pub status_band: StatusBand,
    pub trend_label: TrendLabel,
    pub recommendation: String,
}

/// An Assessment waiting for its store-assigned sequence id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAssessment {
    pub entity_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sample: Sample,
    pub lag_score: f64,
    pub raw_score: f64,
    pub final_score: f64,
    pub status_band: StatusBand,
    pub trend_label: TrendLabel,
    pub recommendation: String,
    pub provenance: Provenance,
    pub confidence: Confidence,
}

impl NewAssessment {
    pub fn into_assessment(self, id: i64) -> Assessment {
        Assessment {
            id,
            entity_id: self.entity_id,
            created_at: self.created_at,
            sample: self.sample,
            lag_score: self.lag_score,
            raw_score: self.raw_score,
            final_score: self.final_score,
            status_band: self.status_band,
            trend_label: self.trend_label,
            recommendation: self.recommendation,
            provenance: self.provenance,
            confidence: self.confidence,
        }
    }
}

/// Persisted output of one scoring cycle. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Assessment {
    /// Store-assigned sequence id, strictly increasing per entity
    pub id: i64,
    pub entity_id: Option<String>,
    pub created_at: DateTime<Utc>,
    /// The Sample as submitted, kept for audit
    pub sample: Sample,
    /// Lag State consumed by the base estimator for this cycle
    pub lag_score: f64,
    pub raw_score: f64,
    pub final_score: f64,
    pub status_band: StatusBand,
    pub trend_label: TrendLabel,
    pub recommendation: String,
    pub provenance: Provenance,
    pub confidence: Confidence,
}

/// Clamp a score into [0, 1]. NaN maps to 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}
