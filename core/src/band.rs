use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lower bound (inclusive) of each band above OPTIMAL.
pub const NORMAL_WEAR_FROM: f64 = 0.25;
pub const ATTENTION_REQUIRED_FROM: f64 = 0.40;
pub const MAINTENANCE_DUE_FROM: f64 = 0.55;
pub const CRITICAL_FROM: f64 = 0.75;

/// Five ordered health categories, best first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusBand {
    Optimal,
    NormalWear,
    AttentionRequired,
    MaintenanceDue,
    Critical,
}

impl StatusBand {
    pub const ALL: [StatusBand; 5] = [
        StatusBand::Optimal,
        StatusBand::NormalWear,
        StatusBand::AttentionRequired,
        StatusBand::MaintenanceDue,
        StatusBand::Critical,
    ];

    /// Map a continuous score to its band. Boundaries are closed-open;
    /// scores below 0 land in OPTIMAL, scores above 1 and NaN in CRITICAL.
    pub fn classify(score: f64) -> Self {
        if score < NORMAL_WEAR_FROM {
            StatusBand::Optimal
        } else if score < ATTENTION_REQUIRED_FROM {
            StatusBand::NormalWear
        } else if score < MAINTENANCE_DUE_FROM {
            StatusBand::AttentionRequired
        } else if score < CRITICAL_FROM {
            StatusBand::MaintenanceDue
        } else {
            StatusBand::Critical
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusBand::Optimal => "OPTIMAL",
            StatusBand::NormalWear => "NORMAL_WEAR",
            StatusBand::AttentionRequired => "ATTENTION_REQUIRED",
            StatusBand::MaintenanceDue => "MAINTENANCE_DUE",
            StatusBand::Critical => "CRITICAL",
        }
    }

    /// Exact, case-sensitive match against the wire names.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|band| band.as_str() == value)
    }
}

impl std::fmt::Display for StatusBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
