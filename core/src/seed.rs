//! Bootstrap history from a snapshot of historical lab records.
//!
//! The snapshot format is the legacy export: one JSON object per record with
//! `ship_name` as the entity, flat trace-element columns and the two scores
//! `ml_raw_score` / `gemini_final_score`.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assessment::{Confidence, NewAssessment, Provenance, TrendLabel};
use crate::band::StatusBand;
use crate::entity::normalize_entity_id;
use crate::error::StoreError;
use crate::history::HistoryStore;
use crate::sample::Sample;

const TRACE_ELEMENT_COLUMNS: [(&str, &str); 8] = [
    ("fe", "fe_ppm"),
    ("cr", "cr_ppm"),
    ("si", "si_ppm"),
    ("al", "al_ppm"),
    ("pb", "pb_ppm"),
    ("cu", "cu_ppm"),
    ("sn", "sn_ppm"),
    ("ni", "ni_ppm"),
];

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum LegacyFlag {
    Bool(bool),
    Int(i64),
}

impl LegacyFlag {
    fn as_bool(self) -> bool {
        match self {
            LegacyFlag::Bool(flag) => flag,
            LegacyFlag::Int(n) => n != 0,
        }
    }
}

impl Default for LegacyFlag {
    fn default() -> Self {
        LegacyFlag::Bool(false)
    }
}

/// One record of a seed snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedRecord {
    #[serde(default)]
    ship_name: Option<String>,
    oil_hrs: f64,
    total_hrs: f64,
    viscosity_40: f64,
    #[serde(default)]
    viscosity_100: Option<f64>,
    #[serde(default)]
    viscosity_index: Option<f64>,
    #[serde(default)]
    tbn: Option<f64>,
    #[serde(default)]
    flash_point: Option<f64>,
    #[serde(default)]
    water_content: Option<String>,
    #[serde(default)]
    oil_refill_start: LegacyFlag,
    #[serde(default)]
    oil_topup: LegacyFlag,
    #[serde(default)]
    health_score_lag_1: Option<f64>,
    ml_raw_score: f64,
    #[serde(default)]
    gemini_final_score: Option<f64>,
    #[serde(default)]
    trend: Option<String>,
    #[serde(default)]
    recommendation: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

impl SeedRecord {
    pub fn entity_id(&self) -> Option<String> {
        normalize_entity_id(self.ship_name.as_deref())
    }

    fn into_new_assessment(self, index: usize) -> Result<NewAssessment, StoreError> {
        let entity_id = self.entity_id();
        let raw_score = unit_score(index, "ml_raw_score", self.ml_raw_score)?;
        let final_score = unit_score(
            index,
            "gemini_final_score",
            self.gemini_final_score.unwrap_or(self.ml_raw_score),
        )?;

        let trace_elements = TRACE_ELEMENT_COLUMNS
            .iter()
            .filter_map(|(element, column)| {
                self.extra
                    .get(*column)
                    .and_then(serde_json::Value::as_f64)
                    .map(|ppm| (element.to_string(), ppm))
            })
            .collect();
        let lab_properties = [("tbn", self.tbn), ("flash_point", self.flash_point)]
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name.to_string(), v)))
            .collect();

        let sample = Sample {
            entity_id: entity_id.clone(),
            oil_hrs: self.oil_hrs,
            total_hrs: self.total_hrs,
            viscosity_40: self.viscosity_40,
            viscosity_100: self.viscosity_100,
            viscosity_index: self.viscosity_index,
            service_performed: self.oil_refill_start.as_bool(),
            topup_performed: self.oil_topup.as_bool(),
            trace_elements,
            lab_properties,
            water_content: self.water_content,
        };

        Ok(NewAssessment {
            entity_id,
            created_at: parse_timestamp(index, self.created_at.as_deref())?,
            sample,
            lag_score: unit_score(
                index,
                "health_score_lag_1",
                self.health_score_lag_1.unwrap_or(0.0),
            )?,
            raw_score,
            final_score,
            status_band: StatusBand::classify(final_score),
            trend_label: self
                .trend
                .as_deref()
                .and_then(TrendLabel::parse)
                .unwrap_or(TrendLabel::Stable),
            recommendation: self
                .recommendation
                .unwrap_or_else(|| "Historical record".to_string()),
            provenance: Provenance::Seed,
            confidence: Confidence::Historical,
        })
    }
}

/// Outcome of loading a snapshot.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SeedReport {
    pub seeded_scopes: Vec<Option<String>>,
    pub skipped_scopes: Vec<Option<String>>,
    pub records: usize,
}

pub fn parse_snapshot(raw: &str) -> Result<Vec<SeedRecord>, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Seed(format!("invalid snapshot JSON: {e}")))
}

/// Seed every entity scope present in `records`, keeping snapshot order
/// within each scope. Scopes the store has already seeded, or that already
/// hold live assessments, are skipped, so loading the same snapshot twice
/// leaves history unchanged.
pub async fn seed_history(
    store: &dyn HistoryStore,
    records: Vec<SeedRecord>,
) -> Result<SeedReport, StoreError> {
    let mut scopes: BTreeMap<Option<String>, Vec<NewAssessment>> = BTreeMap::new();
    for (index, record) in records.into_iter().enumerate() {
        let entry = record.into_new_assessment(index)?;
        scopes.entry(entry.entity_id.clone()).or_default().push(entry);
    }

    let mut report = SeedReport::default();
    for (scope, entries) in scopes {
        let count = entries.len();
        if store.seed_scope(scope.as_deref(), entries).await? {
            tracing::info!(
                entity = scope.as_deref().unwrap_or("<default>"),
                records = count,
                "Seeded history scope"
            );
            report.records += count;
            report.seeded_scopes.push(scope);
        } else {
            tracing::debug!(
                entity = scope.as_deref().unwrap_or("<default>"),
                "History scope already seeded or live; skipping"
            );
            report.skipped_scopes.push(scope);
        }
    }
    Ok(report)
}

fn unit_score(index: usize, field: &str, value: f64) -> Result<f64, StoreError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(StoreError::Seed(format!(
            "record {index}: {field} {value} is outside [0, 1]"
        )));
    }
    Ok(value)
}

fn parse_timestamp(index: usize, raw: Option<&str>) -> Result<DateTime<Utc>, StoreError> {
    let Some(raw) = raw else {
        return Ok(Utc::now());
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| StoreError::Seed(format!("record {index}: invalid created_at '{raw}': {e}")))
}
