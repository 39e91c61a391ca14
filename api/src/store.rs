use std::collections::BTreeMap;

use async_trait::async_trait;
use oilwatch_core::assessment::{Assessment, Confidence, NewAssessment, Provenance, TrendLabel};
use oilwatch_core::band::StatusBand;
use oilwatch_core::error::StoreError;
use oilwatch_core::history::{EntitySummary, HistoryStore};
use oilwatch_core::sample::Sample;
use sqlx::PgPool;

/// Scope key for the default entity in `seeded_scopes`. Blank entity ids
/// normalize to the default entity, so no named scope can collide with it.
const DEFAULT_SCOPE: &str = "";

const SELECT_COLUMNS: &str = r#"
    id, entity_id, created_at,
    oil_hrs, total_hrs, viscosity_40, viscosity_100, viscosity_index,
    service_performed, topup_performed, trace_elements, lab_properties, water_content,
    lag_score, raw_score, final_score, status_band, trend_label, recommendation,
    provenance, confidence
"#;

/// History store backed by the `assessments` table.
#[derive(Clone)]
pub struct PgHistoryStore {
    pool: PgPool,
}

impl PgHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

async fn insert<'e, E>(executor: E, entry: &NewAssessment) -> Result<i64, StoreError>
where
    E: sqlx::PgExecutor<'e>,
{
    let trace_elements = serde_json::to_value(&entry.sample.trace_elements)
        .map_err(|e| StoreError::Backend(format!("trace_elements: {e}")))?;
    let lab_properties = serde_json::to_value(&entry.sample.lab_properties)
        .map_err(|e| StoreError::Backend(format!("lab_properties: {e}")))?;

    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO assessments (
            entity_id, created_at,
            oil_hrs, total_hrs, viscosity_40, viscosity_100, viscosity_index,
            service_performed, topup_performed, trace_elements, lab_properties, water_content,
            lag_score, raw_score, final_score, status_band, trend_label, recommendation,
            provenance, confidence
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
        RETURNING id
        "#,
    )
    .bind(&entry.entity_id)
    .bind(entry.created_at)
    .bind(entry.sample.oil_hrs)
    .bind(entry.sample.total_hrs)
    .bind(entry.sample.viscosity_40)
    .bind(entry.sample.viscosity_100)
    .bind(entry.sample.viscosity_index)
    .bind(entry.sample.service_performed)
    .bind(entry.sample.topup_performed)
    .bind(trace_elements)
    .bind(lab_properties)
    .bind(&entry.sample.water_content)
    .bind(entry.lag_score)
    .bind(entry.raw_score)
    .bind(entry.final_score)
    .bind(entry.status_band.as_str())
    .bind(entry.trend_label.as_str())
    .bind(&entry.recommendation)
    .bind(entry.provenance.as_str())
    .bind(entry.confidence.as_str())
    .fetch_one(executor)
    .await
    .map_err(backend)
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn append(&self, entry: NewAssessment) -> Result<Assessment, StoreError> {
        let id = insert(&self.pool, &entry).await?;
        Ok(entry.into_assessment(id))
    }

    async fn latest(&self, entity_id: Option<&str>) -> Result<Option<Assessment>, StoreError> {
        let row = sqlx::query_as::<_, AssessmentRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM assessments \
             WHERE entity_id IS NOT DISTINCT FROM $1 ORDER BY id DESC LIMIT 1"
        ))
        .bind(entity_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(AssessmentRow::into_assessment).transpose()
    }

    async fn recent(
        &self,
        entity_id: Option<&str>,
        n: usize,
    ) -> Result<Vec<Assessment>, StoreError> {
        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, AssessmentRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM assessments \
             WHERE entity_id IS NOT DISTINCT FROM $1 ORDER BY id DESC LIMIT $2"
        ))
        .bind(entity_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        // Fetched newest first; history is reported oldest first.
        rows.into_iter()
            .rev()
            .map(AssessmentRow::into_assessment)
            .collect()
    }

    async fn entities(&self) -> Result<Vec<EntitySummary>, StoreError> {
        let rows = sqlx::query_as::<_, (Option<String>, i64, f64)>(
            r#"
            SELECT DISTINCT ON (entity_id)
                entity_id,
                COUNT(*) OVER (PARTITION BY entity_id) AS assessments,
                final_score AS lag_score
            FROM assessments
            ORDER BY entity_id, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let mut out: Vec<EntitySummary> = rows
            .into_iter()
            .map(|(entity_id, assessments, lag_score)| EntitySummary {
                entity_id,
                assessments,
                lag_score,
            })
            .collect();
        out.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        Ok(out)
    }

    async fn seed_scope(
        &self,
        entity_id: Option<&str>,
        entries: Vec<NewAssessment>,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        // Snapshot records must never land behind live assessments.
        let has_history = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM assessments WHERE entity_id IS NOT DISTINCT FROM $1)",
        )
        .bind(entity_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(backend)?;
        if has_history {
            tx.rollback().await.map_err(backend)?;
            return Ok(false);
        }

        let claimed = sqlx::query(
            "INSERT INTO seeded_scopes (scope) VALUES ($1) ON CONFLICT (scope) DO NOTHING",
        )
        .bind(entity_id.unwrap_or(DEFAULT_SCOPE))
        .execute(&mut *tx)
        .await
        .map_err(backend)?
        .rows_affected();

        if claimed == 0 {
            tx.rollback().await.map_err(backend)?;
            return Ok(false);
        }

        for mut entry in entries {
            entry.entity_id = entity_id.map(str::to_string);
            insert(&mut *tx, &entry).await?;
        }

        tx.commit().await.map_err(backend)?;
        Ok(true)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
            .map_err(backend)
    }
}

/// Internal row type for sqlx mapping
#[derive(sqlx::FromRow)]
struct AssessmentRow {
    id: i64,
    entity_id: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    oil_hrs: f64,
    total_hrs: f64,
    viscosity_40: f64,
    viscosity_100: Option<f64>,
    viscosity_index: Option<f64>,
    service_performed: bool,
    topup_performed: bool,
    trace_elements: serde_json::Value,
    lab_properties: serde_json::Value,
    water_content: Option<String>,
    lag_score: f64,
    raw_score: f64,
    final_score: f64,
    status_band: String,
    trend_label: String,
    recommendation: String,
    provenance: String,
    confidence: String,
}

impl AssessmentRow {
    fn into_assessment(self) -> Result<Assessment, StoreError> {
        let corrupt = |column: &str, value: &str| {
            StoreError::Backend(format!(
                "assessment {} has unknown {column} '{value}'",
                self.id
            ))
        };

        let status_band = StatusBand::parse(&self.status_band)
            .ok_or_else(|| corrupt("status_band", &self.status_band))?;
        let trend_label = TrendLabel::parse(&self.trend_label)
            .ok_or_else(|| corrupt("trend_label", &self.trend_label))?;
        let provenance = Provenance::parse(&self.provenance)
            .ok_or_else(|| corrupt("provenance", &self.provenance))?;
        let confidence = Confidence::parse(&self.confidence)
            .ok_or_else(|| corrupt("confidence", &self.confidence))?;

        Ok(Assessment {
            id: self.id,
            entity_id: self.entity_id.clone(),
            created_at: self.created_at,
            sample: Sample {
                entity_id: self.entity_id.clone(),
                oil_hrs: self.oil_hrs,
                total_hrs: self.total_hrs,
                viscosity_40: self.viscosity_40,
                viscosity_100: self.viscosity_100,
                viscosity_index: self.viscosity_index,
                service_performed: self.service_performed,
                topup_performed: self.topup_performed,
                trace_elements: numeric_map(&self.trace_elements),
                lab_properties: numeric_map(&self.lab_properties),
                water_content: self.water_content.clone(),
            },
            lag_score: self.lag_score,
            raw_score: self.raw_score,
            final_score: self.final_score,
            status_band,
            trend_label,
            recommendation: self.recommendation,
            provenance,
            confidence,
        })
    }
}

fn numeric_map(value: &serde_json::Value) -> BTreeMap<String, f64> {
    value
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter_map(|(key, v)| v.as_f64().map(|n| (key.clone(), n)))
                .collect()
        })
        .unwrap_or_default()
}
