use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::progression::models::CompetencySnapshot;
use crate::progression::store::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompetencySnapshotRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub journey_id: Uuid,
    pub competency_slug: String,
    pub score: f64,
    pub band: String,
    pub evidence_count: i32,
    pub source: String,
    pub evidence_type: String,
    pub recorded_at: DateTime<Utc>,
}

impl TryFrom<CompetencySnapshotRow> for CompetencySnapshot {
    type Error = StoreError;

    fn try_from(row: CompetencySnapshotRow) -> Result<Self, Self::Error> {
        let evidence_count = u32::try_from(row.evidence_count).map_err(|_| {
            StoreError::Corrupt(format!("negative evidence_count on snapshot {}", row.id))
        })?;
        Ok(CompetencySnapshot {
            id: row.id,
            user_id: row.user_id,
            journey_id: row.journey_id,
            competency_slug: row.competency_slug,
            score: row.score,
            band: row.band.parse().map_err(StoreError::Corrupt)?,
            evidence_count,
            source: row.source.parse().map_err(StoreError::Corrupt)?,
            evidence_type: row.evidence_type,
            recorded_at: row.recorded_at,
        })
    }
}
