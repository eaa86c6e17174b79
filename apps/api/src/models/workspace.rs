use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::progression::phase::PhaseTransition;
use crate::progression::store::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PhaseTransitionRow {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub sequence: i32,
    pub from_phase: String,
    pub to_phase: String,
    pub sprint_number: i32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PhaseTransitionRow> for PhaseTransition {
    type Error = StoreError;

    fn try_from(row: PhaseTransitionRow) -> Result<Self, Self::Error> {
        let corrupt = |field: &str| {
            StoreError::Corrupt(format!("negative {field} on phase transition {}", row.id))
        };
        Ok(PhaseTransition {
            sequence: u32::try_from(row.sequence).map_err(|_| corrupt("sequence"))?,
            from: row.from_phase.parse().map_err(StoreError::Corrupt)?,
            to: row.to_phase.parse().map_err(StoreError::Corrupt)?,
            sprint_number: u32::try_from(row.sprint_number).map_err(|_| corrupt("sprint_number"))?,
            at: row.created_at,
        })
    }
}
