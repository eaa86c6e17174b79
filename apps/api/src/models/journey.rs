use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::progression::journey::Journey;
use crate::progression::store::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JourneyRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub workspace_id: Uuid,
    pub path_slug: String,
    pub role: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<JourneyRow> for Journey {
    type Error = StoreError;

    fn try_from(row: JourneyRow) -> Result<Self, Self::Error> {
        Ok(Journey {
            id: row.id,
            user_id: row.user_id,
            workspace_id: row.workspace_id,
            path_slug: row.path_slug,
            role: row.role,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            created_at: row.created_at,
        })
    }
}
