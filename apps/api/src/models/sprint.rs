use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::progression::sprint::{Sprint, Ticket};
use crate::progression::store::StoreError;

#[derive(Debug, Clone, FromRow)]
pub struct SprintBoardRow {
    pub workspace_id: Uuid,
    pub sprint_number: i32,
    pub theme: String,
    pub goal: String,
    pub day: i16,
    pub tickets: Json<Vec<Ticket>>,
    pub version: i32,
}

impl TryFrom<SprintBoardRow> for Sprint {
    type Error = StoreError;

    fn try_from(row: SprintBoardRow) -> Result<Self, Self::Error> {
        let corrupt = |field: &str| {
            StoreError::Corrupt(format!(
                "bad {field} on sprint {} of workspace {}",
                row.sprint_number, row.workspace_id
            ))
        };
        Ok(Sprint {
            number: u32::try_from(row.sprint_number).map_err(|_| corrupt("sprint_number"))?,
            day: u8::try_from(row.day).map_err(|_| corrupt("day"))?,
            version: u32::try_from(row.version).map_err(|_| corrupt("version"))?,
            theme: row.theme,
            goal: row.goal,
            tickets: row.tickets.0,
        })
    }
}
