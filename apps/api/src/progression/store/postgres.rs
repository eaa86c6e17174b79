use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{ProgressStore, StoreError};
use crate::models::competency::CompetencySnapshotRow;
use crate::models::journey::JourneyRow;
use crate::models::sprint::SprintBoardRow;
use crate::models::workspace::PhaseTransitionRow;
use crate::progression::journey::{Journey, JourneyStatus};
use crate::progression::models::CompetencySnapshot;
use crate::progression::phase::{PhaseState, PhaseTransition};
use crate::progression::sprint::Sprint;

/// Postgres-backed store. Snapshots and phase transitions are INSERT-only;
/// the unique keys on (journey_id, competency_slug, evidence_count) and
/// (workspace_id, sequence) reject the loser of any concurrent write.
#[derive(Clone)]
pub struct PgProgressStore {
    pool: PgPool,
}

impl PgProgressStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Unique violations become conflicts; everything else stays a database error.
fn map_insert_error(err: sqlx::Error, what: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(format!("{what} was written concurrently"))
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl ProgressStore for PgProgressStore {
    async fn create_journey(&self, journey: &Journey) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO journeys (id, user_id, workspace_id, path_slug, role, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(journey.id)
        .bind(journey.user_id)
        .bind(journey.workspace_id)
        .bind(&journey.path_slug)
        .bind(&journey.role)
        .bind(journey.status.as_str())
        .bind(journey.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "journey"))?;
        Ok(())
    }

    async fn get_journey(&self, journey_id: Uuid) -> Result<Option<Journey>, StoreError> {
        let row: Option<JourneyRow> = sqlx::query_as("SELECT * FROM journeys WHERE id = $1")
            .bind(journey_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Journey::try_from).transpose()
    }

    async fn set_journey_status(
        &self,
        journey_id: Uuid,
        status: JourneyStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE journeys SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(journey_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Corrupt(format!("journey {journey_id} vanished")));
        }
        Ok(())
    }

    async fn get_latest_snapshot(
        &self,
        journey_id: Uuid,
        competency_slug: &str,
    ) -> Result<Option<CompetencySnapshot>, StoreError> {
        let row: Option<CompetencySnapshotRow> = sqlx::query_as(
            r#"
            SELECT * FROM competency_snapshots
            WHERE journey_id = $1 AND competency_slug = $2
            ORDER BY evidence_count DESC
            LIMIT 1
            "#,
        )
        .bind(journey_id)
        .bind(competency_slug)
        .fetch_optional(&self.pool)
        .await?;
        row.map(CompetencySnapshot::try_from).transpose()
    }

    async fn list_latest_snapshots(
        &self,
        journey_id: Uuid,
    ) -> Result<Vec<CompetencySnapshot>, StoreError> {
        let rows: Vec<CompetencySnapshotRow> = sqlx::query_as(
            r#"
            SELECT DISTINCT ON (competency_slug) *
            FROM competency_snapshots
            WHERE journey_id = $1
            ORDER BY competency_slug, evidence_count DESC
            "#,
        )
        .bind(journey_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(CompetencySnapshot::try_from).collect()
    }

    async fn snapshot_history(
        &self,
        journey_id: Uuid,
        competency_slug: &str,
    ) -> Result<Vec<CompetencySnapshot>, StoreError> {
        let rows: Vec<CompetencySnapshotRow> = sqlx::query_as(
            r#"
            SELECT * FROM competency_snapshots
            WHERE journey_id = $1 AND competency_slug = $2
            ORDER BY evidence_count ASC
            "#,
        )
        .bind(journey_id)
        .bind(competency_slug)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(CompetencySnapshot::try_from).collect()
    }

    async fn save_snapshot(&self, snapshot: &CompetencySnapshot) -> Result<(), StoreError> {
        // Only insert when this snapshot directly follows the latest one.
        let result = sqlx::query(
            r#"
            INSERT INTO competency_snapshots
                (id, user_id, journey_id, competency_slug, score, band,
                 evidence_count, source, evidence_type, recorded_at)
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, $10
            WHERE COALESCE(
                (SELECT MAX(evidence_count) FROM competency_snapshots
                 WHERE journey_id = $3 AND competency_slug = $4),
                0
            ) = $7 - 1
            "#,
        )
        .bind(snapshot.id)
        .bind(snapshot.user_id)
        .bind(snapshot.journey_id)
        .bind(&snapshot.competency_slug)
        .bind(snapshot.score)
        .bind(snapshot.band.as_str())
        .bind(snapshot.evidence_count as i32)
        .bind(snapshot.source.as_str())
        .bind(&snapshot.evidence_type)
        .bind(snapshot.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "competency snapshot"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "snapshot {} for '{}' is stale",
                snapshot.evidence_count, snapshot.competency_slug
            )));
        }
        debug!(
            "Inserted snapshot {} for journey {} competency {}",
            snapshot.evidence_count, snapshot.journey_id, snapshot.competency_slug
        );
        Ok(())
    }

    async fn get_completed_sprint_count(&self, journey_id: Uuid) -> Result<u32, StoreError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM workspace_phase_transitions t
            JOIN journeys j ON j.workspace_id = t.workspace_id
            WHERE j.id = $1 AND t.from_phase = 'retro'
            "#,
        )
        .bind(journey_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u32)
    }

    async fn get_current_phase(
        &self,
        workspace_id: Uuid,
    ) -> Result<Option<PhaseState>, StoreError> {
        let row: Option<PhaseTransitionRow> = sqlx::query_as(
            r#"
            SELECT * FROM workspace_phase_transitions
            WHERE workspace_id = $1
            ORDER BY sequence DESC
            LIMIT 1
            "#,
        )
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await?;
        let last = row.map(PhaseTransition::try_from).transpose()?;
        Ok(last.map(|t| PhaseState::default().apply(&t)))
    }

    async fn save_phase_transition(
        &self,
        workspace_id: Uuid,
        transition: &PhaseTransition,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO workspace_phase_transitions
                (id, workspace_id, sequence, from_phase, to_phase, sprint_number, created_at)
            SELECT $1, $2, $3, $4, $5, $6, $7
            WHERE COALESCE(
                (SELECT MAX(sequence) FROM workspace_phase_transitions WHERE workspace_id = $2),
                0
            ) = $3 - 1
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(workspace_id)
        .bind(transition.sequence as i32)
        .bind(transition.from.as_str())
        .bind(transition.to.as_str())
        .bind(transition.sprint_number as i32)
        .bind(transition.at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "phase transition"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "phase transition {} for workspace {workspace_id} is stale",
                transition.sequence
            )));
        }
        Ok(())
    }

    async fn phase_history(&self, workspace_id: Uuid) -> Result<Vec<PhaseTransition>, StoreError> {
        let rows: Vec<PhaseTransitionRow> = sqlx::query_as(
            "SELECT * FROM workspace_phase_transitions WHERE workspace_id = $1 ORDER BY sequence ASC",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(PhaseTransition::try_from).collect()
    }

    async fn create_sprint(&self, workspace_id: Uuid, sprint: &Sprint) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sprint_boards
                (workspace_id, sprint_number, theme, goal, day, tickets, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(workspace_id)
        .bind(sprint.number as i32)
        .bind(&sprint.theme)
        .bind(&sprint.goal)
        .bind(sprint.day as i16)
        .bind(Json(&sprint.tickets))
        .bind(sprint.version as i32)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "sprint board"))?;
        Ok(())
    }

    async fn get_sprint(
        &self,
        workspace_id: Uuid,
        sprint_number: u32,
    ) -> Result<Option<Sprint>, StoreError> {
        let row: Option<SprintBoardRow> = sqlx::query_as(
            r#"
            SELECT workspace_id, sprint_number, theme, goal, day, tickets, version
            FROM sprint_boards
            WHERE workspace_id = $1 AND sprint_number = $2
            "#,
        )
        .bind(workspace_id)
        .bind(sprint_number as i32)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Sprint::try_from).transpose()
    }

    async fn save_sprint(&self, workspace_id: Uuid, sprint: &Sprint) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE sprint_boards
            SET day = $3, tickets = $4, version = $5, updated_at = NOW()
            WHERE workspace_id = $1 AND sprint_number = $2 AND version = $5 - 1
            "#,
        )
        .bind(workspace_id)
        .bind(sprint.number as i32)
        .bind(sprint.day as i16)
        .bind(Json(&sprint.tickets))
        .bind(sprint.version as i32)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "sprint {} board version {} is stale",
                sprint.number, sprint.version
            )));
        }
        Ok(())
    }
}
