//! Persistence seam for the progression engine.
//!
//! The engine is storage-agnostic: it talks to a [`ProgressStore`] carried in
//! `AppState` as `Arc<dyn ProgressStore>`. Postgres backs production; the
//! in-memory store backs tests.
//!
//! Both backends are append-only for snapshots and phase transitions, and
//! both reject a write whose sequence number is already taken. That rejection
//! is what serializes concurrent read-modify-write cycles on the same
//! (journey, competency) or workspace; it surfaces as [`StoreError::Conflict`].
//! Sprint boards are mutable but versioned the same way.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::progression::journey::{Journey, JourneyStatus};
use crate::progression::models::CompetencySnapshot;
use crate::progression::phase::{PhaseState, PhaseTransition};
use crate::progression::sprint::Sprint;

pub mod memory;
pub mod postgres;

pub use memory::MemoryProgressStore;
pub use postgres::PgProgressStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Another writer got there first. Safe to retry from a fresh read.
    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn create_journey(&self, journey: &Journey) -> Result<(), StoreError>;

    async fn get_journey(&self, journey_id: Uuid) -> Result<Option<Journey>, StoreError>;

    async fn set_journey_status(
        &self,
        journey_id: Uuid,
        status: JourneyStatus,
    ) -> Result<(), StoreError>;

    async fn get_latest_snapshot(
        &self,
        journey_id: Uuid,
        competency_slug: &str,
    ) -> Result<Option<CompetencySnapshot>, StoreError>;

    /// Latest snapshot per competency, ordered by slug.
    async fn list_latest_snapshots(
        &self,
        journey_id: Uuid,
    ) -> Result<Vec<CompetencySnapshot>, StoreError>;

    /// Every snapshot ever written for one competency, oldest first.
    async fn snapshot_history(
        &self,
        journey_id: Uuid,
        competency_slug: &str,
    ) -> Result<Vec<CompetencySnapshot>, StoreError>;

    /// Appends a snapshot. Fails with `Conflict` unless `evidence_count` is
    /// exactly one past the current latest snapshot.
    async fn save_snapshot(&self, snapshot: &CompetencySnapshot) -> Result<(), StoreError>;

    async fn get_completed_sprint_count(&self, journey_id: Uuid) -> Result<u32, StoreError>;

    /// `None` for a workspace that has never advanced.
    async fn get_current_phase(&self, workspace_id: Uuid)
        -> Result<Option<PhaseState>, StoreError>;

    /// Appends a transition. Fails with `Conflict` unless `sequence` is
    /// exactly one past the current one.
    async fn save_phase_transition(
        &self,
        workspace_id: Uuid,
        transition: &PhaseTransition,
    ) -> Result<(), StoreError>;

    async fn phase_history(&self, workspace_id: Uuid) -> Result<Vec<PhaseTransition>, StoreError>;

    /// Stores a new board. Fails with `Conflict` if the sprint already has one.
    async fn create_sprint(&self, workspace_id: Uuid, sprint: &Sprint) -> Result<(), StoreError>;

    async fn get_sprint(
        &self,
        workspace_id: Uuid,
        sprint_number: u32,
    ) -> Result<Option<Sprint>, StoreError>;

    /// Replaces a board. Fails with `Conflict` unless `version` is exactly one
    /// past the stored one.
    async fn save_sprint(&self, workspace_id: Uuid, sprint: &Sprint) -> Result<(), StoreError>;
}
