use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ProgressStore, StoreError};
use crate::progression::journey::{Journey, JourneyStatus};
use crate::progression::models::CompetencySnapshot;
use crate::progression::phase::{PhaseState, PhaseTransition};
use crate::progression::sprint::Sprint;

#[derive(Default)]
struct Inner {
    journeys: HashMap<Uuid, Journey>,
    /// (journey_id, competency_slug) → history, oldest first.
    snapshots: HashMap<(Uuid, String), Vec<CompetencySnapshot>>,
    /// workspace_id → transitions, oldest first.
    transitions: HashMap<Uuid, Vec<PhaseTransition>>,
    sprints: HashMap<(Uuid, u32), Sprint>,
}

/// Process-local store. Every method takes the lock once, so each append is
/// checked and applied atomically.
#[derive(Default)]
pub struct MemoryProgressStore {
    inner: RwLock<Inner>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn create_journey(&self, journey: &Journey) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.journeys.contains_key(&journey.id) {
            return Err(StoreError::Conflict(format!(
                "journey {} already exists",
                journey.id
            )));
        }
        inner.journeys.insert(journey.id, journey.clone());
        Ok(())
    }

    async fn get_journey(&self, journey_id: Uuid) -> Result<Option<Journey>, StoreError> {
        Ok(self.inner.read().await.journeys.get(&journey_id).cloned())
    }

    async fn set_journey_status(
        &self,
        journey_id: Uuid,
        status: JourneyStatus,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        match inner.journeys.get_mut(&journey_id) {
            Some(journey) => {
                journey.status = status;
                Ok(())
            }
            None => Err(StoreError::Corrupt(format!("journey {journey_id} vanished"))),
        }
    }

    async fn get_latest_snapshot(
        &self,
        journey_id: Uuid,
        competency_slug: &str,
    ) -> Result<Option<CompetencySnapshot>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .snapshots
            .get(&(journey_id, competency_slug.to_string()))
            .and_then(|h| h.last().cloned()))
    }

    async fn list_latest_snapshots(
        &self,
        journey_id: Uuid,
    ) -> Result<Vec<CompetencySnapshot>, StoreError> {
        let inner = self.inner.read().await;
        let mut latest: Vec<CompetencySnapshot> = inner
            .snapshots
            .iter()
            .filter(|((j, _), _)| *j == journey_id)
            .filter_map(|(_, h)| h.last().cloned())
            .collect();
        latest.sort_by(|a, b| a.competency_slug.cmp(&b.competency_slug));
        Ok(latest)
    }

    async fn snapshot_history(
        &self,
        journey_id: Uuid,
        competency_slug: &str,
    ) -> Result<Vec<CompetencySnapshot>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .snapshots
            .get(&(journey_id, competency_slug.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn save_snapshot(&self, snapshot: &CompetencySnapshot) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let history = inner
            .snapshots
            .entry((snapshot.journey_id, snapshot.competency_slug.clone()))
            .or_default();
        let current = history.last().map_or(0, |s| s.evidence_count);
        if snapshot.evidence_count != current + 1 {
            return Err(StoreError::Conflict(format!(
                "snapshot {} for '{}' is stale (latest is {})",
                snapshot.evidence_count, snapshot.competency_slug, current
            )));
        }
        history.push(snapshot.clone());
        Ok(())
    }

    async fn get_completed_sprint_count(&self, journey_id: Uuid) -> Result<u32, StoreError> {
        let inner = self.inner.read().await;
        let Some(journey) = inner.journeys.get(&journey_id) else {
            return Ok(0);
        };
        Ok(inner
            .transitions
            .get(&journey.workspace_id)
            .map_or(0, |h| h.iter().filter(|t| t.completes_sprint()).count() as u32))
    }

    async fn get_current_phase(
        &self,
        workspace_id: Uuid,
    ) -> Result<Option<PhaseState>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .transitions
            .get(&workspace_id)
            .and_then(|h| h.last())
            .map(|t| PhaseState::default().apply(t)))
    }

    async fn save_phase_transition(
        &self,
        workspace_id: Uuid,
        transition: &PhaseTransition,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let history = inner.transitions.entry(workspace_id).or_default();
        let current = history.last().map_or(0, |t| t.sequence);
        if transition.sequence != current + 1 {
            return Err(StoreError::Conflict(format!(
                "phase transition {} for workspace {workspace_id} is stale (latest is {current})",
                transition.sequence
            )));
        }
        history.push(transition.clone());
        Ok(())
    }

    async fn phase_history(&self, workspace_id: Uuid) -> Result<Vec<PhaseTransition>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .transitions
            .get(&workspace_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_sprint(&self, workspace_id: Uuid, sprint: &Sprint) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let key = (workspace_id, sprint.number);
        if inner.sprints.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "sprint {} for workspace {workspace_id} already has a board",
                sprint.number
            )));
        }
        inner.sprints.insert(key, sprint.clone());
        Ok(())
    }

    async fn get_sprint(
        &self,
        workspace_id: Uuid,
        sprint_number: u32,
    ) -> Result<Option<Sprint>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .sprints
            .get(&(workspace_id, sprint_number))
            .cloned())
    }

    async fn save_sprint(&self, workspace_id: Uuid, sprint: &Sprint) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let Some(stored) = inner.sprints.get_mut(&(workspace_id, sprint.number)) else {
            return Err(StoreError::Corrupt(format!(
                "sprint {} for workspace {workspace_id} vanished",
                sprint.number
            )));
        };
        if sprint.version != stored.version + 1 {
            return Err(StoreError::Conflict(format!(
                "sprint {} board version {} is stale (latest is {})",
                sprint.number, sprint.version, stored.version
            )));
        }
        *stored = sprint.clone();
        Ok(())
    }
}
