//! Progression service: the calls the HTTP layer makes into the engine.
//!
//! Writes (evidence, phase advance, graduation) return a plain result; anything
//! that needs to react to them lives with the caller.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::progression::aggregator::CompetencyAggregator;
use crate::progression::errors::ProgressionError;
use crate::progression::evidence::Evidence;
use crate::progression::exit_gate::{evaluate_exit, ExitEligibility};
use crate::progression::journey::{derive_arcs, Journey, JourneyArc, JourneyStatus};
use crate::progression::models::{CompetencySnapshot, DeltaResult};
use crate::progression::phase::{
    check_phase_access, PhaseAccess, PhaseState, PhaseTracker, PhaseTransition, WorkspacePhase,
};
use crate::progression::policy::ProgressionConfig;
use crate::progression::readiness::{ReadinessCalculator, ReadinessScore};
use crate::progression::sprint::{Sprint, Ticket};
use crate::progression::store::ProgressStore;

#[derive(Debug, Clone, Deserialize)]
pub struct NewJourney {
    pub user_id: Uuid,
    pub path_slug: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseStatus {
    pub workspace_id: Uuid,
    pub current: PhaseState,
    pub completed_sprints: u32,
    pub history: Vec<PhaseTransition>,
    pub arcs: Vec<JourneyArc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTicket {
    pub id: String,
    pub title: String,
    pub competency_slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSprint {
    pub theme: String,
    pub goal: String,
    pub tickets: Vec<NewTicket>,
}

/// Board after a ticket move, plus the competency update when the ticket
/// landed in `done`.
#[derive(Debug, Clone, Serialize)]
pub struct TicketAdvance {
    pub sprint: Sprint,
    pub delta: Option<DeltaResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraduationOutcome {
    pub journey: Journey,
    pub eligibility: ExitEligibility,
}

#[derive(Clone)]
pub struct ProgressionService {
    config: Arc<ProgressionConfig>,
    store: Arc<dyn ProgressStore>,
    aggregator: CompetencyAggregator,
    readiness: ReadinessCalculator,
}

impl ProgressionService {
    pub fn new(config: Arc<ProgressionConfig>, store: Arc<dyn ProgressStore>) -> Self {
        Self {
            aggregator: CompetencyAggregator::new(config.clone(), store.clone()),
            readiness: ReadinessCalculator::new(&config),
            config,
            store,
        }
    }

    pub async fn create_journey(&self, req: NewJourney) -> Result<Journey, ProgressionError> {
        if self.config.path(&req.path_slug).is_none() {
            return Err(ProgressionError::UnknownPath(req.path_slug));
        }
        let journey = Journey::new(req.user_id, req.path_slug, req.role);
        self.store.create_journey(&journey).await?;
        info!(
            "Created journey {} for user {} on path {}",
            journey.id, journey.user_id, journey.path_slug
        );
        Ok(journey)
    }

    pub async fn journey(&self, journey_id: Uuid) -> Result<Journey, ProgressionError> {
        self.store
            .get_journey(journey_id)
            .await?
            .ok_or(ProgressionError::JourneyNotFound(journey_id))
    }

    async fn active_journey(&self, journey_id: Uuid) -> Result<Journey, ProgressionError> {
        let journey = self.journey(journey_id).await?;
        if !journey.is_active() {
            return Err(ProgressionError::JourneyClosed(journey_id));
        }
        Ok(journey)
    }

    pub async fn record_evidence(
        &self,
        journey_id: Uuid,
        evidence: &Evidence,
    ) -> Result<DeltaResult, ProgressionError> {
        let journey = self.active_journey(journey_id).await?;
        self.aggregator
            .record_evidence(journey.user_id, journey.id, evidence)
            .await
    }

    pub async fn competencies(
        &self,
        journey_id: Uuid,
    ) -> Result<Vec<CompetencySnapshot>, ProgressionError> {
        let journey = self.journey(journey_id).await?;
        Ok(self.store.list_latest_snapshots(journey.id).await?)
    }

    pub async fn competency_history(
        &self,
        journey_id: Uuid,
        competency_slug: &str,
    ) -> Result<Vec<CompetencySnapshot>, ProgressionError> {
        if self.config.competency(competency_slug).is_none() {
            return Err(ProgressionError::UnknownCompetency(competency_slug.to_string()));
        }
        let journey = self.journey(journey_id).await?;
        Ok(self.store.snapshot_history(journey.id, competency_slug).await?)
    }

    pub async fn readiness(&self, journey_id: Uuid) -> Result<ReadinessScore, ProgressionError> {
        let journey = self.journey(journey_id).await?;
        self.readiness_for(&journey).await
    }

    async fn readiness_for(&self, journey: &Journey) -> Result<ReadinessScore, ProgressionError> {
        let snapshots = self.store.list_latest_snapshots(journey.id).await?;
        let threshold = self
            .config
            .path(&journey.path_slug)
            .map(|p| p.readiness_threshold);
        Ok(self
            .readiness
            .compute(&snapshots, journey.role.as_deref(), threshold))
    }

    pub async fn exit_eligibility(
        &self,
        journey_id: Uuid,
    ) -> Result<ExitEligibility, ProgressionError> {
        let journey = self.journey(journey_id).await?;
        self.eligibility_for(&journey).await
    }

    async fn eligibility_for(&self, journey: &Journey) -> Result<ExitEligibility, ProgressionError> {
        let readiness = self.readiness_for(journey).await?;
        let completed = self.store.get_completed_sprint_count(journey.id).await?;
        Ok(evaluate_exit(
            completed,
            readiness.exact,
            self.config.path(&journey.path_slug),
        ))
    }

    /// Ends the journey when the gate allows it. Otherwise nothing changes.
    pub async fn graduate(&self, journey_id: Uuid) -> Result<GraduationOutcome, ProgressionError> {
        let mut journey = self.active_journey(journey_id).await?;
        let eligibility = self.eligibility_for(&journey).await?;
        if !eligibility.can_exit {
            return Err(ProgressionError::NotEligible(eligibility.message));
        }
        self.store
            .set_journey_status(journey.id, JourneyStatus::Graduated)
            .await?;
        journey.status = JourneyStatus::Graduated;
        info!(
            "Journey {} graduated after {} sprints ({:?})",
            journey.id, eligibility.completed_sprints, eligibility.recommendation
        );
        Ok(GraduationOutcome {
            journey,
            eligibility,
        })
    }

    pub async fn phase_status(&self, journey_id: Uuid) -> Result<PhaseStatus, ProgressionError> {
        let journey = self.journey(journey_id).await?;
        let history = self.store.phase_history(journey.workspace_id).await?;
        let tracker = PhaseTracker::from_history(history)?;
        let max_sprints = self.config.path(&journey.path_slug).map(|p| p.max_sprints);
        Ok(PhaseStatus {
            workspace_id: journey.workspace_id,
            current: tracker.state,
            completed_sprints: tracker.completed_sprints(),
            arcs: derive_arcs(&tracker.state, journey.status, max_sprints),
            history: tracker.history,
        })
    }

    /// Moves the workspace one phase forward. A `target` other than the
    /// immediate next phase is rejected before anything is written.
    pub async fn advance_phase(
        &self,
        journey_id: Uuid,
        target: Option<WorkspacePhase>,
    ) -> Result<PhaseTransition, ProgressionError> {
        let journey = self.active_journey(journey_id).await?;
        let current = self
            .store
            .get_current_phase(journey.workspace_id)
            .await?
            .unwrap_or_default();
        let transition = current.plan_advance(target, Utc::now())?;
        self.store
            .save_phase_transition(journey.workspace_id, &transition)
            .await?;
        info!(
            "Workspace {} advanced {} -> {} (sprint {})",
            journey.workspace_id, transition.from, transition.to, transition.sprint_number
        );
        Ok(transition)
    }

    pub async fn check_phase(
        &self,
        journey_id: Uuid,
        required: WorkspacePhase,
    ) -> Result<PhaseAccess, ProgressionError> {
        let journey = self.journey(journey_id).await?;
        let current = self
            .store
            .get_current_phase(journey.workspace_id)
            .await?
            .unwrap_or_default();
        Ok(check_phase_access(current.phase, required))
    }

    /// Sprint the workspace is in. Onboarding has none.
    async fn running_sprint_number(&self, journey: &Journey) -> Result<u32, ProgressionError> {
        let current = self
            .store
            .get_current_phase(journey.workspace_id)
            .await?
            .unwrap_or_default();
        if current.sprint_number == 0 {
            return Err(ProgressionError::NoActiveSprint(journey.id));
        }
        Ok(current.sprint_number)
    }

    async fn running_board(&self, journey: &Journey) -> Result<Sprint, ProgressionError> {
        let number = self.running_sprint_number(journey).await?;
        self.store
            .get_sprint(journey.workspace_id, number)
            .await?
            .ok_or(ProgressionError::SprintNotFound(number))
    }

    /// Opens the board for the sprint the workspace is in. Every ticket must
    /// be tagged with a known competency.
    pub async fn start_sprint(
        &self,
        journey_id: Uuid,
        req: NewSprint,
    ) -> Result<Sprint, ProgressionError> {
        let journey = self.active_journey(journey_id).await?;
        let number = self.running_sprint_number(&journey).await?;

        let mut tickets: Vec<Ticket> = Vec::with_capacity(req.tickets.len());
        for t in req.tickets {
            if self.config.competency(&t.competency_slug).is_none() {
                return Err(ProgressionError::UnknownCompetency(t.competency_slug));
            }
            if tickets.iter().any(|existing| existing.id == t.id) {
                return Err(ProgressionError::DuplicateTicket(t.id));
            }
            tickets.push(Ticket::new(t.id, t.title, t.competency_slug));
        }

        let sprint = Sprint::new(number, req.theme, req.goal, tickets);
        self.store.create_sprint(journey.workspace_id, &sprint).await?;
        info!(
            "Opened sprint {} board for workspace {} with {} tickets",
            number,
            journey.workspace_id,
            sprint.tickets.len()
        );
        Ok(sprint)
    }

    pub async fn current_sprint(&self, journey_id: Uuid) -> Result<Sprint, ProgressionError> {
        let journey = self.journey(journey_id).await?;
        self.running_board(&journey).await
    }

    pub async fn advance_sprint_day(&self, journey_id: Uuid) -> Result<Sprint, ProgressionError> {
        let journey = self.active_journey(journey_id).await?;
        let mut sprint = self.running_board(&journey).await?;
        sprint.advance_day()?;
        self.store.save_sprint(journey.workspace_id, &sprint).await?;
        Ok(sprint)
    }

    /// Moves a ticket one column. A ticket reaching `done` is recorded as
    /// workspace evidence after the board is saved; a conflict on either
    /// write is returned as-is.
    pub async fn advance_ticket(
        &self,
        journey_id: Uuid,
        ticket_id: &str,
    ) -> Result<TicketAdvance, ProgressionError> {
        let journey = self.active_journey(journey_id).await?;
        let mut sprint = self.running_board(&journey).await?;
        let evidence = sprint.advance_ticket(ticket_id)?;
        self.store.save_sprint(journey.workspace_id, &sprint).await?;

        let delta = match evidence {
            Some(evidence) => Some(
                self.aggregator
                    .record_evidence(journey.user_id, journey.id, &evidence)
                    .await?,
            ),
            None => None,
        };
        if delta.is_some() {
            let (done, total) = sprint.progress();
            info!(
                "Ticket {ticket_id} done on sprint {} of journey {} ({done}/{total})",
                sprint.number, journey.id
            );
        }
        Ok(TicketAdvance { sprint, delta })
    }
}
