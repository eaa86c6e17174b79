//! Axum route handlers for the Journey API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::progression::evidence::Evidence;
use crate::progression::exit_gate::ExitEligibility;
use crate::progression::journey::Journey;
use crate::progression::models::{CompetencySnapshot, DeltaResult};
use crate::progression::phase::{PhaseAccess, PhaseTransition, WorkspacePhase};
use crate::progression::policy::{CompetencyDef, ProgressionPath};
use crate::progression::readiness::ReadinessScore;
use crate::progression::service::{
    GraduationOutcome, NewJourney, NewSprint, PhaseStatus, TicketAdvance,
};
use crate::progression::sprint::Sprint;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AdvancePhaseRequest {
    #[serde(default)]
    pub target: Option<WorkspacePhase>,
}

#[derive(Debug, Deserialize)]
pub struct PhaseGuardQuery {
    pub required: WorkspacePhase,
}

#[derive(Debug, Serialize)]
pub struct CompetencyListResponse {
    pub journey_id: Uuid,
    pub competencies: Vec<CompetencySnapshot>,
}

/// POST /api/v1/journeys
pub async fn handle_create_journey(
    State(state): State<AppState>,
    Json(req): Json<NewJourney>,
) -> Result<(StatusCode, Json<Journey>), AppError> {
    if req.path_slug.trim().is_empty() {
        return Err(AppError::Validation("path_slug cannot be empty".to_string()));
    }
    let journey = state.progression.create_journey(req).await?;
    Ok((StatusCode::CREATED, Json(journey)))
}

/// GET /api/v1/journeys/:id
pub async fn handle_get_journey(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Journey>, AppError> {
    Ok(Json(state.progression.journey(id).await?))
}

/// POST /api/v1/journeys/:id/evidence
pub async fn handle_record_evidence(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(evidence): Json<Evidence>,
) -> Result<Json<DeltaResult>, AppError> {
    Ok(Json(state.progression.record_evidence(id, &evidence).await?))
}

/// GET /api/v1/journeys/:id/competencies
pub async fn handle_list_competencies(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CompetencyListResponse>, AppError> {
    let competencies = state.progression.competencies(id).await?;
    Ok(Json(CompetencyListResponse {
        journey_id: id,
        competencies,
    }))
}

/// GET /api/v1/journeys/:id/competencies/:slug/history
pub async fn handle_competency_history(
    State(state): State<AppState>,
    Path((id, slug)): Path<(Uuid, String)>,
) -> Result<Json<Vec<CompetencySnapshot>>, AppError> {
    Ok(Json(state.progression.competency_history(id, &slug).await?))
}

/// GET /api/v1/journeys/:id/readiness
pub async fn handle_readiness(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReadinessScore>, AppError> {
    Ok(Json(state.progression.readiness(id).await?))
}

/// GET /api/v1/journeys/:id/exit-eligibility
pub async fn handle_exit_eligibility(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExitEligibility>, AppError> {
    Ok(Json(state.progression.exit_eligibility(id).await?))
}

/// POST /api/v1/journeys/:id/graduate
pub async fn handle_graduate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GraduationOutcome>, AppError> {
    Ok(Json(state.progression.graduate(id).await?))
}

/// GET /api/v1/journeys/:id/phase
pub async fn handle_phase_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PhaseStatus>, AppError> {
    Ok(Json(state.progression.phase_status(id).await?))
}

/// POST /api/v1/journeys/:id/phase/advance
pub async fn handle_advance_phase(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AdvancePhaseRequest>,
) -> Result<Json<PhaseTransition>, AppError> {
    Ok(Json(state.progression.advance_phase(id, req.target).await?))
}

/// GET /api/v1/journeys/:id/phase/guard?required=<phase>
///
/// Advisory only: `locked` and `already_completed` are normal 200 responses.
pub async fn handle_phase_guard(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<PhaseGuardQuery>,
) -> Result<Json<PhaseAccess>, AppError> {
    Ok(Json(state.progression.check_phase(id, params.required).await?))
}

/// POST /api/v1/journeys/:id/sprint
pub async fn handle_start_sprint(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<NewSprint>,
) -> Result<(StatusCode, Json<Sprint>), AppError> {
    if req.tickets.iter().any(|t| t.id.trim().is_empty()) {
        return Err(AppError::Validation("ticket id cannot be empty".to_string()));
    }
    let sprint = state.progression.start_sprint(id, req).await?;
    Ok((StatusCode::CREATED, Json(sprint)))
}

/// GET /api/v1/journeys/:id/sprint
pub async fn handle_current_sprint(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Sprint>, AppError> {
    Ok(Json(state.progression.current_sprint(id).await?))
}

/// POST /api/v1/journeys/:id/sprint/day
pub async fn handle_advance_sprint_day(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Sprint>, AppError> {
    Ok(Json(state.progression.advance_sprint_day(id).await?))
}

/// POST /api/v1/journeys/:id/sprint/tickets/:ticket_id/advance
pub async fn handle_advance_ticket(
    State(state): State<AppState>,
    Path((id, ticket_id)): Path<(Uuid, String)>,
) -> Result<Json<TicketAdvance>, AppError> {
    Ok(Json(state.progression.advance_ticket(id, &ticket_id).await?))
}

#[derive(Debug, Serialize)]
pub struct CatalogueResponse {
    pub competencies: Vec<CompetencyDef>,
    pub paths: Vec<ProgressionPath>,
    pub roles: Vec<String>,
}

/// GET /api/v1/catalogue
pub async fn handle_catalogue(State(state): State<AppState>) -> Json<CatalogueResponse> {
    Json(CatalogueResponse {
        competencies: state.policy.competencies.clone(),
        paths: state.policy.paths.clone(),
        roles: state.policy.role_weights.keys().cloned().collect(),
    })
}
