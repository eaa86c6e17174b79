use thiserror::Error;
use uuid::Uuid;

use crate::progression::phase::WorkspacePhase;
use crate::progression::store::StoreError;

/// Coarse classification callers use to pick a response without matching
/// every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadInput,
    NotFound,
    Conflict,
    Storage,
}

/// Errors raised by the progression engine. None of them are fatal; every
/// validation failure is raised before anything is written.
#[derive(Debug, Error)]
pub enum ProgressionError {
    #[error("unknown competency '{0}'")]
    UnknownCompetency(String),

    #[error("score {0} is outside the range 0..=100")]
    InvalidScore(f64),

    #[error("cannot move from {from} to {to}; the next phase is {expected}")]
    InvalidTransition {
        from: WorkspacePhase,
        to: WorkspacePhase,
        expected: WorkspacePhase,
    },

    #[error("unknown progression path '{0}'")]
    UnknownPath(String),

    #[error("journey {0} has already graduated")]
    JourneyClosed(Uuid),

    #[error("journey cannot graduate yet: {0}")]
    NotEligible(String),

    #[error("sprint {0} is already on its last day")]
    SprintOver(u32),

    #[error("journey {0} is still onboarding; no sprint is running")]
    NoActiveSprint(Uuid),

    #[error("ticket '{0}' appears more than once")]
    DuplicateTicket(String),

    #[error("ticket '{0}' is already done")]
    TicketAlreadyDone(String),

    #[error("journey {0} not found")]
    JourneyNotFound(Uuid),

    #[error("ticket '{0}' not found")]
    TicketNotFound(String),

    #[error("sprint {0} has no board yet")]
    SprintNotFound(u32),

    #[error("concurrent update, retry: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(#[source] StoreError),
}

impl ProgressionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProgressionError::UnknownCompetency(_)
            | ProgressionError::InvalidScore(_)
            | ProgressionError::InvalidTransition { .. }
            | ProgressionError::UnknownPath(_)
            | ProgressionError::JourneyClosed(_)
            | ProgressionError::NotEligible(_)
            | ProgressionError::SprintOver(_)
            | ProgressionError::NoActiveSprint(_)
            | ProgressionError::DuplicateTicket(_)
            | ProgressionError::TicketAlreadyDone(_) => ErrorKind::BadInput,
            ProgressionError::JourneyNotFound(_)
            | ProgressionError::TicketNotFound(_)
            | ProgressionError::SprintNotFound(_) => ErrorKind::NotFound,
            ProgressionError::Conflict(_) => ErrorKind::Conflict,
            ProgressionError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Conflicts are safe to retry from the top; the engine never retries itself.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

impl From<StoreError> for ProgressionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => ProgressionError::Conflict(msg),
            other => ProgressionError::Storage(other),
        }
    }
}
