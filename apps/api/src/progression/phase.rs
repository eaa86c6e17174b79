//! Workspace phase tracker.
//!
//! A workspace moves `onboarding → planning → execution → review → retro`,
//! one step at a time. Leaving `retro` starts the next sprint at `planning`;
//! onboarding happens once per journey. Every move is recorded as a
//! [`PhaseTransition`] so the current state can always be replayed from the
//! audit trail.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::progression::errors::ProgressionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspacePhase {
    Onboarding,
    Planning,
    Execution,
    Review,
    Retro,
}

impl WorkspacePhase {
    pub fn index(self) -> usize {
        match self {
            WorkspacePhase::Onboarding => 0,
            WorkspacePhase::Planning => 1,
            WorkspacePhase::Execution => 2,
            WorkspacePhase::Review => 3,
            WorkspacePhase::Retro => 4,
        }
    }

    /// The only phase reachable from `self`. `retro` wraps to a new sprint.
    pub fn next(self) -> WorkspacePhase {
        match self {
            WorkspacePhase::Onboarding => WorkspacePhase::Planning,
            WorkspacePhase::Planning => WorkspacePhase::Execution,
            WorkspacePhase::Execution => WorkspacePhase::Review,
            WorkspacePhase::Review => WorkspacePhase::Retro,
            WorkspacePhase::Retro => WorkspacePhase::Planning,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkspacePhase::Onboarding => "onboarding",
            WorkspacePhase::Planning => "planning",
            WorkspacePhase::Execution => "execution",
            WorkspacePhase::Review => "review",
            WorkspacePhase::Retro => "retro",
        }
    }
}

impl fmt::Display for WorkspacePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkspacePhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "onboarding" => Ok(WorkspacePhase::Onboarding),
            "planning" => Ok(WorkspacePhase::Planning),
            "execution" => Ok(WorkspacePhase::Execution),
            "review" => Ok(WorkspacePhase::Review),
            "retro" => Ok(WorkspacePhase::Retro),
            other => Err(format!("unknown phase '{other}'")),
        }
    }
}

/// One entry of the phase audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTransition {
    /// 1-based position in the workspace's history.
    pub sequence: u32,
    pub from: WorkspacePhase,
    pub to: WorkspacePhase,
    /// Sprint the workspace is in after the transition (0 during onboarding).
    pub sprint_number: u32,
    pub at: DateTime<Utc>,
}

impl PhaseTransition {
    /// Leaving retro closes the sprint it belonged to.
    pub fn completes_sprint(&self) -> bool {
        self.from == WorkspacePhase::Retro
    }
}

/// Current position of a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseState {
    pub phase: WorkspacePhase,
    pub sprint_number: u32,
    /// Sequence of the last applied transition (0 for a fresh workspace).
    pub sequence: u32,
}

impl Default for PhaseState {
    fn default() -> Self {
        Self {
            phase: WorkspacePhase::Onboarding,
            sprint_number: 0,
            sequence: 0,
        }
    }
}

impl PhaseState {
    /// Builds the transition that moves this state one step forward.
    ///
    /// When `target` is given it must be the immediate next phase; skipping and
    /// moving backwards are rejected without touching anything.
    pub fn plan_advance(
        &self,
        target: Option<WorkspacePhase>,
        at: DateTime<Utc>,
    ) -> Result<PhaseTransition, ProgressionError> {
        let next = self.phase.next();
        if let Some(target) = target {
            validate_transition(self.phase, target)?;
        }
        let sprint_number = if next == WorkspacePhase::Planning {
            self.sprint_number + 1
        } else {
            self.sprint_number
        };
        Ok(PhaseTransition {
            sequence: self.sequence + 1,
            from: self.phase,
            to: next,
            sprint_number,
            at,
        })
    }

    pub fn apply(&self, transition: &PhaseTransition) -> PhaseState {
        PhaseState {
            phase: transition.to,
            sprint_number: transition.sprint_number,
            sequence: transition.sequence,
        }
    }
}

pub fn validate_transition(
    current: WorkspacePhase,
    target: WorkspacePhase,
) -> Result<(), ProgressionError> {
    let expected = current.next();
    if target != expected {
        return Err(ProgressionError::InvalidTransition {
            from: current,
            to: target,
            expected,
        });
    }
    Ok(())
}

/// In-memory view of a workspace: current state plus its full history.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PhaseTracker {
    pub state: PhaseState,
    pub history: Vec<PhaseTransition>,
}

impl PhaseTracker {
    /// Replays a stored history, checking that every step is a legal advance.
    pub fn from_history(history: Vec<PhaseTransition>) -> Result<Self, ProgressionError> {
        let mut state = PhaseState::default();
        for transition in &history {
            validate_transition(state.phase, transition.to)?;
            state = state.apply(transition);
        }
        Ok(Self { state, history })
    }

    pub fn completed_sprints(&self) -> u32 {
        self.history.iter().filter(|t| t.completes_sprint()).count() as u32
    }
}

/// Routing decision for a request that needs the workspace in a given phase.
/// Never mutates anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PhaseAccess {
    Allowed {
        current: WorkspacePhase,
    },
    Locked {
        current: WorkspacePhase,
        required: WorkspacePhase,
    },
    AlreadyCompleted {
        current: WorkspacePhase,
        required: WorkspacePhase,
    },
}

pub fn check_phase_access(current: WorkspacePhase, required: WorkspacePhase) -> PhaseAccess {
    use std::cmp::Ordering;

    match required.index().cmp(&current.index()) {
        Ordering::Equal => PhaseAccess::Allowed { current },
        Ordering::Greater => PhaseAccess::Locked { current, required },
        Ordering::Less => PhaseAccess::AlreadyCompleted { current, required },
    }
}
