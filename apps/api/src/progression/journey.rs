use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::progression::phase::PhaseState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JourneyStatus {
    Active,
    /// Terminal. Reached only through the exit gate.
    Graduated,
}

impl JourneyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JourneyStatus::Active => "active",
            JourneyStatus::Graduated => "graduated",
        }
    }
}

impl fmt::Display for JourneyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JourneyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(JourneyStatus::Active),
            "graduated" => Ok(JourneyStatus::Graduated),
            other => Err(format!("unknown journey status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journey {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Each journey owns exactly one simulated workspace.
    pub workspace_id: Uuid,
    pub path_slug: String,
    pub role: Option<String>,
    pub status: JourneyStatus,
    pub created_at: DateTime<Utc>,
}

impl Journey {
    pub fn new(user_id: Uuid, path_slug: String, role: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            workspace_id: Uuid::new_v4(),
            path_slug,
            role,
            status: JourneyStatus::Active,
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == JourneyStatus::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArcStatus {
    NotStarted,
    InProgress,
    Completed,
}

/// An ordered phase of a journey: onboarding, then one arc per sprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyArc {
    pub order_index: u32,
    pub label: String,
    pub sprint_number: Option<u32>,
    pub status: ArcStatus,
}

/// Derives the arc list from the workspace position.
///
/// At most one arc is in progress. While the journey is active and the path
/// still allows another sprint, the upcoming sprint is listed as not started.
pub fn derive_arcs(
    state: &PhaseState,
    status: JourneyStatus,
    max_sprints: Option<u32>,
) -> Vec<JourneyArc> {
    let graduated = status == JourneyStatus::Graduated;
    let current = state.sprint_number;

    let mut arcs = Vec::with_capacity(current as usize + 2);
    arcs.push(JourneyArc {
        order_index: 0,
        label: "Onboarding".to_string(),
        sprint_number: None,
        status: if current == 0 && !graduated {
            ArcStatus::InProgress
        } else {
            ArcStatus::Completed
        },
    });

    for n in 1..=current {
        arcs.push(JourneyArc {
            order_index: n,
            label: format!("Sprint {n}"),
            sprint_number: Some(n),
            status: if n < current || graduated {
                ArcStatus::Completed
            } else {
                ArcStatus::InProgress
            },
        });
    }

    if !graduated && max_sprints.map_or(true, |max| current < max) {
        let n = current + 1;
        arcs.push(JourneyArc {
            order_index: n,
            label: format!("Sprint {n}"),
            sprint_number: Some(n),
            status: ArcStatus::NotStarted,
        });
    }

    arcs
}
