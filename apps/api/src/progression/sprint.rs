//! Sprint board: a fixed-length block of simulated work and its tickets.
//!
//! Tickets only move forward, one column at a time. A ticket reaching `done`
//! produces workspace evidence for the competency it is tagged with.
//!
//! Every successful move bumps `version`; the store only accepts a board
//! whose version directly follows the stored one.

use serde::{Deserialize, Serialize};

use crate::progression::errors::ProgressionError;
use crate::progression::evidence::Evidence;

pub const SPRINT_LENGTH_DAYS: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Todo,
    InProgress,
    InReview,
    Done,
}

impl TicketStatus {
    pub fn next(self) -> Option<TicketStatus> {
        match self {
            TicketStatus::Todo => Some(TicketStatus::InProgress),
            TicketStatus::InProgress => Some(TicketStatus::InReview),
            TicketStatus::InReview => Some(TicketStatus::Done),
            TicketStatus::Done => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub title: String,
    pub competency_slug: String,
    pub status: TicketStatus,
}

impl Ticket {
    pub fn new(id: impl Into<String>, title: impl Into<String>, competency: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            competency_slug: competency.into(),
            status: TicketStatus::Todo,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprint {
    pub number: u32,
    pub theme: String,
    pub goal: String,
    /// 1..=SPRINT_LENGTH_DAYS
    pub day: u8,
    pub tickets: Vec<Ticket>,
    pub version: u32,
}

impl Sprint {
    pub fn new(number: u32, theme: impl Into<String>, goal: impl Into<String>, tickets: Vec<Ticket>) -> Self {
        Self {
            number,
            theme: theme.into(),
            goal: goal.into(),
            day: 1,
            tickets,
            version: 1,
        }
    }

    pub fn is_last_day(&self) -> bool {
        self.day >= SPRINT_LENGTH_DAYS
    }

    pub fn advance_day(&mut self) -> Result<u8, ProgressionError> {
        if self.is_last_day() {
            return Err(ProgressionError::SprintOver(self.number));
        }
        self.day += 1;
        self.version += 1;
        Ok(self.day)
    }

    /// Moves a ticket one column to the right.
    ///
    /// Returns the evidence to record when the ticket lands in `done`.
    pub fn advance_ticket(&mut self, ticket_id: &str) -> Result<Option<Evidence>, ProgressionError> {
        let ticket = self
            .tickets
            .iter_mut()
            .find(|t| t.id == ticket_id)
            .ok_or_else(|| ProgressionError::TicketNotFound(ticket_id.to_string()))?;

        let next = ticket
            .status
            .next()
            .ok_or_else(|| ProgressionError::TicketAlreadyDone(ticket_id.to_string()))?;
        ticket.status = next;
        self.version += 1;

        if next != TicketStatus::Done {
            return Ok(None);
        }
        Ok(Some(Evidence::Workspace {
            competency_slug: ticket.competency_slug.clone(),
            evidence_type: "ticket_completed".to_string(),
            score: None,
            activity_id: None,
        }))
    }

    /// (done, total)
    pub fn progress(&self) -> (usize, usize) {
        let done = self
            .tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Done)
            .count();
        (done, self.tickets.len())
    }
}
