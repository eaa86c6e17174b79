use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::progression::errors::ProgressionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSource {
    Workspace,
    Interview,
    Negotiation,
    SoftSkill,
}

impl EvidenceSource {
    pub fn as_str(self) -> &'static str {
        match self {
            EvidenceSource::Workspace => "workspace",
            EvidenceSource::Interview => "interview",
            EvidenceSource::Negotiation => "negotiation",
            EvidenceSource::SoftSkill => "soft_skill",
        }
    }
}

impl fmt::Display for EvidenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvidenceSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "workspace" => Ok(EvidenceSource::Workspace),
            "interview" => Ok(EvidenceSource::Interview),
            "negotiation" => Ok(EvidenceSource::Negotiation),
            "soft_skill" => Ok(EvidenceSource::SoftSkill),
            other => Err(format!("unknown evidence source '{other}'")),
        }
    }
}

/// One piece of evidence about a competency, tagged by the activity that
/// produced it. Each variant carries only what that activity knows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Evidence {
    Workspace {
        competency_slug: String,
        evidence_type: String,
        #[serde(default)]
        score: Option<f64>,
        #[serde(default)]
        activity_id: Option<i64>,
    },
    Interview {
        competency_slug: String,
        #[serde(default)]
        question_id: Option<i64>,
        score: f64,
    },
    Negotiation {
        competency_slug: String,
        #[serde(default)]
        round: Option<u32>,
        score: f64,
    },
    SoftSkill {
        competency_slug: String,
        evidence_type: String,
        #[serde(default)]
        score: Option<f64>,
    },
}

impl Evidence {
    pub fn source(&self) -> EvidenceSource {
        match self {
            Evidence::Workspace { .. } => EvidenceSource::Workspace,
            Evidence::Interview { .. } => EvidenceSource::Interview,
            Evidence::Negotiation { .. } => EvidenceSource::Negotiation,
            Evidence::SoftSkill { .. } => EvidenceSource::SoftSkill,
        }
    }

    pub fn competency_slug(&self) -> &str {
        match self {
            Evidence::Workspace {
                competency_slug, ..
            }
            | Evidence::Interview {
                competency_slug, ..
            }
            | Evidence::Negotiation {
                competency_slug, ..
            }
            | Evidence::SoftSkill {
                competency_slug, ..
            } => competency_slug,
        }
    }

    pub fn evidence_type(&self) -> &str {
        match self {
            Evidence::Workspace { evidence_type, .. } | Evidence::SoftSkill { evidence_type, .. } => {
                evidence_type
            }
            Evidence::Interview { .. } => "interview_answer",
            Evidence::Negotiation { .. } => "negotiation_round",
        }
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            Evidence::Workspace { score, .. } | Evidence::SoftSkill { score, .. } => *score,
            Evidence::Interview { score, .. } | Evidence::Negotiation { score, .. } => Some(*score),
        }
    }

    /// Boundary check run before the aggregator reads or writes anything.
    pub fn validate(&self) -> Result<(), ProgressionError> {
        if self.competency_slug().trim().is_empty() {
            return Err(ProgressionError::UnknownCompetency(String::new()));
        }
        if let Some(score) = self.score() {
            if !score.is_finite() || !(0.0..=100.0).contains(&score) {
                return Err(ProgressionError::InvalidScore(score));
            }
        }
        Ok(())
    }
}
