use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::progression::bands::Band;
use crate::progression::evidence::EvidenceSource;

/// Confidence in one competency for one journey after `evidence_count`
/// evidence items. Snapshots are append-only; the one with the highest
/// `evidence_count` is current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetencySnapshot {
    pub id: Uuid,
    pub user_id: Uuid,
    pub journey_id: Uuid,
    pub competency_slug: String,
    pub score: f64,
    pub band: Band,
    pub evidence_count: u32,
    pub source: EvidenceSource,
    pub evidence_type: String,
    pub recorded_at: DateTime<Utc>,
}

/// What one `record_evidence` call changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaResult {
    pub competency_slug: String,
    pub previous_band: Band,
    pub new_band: Band,
    pub band_changed: bool,
    pub previous_confidence: f64,
    pub new_confidence: f64,
    pub evidence_count: u32,
}
