use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::progression::bands::{Band, BandThresholds};
use crate::progression::models::CompetencySnapshot;
use crate::progression::policy::ProgressionConfig;

const DEFAULT_WEIGHT: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetencyReadiness {
    pub competency_slug: String,
    pub score: f64,
    pub band: Band,
    pub weight: f64,
}

/// Weighted roll-up of a journey's current competency snapshots. Derived on
/// demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessScore {
    /// 0–100, truncated to one decimal for display.
    pub overall: f64,
    /// Untruncated average. Threshold checks and the exit gate compare this.
    #[serde(skip)]
    pub exact: f64,
    pub threshold: Option<f64>,
    pub threshold_met: bool,
    pub competencies: Vec<CompetencyReadiness>,
}

#[derive(Debug, Clone)]
pub struct ReadinessCalculator {
    role_weights: BTreeMap<String, BTreeMap<String, f64>>,
    bands: BandThresholds,
}

impl ReadinessCalculator {
    pub fn new(config: &ProgressionConfig) -> Self {
        Self {
            role_weights: config.role_weights.clone(),
            bands: config.bands,
        }
    }

    /// Weight of a competency for a role. No role, an unknown role, or a
    /// competency the role table leaves out all weigh 1.0.
    pub fn weight_for(&self, role: Option<&str>, competency_slug: &str) -> f64 {
        role.and_then(|r| self.role_weights.get(r))
            .and_then(|table| table.get(competency_slug))
            .copied()
            .unwrap_or(DEFAULT_WEIGHT)
    }

    /// Pure function of the snapshot set: the result does not depend on the
    /// order snapshots arrive in. An empty set scores 0.
    pub fn compute(
        &self,
        snapshots: &[CompetencySnapshot],
        role: Option<&str>,
        threshold: Option<f64>,
    ) -> ReadinessScore {
        // Keep the latest snapshot per competency, iterate in slug order so the
        // float sum is order-independent.
        let mut latest: BTreeMap<&str, &CompetencySnapshot> = BTreeMap::new();
        for s in snapshots {
            latest
                .entry(s.competency_slug.as_str())
                .and_modify(|cur| {
                    if s.evidence_count > cur.evidence_count {
                        *cur = s;
                    }
                })
                .or_insert(s);
        }

        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;
        let competencies: Vec<CompetencyReadiness> = latest
            .into_values()
            .map(|s| {
                let score = s.score.clamp(0.0, 100.0);
                let weight = self.weight_for(role, &s.competency_slug);
                weighted_sum += score * weight;
                total_weight += weight;
                CompetencyReadiness {
                    competency_slug: s.competency_slug.clone(),
                    score,
                    band: self.bands.band_for(score),
                    weight,
                }
            })
            .collect();

        let exact = if total_weight > 0.0 {
            (weighted_sum / total_weight).clamp(0.0, 100.0)
        } else {
            0.0
        };

        ReadinessScore {
            overall: truncate1(exact),
            exact,
            threshold,
            threshold_met: threshold.is_some_and(|t| exact >= t),
            competencies,
        }
    }
}

/// Never rounds up, so a displayed score cannot overstate readiness.
pub fn truncate1(value: f64) -> f64 {
    (value * 10.0).floor() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::evidence::EvidenceSource;
    use crate::progression::policy::fixtures::test_config;
    use chrono::Utc;
    use uuid::Uuid;

    fn snap(slug: &str, score: f64, count: u32) -> CompetencySnapshot {
        CompetencySnapshot {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            journey_id: Uuid::nil(),
            competency_slug: slug.to_string(),
            score,
            band: BandThresholds::default().band_for(score),
            evidence_count: count,
            source: EvidenceSource::Workspace,
            evidence_type: "ticket_completed".to_string(),
            recorded_at: Utc::now(),
        }
    }

    fn calculator() -> ReadinessCalculator {
        ReadinessCalculator::new(&test_config())
    }

    #[test]
    fn test_empty_set_is_zero() {
        let r = calculator().compute(&[], None, Some(85.0));
        assert_eq!(r.overall, 0.0);
        assert!(!r.threshold_met);
        assert!(r.competencies.is_empty());
    }

    #[test]
    fn test_uniform_average_without_role() {
        let r = calculator().compute(&[snap("debugging", 80.0, 1), snap("testing", 60.0, 1)], None, None);
        assert_eq!(r.overall, 70.0);
        assert!(!r.threshold_met);
    }

    #[test]
    fn test_role_weights_applied() {
        // developer: debugging 3.0, communication 1.0
        // (90 × 3 + 50 × 1) / 4 = 80
        let r = calculator().compute(
            &[snap("debugging", 90.0, 2), snap("communication", 50.0, 1)],
            Some("developer"),
            Some(85.0),
        );
        assert_eq!(r.overall, 80.0);
        assert!(!r.threshold_met);
    }

    #[test]
    fn test_unknown_role_is_uniform() {
        let snaps = [snap("debugging", 90.0, 1), snap("communication", 50.0, 1)];
        let c = calculator();
        assert_eq!(c.compute(&snaps, Some("astronaut"), None).overall, 70.0);
        assert_eq!(c.weight_for(Some("developer"), "testing"), 1.0);
    }

    #[test]
    fn test_order_independent() {
        let c = calculator();
        let a = [
            snap("debugging", 33.33, 1),
            snap("testing", 66.67, 1),
            snap("communication", 91.1, 1),
        ];
        let mut b = a.clone();
        b.reverse();
        assert_eq!(
            c.compute(&a, Some("developer"), Some(85.0)),
            c.compute(&b, Some("developer"), Some(85.0))
        );
    }

    #[test]
    fn test_latest_snapshot_per_competency_wins() {
        let r = calculator().compute(
            &[snap("debugging", 95.0, 3), snap("debugging", 40.0, 1)],
            None,
            Some(85.0),
        );
        assert_eq!(r.competencies.len(), 1);
        assert_eq!(r.overall, 95.0);
        assert!(r.threshold_met);
        assert_eq!(r.competencies[0].band, Band::JuniorReady);
    }

    #[test]
    fn test_just_below_threshold_is_not_met() {
        let r = calculator().compute(&[snap("debugging", 84.96, 4)], None, Some(85.0));
        assert!(!r.threshold_met);
        assert_eq!(r.overall, 84.9);
        assert_eq!(r.exact, 84.96);
    }

    #[test]
    fn test_overall_is_truncated_not_rounded() {
        let r = calculator().compute(
            &[snap("debugging", 12.39, 1), snap("testing", 12.39, 1)],
            None,
            None,
        );
        assert_eq!(r.overall, 12.3);
    }
}
