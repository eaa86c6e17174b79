//! Competency Aggregator: folds one evidence item into a journey's
//! per-competency confidence and persists the new snapshot.
//!
//! Blend (exponential moving average, `w` = `blend_weight`):
//!   new = clamp(old + w × (evidence − old), 0, 100), rounded to 2 decimals
//!
//! The aggregator reads then writes without holding a lock. The store rejects
//! a stale write with a conflict, which is returned as-is; retrying belongs
//! to the caller.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::progression::errors::ProgressionError;
use crate::progression::evidence::Evidence;
use crate::progression::models::{CompetencySnapshot, DeltaResult};
use crate::progression::policy::{BlendPolicy, ProgressionConfig};
use crate::progression::store::ProgressStore;

#[derive(Clone)]
pub struct CompetencyAggregator {
    config: Arc<ProgressionConfig>,
    store: Arc<dyn ProgressStore>,
}

impl CompetencyAggregator {
    pub fn new(config: Arc<ProgressionConfig>, store: Arc<dyn ProgressStore>) -> Self {
        Self { config, store }
    }

    pub async fn record_evidence(
        &self,
        user_id: Uuid,
        journey_id: Uuid,
        evidence: &Evidence,
    ) -> Result<DeltaResult, ProgressionError> {
        evidence.validate()?;
        let slug = evidence.competency_slug();
        if self.config.competency(slug).is_none() {
            return Err(ProgressionError::UnknownCompetency(slug.to_string()));
        }

        let previous = self.store.get_latest_snapshot(journey_id, slug).await?;
        let (previous_confidence, previous_count) = match &previous {
            Some(s) => (s.score, s.evidence_count),
            None => (self.config.blend.baseline_confidence, 0),
        };

        let evidence_score = resolve_evidence_score(&self.config.blend, evidence);
        let new_confidence =
            blend_confidence(previous_confidence, evidence_score, self.config.blend.blend_weight);

        let bands = &self.config.bands;
        let previous_band = bands.band_for(previous_confidence);
        let new_band = bands.band_for(new_confidence);

        let snapshot = CompetencySnapshot {
            id: Uuid::new_v4(),
            user_id,
            journey_id,
            competency_slug: slug.to_string(),
            score: new_confidence,
            band: new_band,
            evidence_count: previous_count + 1,
            source: evidence.source(),
            evidence_type: evidence.evidence_type().to_string(),
            recorded_at: Utc::now(),
        };
        self.store.save_snapshot(&snapshot).await?;

        debug!(
            "Recorded {} evidence '{}' for {slug} on journey {journey_id}: {previous_confidence} -> {new_confidence}",
            snapshot.source,
            snapshot.evidence_type
        );
        if previous_band != new_band {
            info!("Journey {journey_id} competency {slug} moved {previous_band} -> {new_band}");
        }

        Ok(DeltaResult {
            competency_slug: snapshot.competency_slug,
            previous_band,
            new_band,
            band_changed: previous_band != new_band,
            previous_confidence,
            new_confidence,
            evidence_count: snapshot.evidence_count,
        })
    }
}

/// Numeric score of an evidence item. Unscored evidence uses the policy's
/// qualitative table; an unlisted type contributes nothing.
pub fn resolve_evidence_score(policy: &BlendPolicy, evidence: &Evidence) -> Option<f64> {
    evidence
        .score()
        .or_else(|| policy.qualitative_scores.get(evidence.evidence_type()).copied())
}

/// Moves `previous` toward `evidence` by `weight` of the gap. `None` is neutral.
pub fn blend_confidence(previous: f64, evidence: Option<f64>, weight: f64) -> f64 {
    let previous = previous.clamp(0.0, 100.0);
    let blended = match evidence {
        Some(e) => previous + weight * (e.clamp(0.0, 100.0) - previous),
        None => previous,
    };
    ((blended * 100.0).round() / 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::bands::Band;
    use crate::progression::policy::fixtures::test_config;
    use crate::progression::evidence::EvidenceSource;
    use crate::progression::journey::{Journey, JourneyStatus};
    use crate::progression::phase::{PhaseState, PhaseTransition};
    use crate::progression::sprint::Sprint;
    use crate::progression::store::{MemoryProgressStore, StoreError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn aggregator() -> (CompetencyAggregator, Arc<MemoryProgressStore>) {
        let store = Arc::new(MemoryProgressStore::new());
        let agg = CompetencyAggregator::new(Arc::new(test_config()), store.clone());
        (agg, store)
    }

    fn interview(slug: &str, score: f64) -> Evidence {
        Evidence::Interview {
            competency_slug: slug.to_string(),
            question_id: None,
            score,
        }
    }

    #[test]
    fn test_blend_moves_toward_evidence() {
        // 30 + 0.3 × (80 − 30) = 45
        assert_eq!(blend_confidence(30.0, Some(80.0), 0.3), 45.0);
        // 50 + 0.3 × (10 − 50) = 38
        assert_eq!(blend_confidence(50.0, Some(10.0), 0.3), 38.0);
    }

    #[test]
    fn test_blend_neutral_evidence_keeps_score() {
        assert_eq!(blend_confidence(62.5, None, 0.3), 62.5);
    }

    #[test]
    fn test_blend_is_deterministic() {
        let a = blend_confidence(47.13, Some(91.0), 0.3);
        let b = blend_confidence(47.13, Some(91.0), 0.3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_blend_stays_in_range_at_extremes() {
        let mut score = 30.0;
        for _ in 0..200 {
            score = blend_confidence(score, Some(100.0), 1.0);
            assert!((0.0..=100.0).contains(&score));
        }
        assert_eq!(score, 100.0);
        for _ in 0..200 {
            score = blend_confidence(score, Some(0.0), 0.3);
            assert!((0.0..=100.0).contains(&score));
        }
        assert!(score < 1.0, "score was {score}");
    }

    #[test]
    fn test_qualitative_lookup() {
        let policy = test_config().blend;
        let completed = Evidence::Workspace {
            competency_slug: "debugging".to_string(),
            evidence_type: "ticket_completed".to_string(),
            score: None,
            activity_id: None,
        };
        assert_eq!(resolve_evidence_score(&policy, &completed), Some(70.0));

        let unlisted = Evidence::SoftSkill {
            competency_slug: "communication".to_string(),
            evidence_type: "waved_hello".to_string(),
            score: None,
        };
        assert_eq!(resolve_evidence_score(&policy, &unlisted), None);
    }

    #[tokio::test]
    async fn test_first_evidence_starts_from_baseline() {
        let (agg, _) = aggregator();
        let delta = agg
            .record_evidence(Uuid::new_v4(), Uuid::new_v4(), &interview("debugging", 80.0))
            .await
            .unwrap();
        assert_eq!(delta.previous_confidence, 30.0);
        assert_eq!(delta.previous_band, Band::Explorer);
        assert_eq!(delta.new_confidence, 45.0);
        assert_eq!(delta.new_band, Band::Contributor);
        assert!(delta.band_changed);
        assert_eq!(delta.evidence_count, 1);
    }

    #[tokio::test]
    async fn test_identical_inputs_give_identical_results() {
        let (a, _) = aggregator();
        let (b, _) = aggregator();
        let ev = interview("testing", 63.0);
        let da = a.record_evidence(Uuid::nil(), Uuid::nil(), &ev).await.unwrap();
        let db = b.record_evidence(Uuid::nil(), Uuid::nil(), &ev).await.unwrap();
        assert_eq!(da.new_confidence, db.new_confidence);
    }

    #[tokio::test]
    async fn test_evidence_count_increments_and_history_grows() {
        let (agg, store) = aggregator();
        let journey_id = Uuid::new_v4();
        for _ in 0..3 {
            agg.record_evidence(Uuid::nil(), journey_id, &interview("debugging", 90.0))
                .await
                .unwrap();
        }
        let latest = store
            .get_latest_snapshot(journey_id, "debugging")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.evidence_count, 3);
        assert_eq!(latest.band, agg.config.bands.band_for(latest.score));
        let history = store.snapshot_history(journey_id, "debugging").await.unwrap();
        assert_eq!(history.len(), 3);
        assert!(history.windows(2).all(|w| w[0].score <= w[1].score));
    }

    #[tokio::test]
    async fn test_repeated_zeros_stay_clamped() {
        let (agg, _) = aggregator();
        let journey_id = Uuid::new_v4();
        let mut last = None;
        for _ in 0..50 {
            let d = agg
                .record_evidence(Uuid::nil(), journey_id, &interview("testing", 0.0))
                .await
                .unwrap();
            assert!((0.0..=100.0).contains(&d.new_confidence));
            last = Some(d);
        }
        assert_eq!(last.unwrap().new_band, Band::Explorer);
    }

    #[tokio::test]
    async fn test_unknown_competency_writes_nothing() {
        let (agg, store) = aggregator();
        let journey_id = Uuid::new_v4();
        let err = agg
            .record_evidence(Uuid::nil(), journey_id, &interview("juggling", 50.0))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressionError::UnknownCompetency(ref s) if s == "juggling"));
        assert!(store.list_latest_snapshots(journey_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_score_writes_nothing() {
        let (agg, store) = aggregator();
        let journey_id = Uuid::new_v4();
        let err = agg
            .record_evidence(Uuid::nil(), journey_id, &interview("debugging", -5.0))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressionError::InvalidScore(_)));
        assert!(store.list_latest_snapshots(journey_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_neutral_evidence_counts_without_moving_score() {
        let (agg, _) = aggregator();
        let journey_id = Uuid::new_v4();
        let ev = Evidence::SoftSkill {
            competency_slug: "communication".to_string(),
            evidence_type: "waved_hello".to_string(),
            score: None,
        };
        let d = agg.record_evidence(Uuid::nil(), journey_id, &ev).await.unwrap();
        assert_eq!(d.previous_confidence, d.new_confidence);
        assert!(!d.band_changed);
        assert_eq!(d.evidence_count, 1);
    }

    /// Lets another writer land a snapshot between the aggregator's read and
    /// its write, once.
    struct RacingStore {
        inner: MemoryProgressStore,
        raced: AtomicBool,
    }

    #[async_trait]
    impl ProgressStore for RacingStore {
        async fn create_journey(&self, journey: &Journey) -> Result<(), StoreError> {
            self.inner.create_journey(journey).await
        }
        async fn get_journey(&self, id: Uuid) -> Result<Option<Journey>, StoreError> {
            self.inner.get_journey(id).await
        }
        async fn set_journey_status(&self, id: Uuid, status: JourneyStatus) -> Result<(), StoreError> {
            self.inner.set_journey_status(id, status).await
        }
        async fn get_latest_snapshot(
            &self,
            journey_id: Uuid,
            slug: &str,
        ) -> Result<Option<CompetencySnapshot>, StoreError> {
            let latest = self.inner.get_latest_snapshot(journey_id, slug).await?;
            if !self.raced.swap(true, Ordering::SeqCst) {
                let count = latest.as_ref().map_or(0, |s| s.evidence_count);
                self.inner
                    .save_snapshot(&CompetencySnapshot {
                        id: Uuid::new_v4(),
                        user_id: Uuid::nil(),
                        journey_id,
                        competency_slug: slug.to_string(),
                        score: 55.0,
                        band: Band::Contributor,
                        evidence_count: count + 1,
                        source: EvidenceSource::Negotiation,
                        evidence_type: "negotiation_round".to_string(),
                        recorded_at: Utc::now(),
                    })
                    .await?;
            }
            Ok(latest)
        }
        async fn list_latest_snapshots(&self, id: Uuid) -> Result<Vec<CompetencySnapshot>, StoreError> {
            self.inner.list_latest_snapshots(id).await
        }
        async fn snapshot_history(
            &self,
            id: Uuid,
            slug: &str,
        ) -> Result<Vec<CompetencySnapshot>, StoreError> {
            self.inner.snapshot_history(id, slug).await
        }
        async fn save_snapshot(&self, snapshot: &CompetencySnapshot) -> Result<(), StoreError> {
            self.inner.save_snapshot(snapshot).await
        }
        async fn get_completed_sprint_count(&self, id: Uuid) -> Result<u32, StoreError> {
            self.inner.get_completed_sprint_count(id).await
        }
        async fn get_current_phase(&self, id: Uuid) -> Result<Option<PhaseState>, StoreError> {
            self.inner.get_current_phase(id).await
        }
        async fn save_phase_transition(
            &self,
            id: Uuid,
            transition: &PhaseTransition,
        ) -> Result<(), StoreError> {
            self.inner.save_phase_transition(id, transition).await
        }
        async fn phase_history(&self, id: Uuid) -> Result<Vec<PhaseTransition>, StoreError> {
            self.inner.phase_history(id).await
        }
        async fn create_sprint(&self, id: Uuid, sprint: &Sprint) -> Result<(), StoreError> {
            self.inner.create_sprint(id, sprint).await
        }
        async fn get_sprint(&self, id: Uuid, number: u32) -> Result<Option<Sprint>, StoreError> {
            self.inner.get_sprint(id, number).await
        }
        async fn save_sprint(&self, id: Uuid, sprint: &Sprint) -> Result<(), StoreError> {
            self.inner.save_sprint(id, sprint).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_write_surfaces_conflict_without_retry() {
        let store = Arc::new(RacingStore {
            inner: MemoryProgressStore::new(),
            raced: AtomicBool::new(false),
        });
        let agg = CompetencyAggregator::new(Arc::new(test_config()), store.clone());
        let journey_id = Uuid::new_v4();

        let err = agg
            .record_evidence(Uuid::nil(), journey_id, &interview("debugging", 90.0))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressionError::Conflict(_)));
        assert!(err.is_retryable());

        // only the competing write landed
        let history = store.snapshot_history(journey_id, "debugging").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].source, EvidenceSource::Negotiation);

        // a fresh attempt reads the new latest and succeeds
        let delta = agg
            .record_evidence(Uuid::nil(), journey_id, &interview("debugging", 90.0))
            .await
            .unwrap();
        assert_eq!(delta.previous_confidence, 55.0);
        assert_eq!(delta.evidence_count, 2);
    }
}
