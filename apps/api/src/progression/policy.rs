//! Progression policy: every tunable the engine reads, in one explicit struct.
//!
//! The built-in policy ships as `config/progression.json`. A deployment may
//! point `PROGRESSION_CONFIG_PATH` at its own file. Either way the struct is
//! validated once at startup and handed to the aggregator, calculator and gate.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::progression::bands::BandThresholds;

const BUILTIN_POLICY: &str = include_str!("../../config/progression.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetencyDef {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// How new evidence moves a confidence score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlendPolicy {
    /// Confidence assumed before the first evidence item.
    pub baseline_confidence: f64,
    /// Share of the gap between old confidence and new evidence closed per item.
    pub blend_weight: f64,
    /// Scores for qualitative evidence types that arrive without a number.
    /// Types not listed here are neutral.
    #[serde(default)]
    pub qualitative_scores: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionPath {
    pub slug: String,
    pub min_sprints: u32,
    pub max_sprints: u32,
    pub readiness_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressionConfig {
    pub competencies: Vec<CompetencyDef>,
    #[serde(default)]
    pub bands: BandThresholds,
    pub blend: BlendPolicy,
    /// role → competency slug → weight. Competencies absent from a role weigh 1.0.
    #[serde(default)]
    pub role_weights: BTreeMap<String, BTreeMap<String, f64>>,
    pub paths: Vec<ProgressionPath>,
}

impl ProgressionConfig {
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_POLICY).context("Built-in progression policy is invalid")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read progression policy {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("Invalid progression policy {}", path.display()))
    }

    /// Loads the policy at `path`, or the built-in one when no path is configured.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Self::builtin(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: ProgressionConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.competencies.is_empty() {
            bail!("at least one competency must be defined");
        }
        let mut seen = std::collections::BTreeSet::new();
        for c in &self.competencies {
            if c.slug.trim().is_empty() {
                bail!("competency slugs cannot be empty");
            }
            if !seen.insert(c.slug.as_str()) {
                bail!("duplicate competency '{}'", c.slug);
            }
        }

        let b = &self.bands;
        if !(0.0 < b.contributor_min
            && b.contributor_min < b.junior_ready_min
            && b.junior_ready_min <= 100.0)
        {
            bail!(
                "band thresholds must satisfy 0 < contributor_min < junior_ready_min <= 100 (got {} / {})",
                b.contributor_min,
                b.junior_ready_min
            );
        }

        if !(self.blend.blend_weight > 0.0 && self.blend.blend_weight <= 1.0) {
            bail!("blend_weight must be in (0, 1], got {}", self.blend.blend_weight);
        }
        if !in_score_range(self.blend.baseline_confidence) {
            bail!(
                "baseline_confidence must be in [0, 100], got {}",
                self.blend.baseline_confidence
            );
        }
        for (kind, score) in &self.blend.qualitative_scores {
            if !in_score_range(*score) {
                bail!("qualitative score for '{kind}' must be in [0, 100], got {score}");
            }
        }

        for (role, weights) in &self.role_weights {
            for (slug, weight) in weights {
                if !seen.contains(slug.as_str()) {
                    bail!("role '{role}' weights unknown competency '{slug}'");
                }
                if !(weight.is_finite() && *weight >= 0.0) {
                    bail!("role '{role}' has a negative or non-finite weight for '{slug}'");
                }
            }
        }

        for path in &self.paths {
            if path.min_sprints > path.max_sprints {
                bail!(
                    "path '{}' has min_sprints {} > max_sprints {}",
                    path.slug,
                    path.min_sprints,
                    path.max_sprints
                );
            }
            if !in_score_range(path.readiness_threshold) {
                bail!(
                    "path '{}' readiness_threshold must be in [0, 100]",
                    path.slug
                );
            }
        }
        Ok(())
    }

    pub fn competency(&self, slug: &str) -> Option<&CompetencyDef> {
        self.competencies.iter().find(|c| c.slug == slug)
    }

    pub fn path(&self, slug: &str) -> Option<&ProgressionPath> {
        self.paths.iter().find(|p| p.slug == slug)
    }
}

fn in_score_range(value: f64) -> bool {
    value.is_finite() && (0.0..=100.0).contains(&value)
}
