use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Discrete skill level derived from a competency's confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    Explorer,
    Contributor,
    JuniorReady,
}

impl Band {
    pub fn as_str(self) -> &'static str {
        match self {
            Band::Explorer => "explorer",
            Band::Contributor => "contributor",
            Band::JuniorReady => "junior_ready",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Band {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "explorer" => Ok(Band::Explorer),
            "contributor" => Ok(Band::Contributor),
            "junior_ready" => Ok(Band::JuniorReady),
            other => Err(format!("unknown band '{other}'")),
        }
    }
}

/// Lower cutpoints for each band above `explorer`.
///
/// The same thresholds are applied everywhere a band is derived, so a band is
/// always a monotonic function of the clamped score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandThresholds {
    pub contributor_min: f64,
    pub junior_ready_min: f64,
}

impl Default for BandThresholds {
    fn default() -> Self {
        Self {
            contributor_min: 40.0,
            junior_ready_min: 75.0,
        }
    }
}

impl BandThresholds {
    pub fn band_for(&self, score: f64) -> Band {
        let score = score.clamp(0.0, 100.0);
        if score >= self.junior_ready_min {
            Band::JuniorReady
        } else if score >= self.contributor_min {
            Band::Contributor
        } else {
            Band::Explorer
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_boundaries() {
        let t = BandThresholds::default();
        assert_eq!(t.band_for(39.0), Band::Explorer);
        assert_eq!(t.band_for(40.0), Band::Contributor);
        assert_eq!(t.band_for(74.0), Band::Contributor);
        assert_eq!(t.band_for(75.0), Band::JuniorReady);
    }

    #[test]
    fn test_band_just_below_cutpoint() {
        let t = BandThresholds::default();
        assert_eq!(t.band_for(39.99), Band::Explorer);
        assert_eq!(t.band_for(74.99), Band::Contributor);
    }

    #[test]
    fn test_band_is_monotonic_in_score() {
        let t = BandThresholds::default();
        let mut last = Band::Explorer;
        for s in 0..=100 {
            let band = t.band_for(s as f64);
            assert!(band >= last, "band dropped at score {s}");
            last = band;
        }
    }

    #[test]
    fn test_out_of_range_scores_are_clamped() {
        let t = BandThresholds::default();
        assert_eq!(t.band_for(-20.0), Band::Explorer);
        assert_eq!(t.band_for(250.0), Band::JuniorReady);
    }

    #[test]
    fn test_band_round_trips_through_text() {
        for band in [Band::Explorer, Band::Contributor, Band::JuniorReady] {
            assert_eq!(band.as_str().parse::<Band>().unwrap(), band);
        }
        assert!("expert".parse::<Band>().is_err());
    }
}
