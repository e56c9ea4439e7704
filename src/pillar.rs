//! Pillar aggregation
//!
//! Folds per-marker scores into per-pillar totals. Each marker contributes to every
//! pillar it carries a positive weight for:
//!
//! - `total_raw_score += score`
//! - `total_weighted_score += score * weight`
//! - `max_score += marker_max * weight`
//!
//! and the pillar percentage is `total_weighted_score / max_score * 100` (0 when nothing
//! contributed). Aggregators merge, so markers can be folded in any order or split
//! across workers.
//!
//! [`CompositeWeights`] then blends marker, survey and education percentages into one
//! score per pillar plus an overall score.

use crate::biomarker::MarkerScore;
use crate::error::ScoringError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const HEALTHFUL_NUTRITION: &str = "Healthful Nutrition";
pub const MOVEMENT_EXERCISE: &str = "Movement + Exercise";
pub const RESTORATIVE_SLEEP: &str = "Restorative Sleep";
pub const COGNITIVE_HEALTH: &str = "Cognitive Health";
pub const STRESS_MANAGEMENT: &str = "Stress Management";
pub const CONNECTION_PURPOSE: &str = "Connection + Purpose";
pub const CORE_CARE: &str = "Core Care";

/// Tolerance on component weights summing to 1
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// What one marker adds to one pillar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PillarContribution {
    pub raw_score: f64,
    pub weight: f64,
    pub weighted_score: f64,
    pub max_score: f64,
}

impl PillarContribution {
    pub fn new(score: f64, marker_max: f64, weight: f64) -> Self {
        Self {
            raw_score: score,
            weight,
            weighted_score: score * weight,
            max_score: marker_max * weight,
        }
    }
}

/// Aggregated score for one pillar
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PillarScore {
    pub total_raw_score: f64,
    pub total_weighted_score: f64,
    pub max_score: f64,
    pub percentage: f64,
    pub contributing_markers: Vec<String>,
}

impl PillarScore {
    fn add(&mut self, marker_key: &str, contribution: &PillarContribution) {
        self.total_raw_score += contribution.raw_score;
        self.total_weighted_score += contribution.weighted_score;
        self.max_score += contribution.max_score;
        self.contributing_markers.push(marker_key.to_string());
    }

    fn absorb(&mut self, other: PillarScore) {
        self.total_raw_score += other.total_raw_score;
        self.total_weighted_score += other.total_weighted_score;
        self.max_score += other.max_score;
        self.contributing_markers.extend(other.contributing_markers);
    }

    fn finalize(&mut self) {
        self.percentage = if self.max_score > 0.0 {
            self.total_weighted_score / self.max_score * 100.0
        } else {
            0.0
        };
    }
}

/// Pillar name → aggregated score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PillarReport {
    pillars: BTreeMap<String, PillarScore>,
}

impl PillarReport {
    pub fn get(&self, pillar: &str) -> Option<&PillarScore> {
        self.pillars.get(pillar)
    }

    /// Percentage for a pillar; 0 when nothing contributed to it
    pub fn percentage(&self, pillar: &str) -> f64 {
        self.get(pillar).map(|p| p.percentage).unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PillarScore)> {
        self.pillars.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.pillars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pillars.is_empty()
    }
}

/// Running fold of marker contributions
#[derive(Debug, Clone, Default)]
pub struct PillarAggregator {
    pillars: BTreeMap<String, PillarScore>,
}

impl PillarAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pillar: &str, marker_key: &str, contribution: &PillarContribution) {
        self.pillars
            .entry(pillar.to_string())
            .or_default()
            .add(marker_key, contribution);
    }

    /// Fold in every pillar contribution of one scored marker
    pub fn add_marker(&mut self, marker: &MarkerScore) {
        for (pillar, contribution) in &marker.pillar_contributions {
            self.add(pillar, &marker.marker_key, contribution);
        }
    }

    /// Combine two partial folds
    pub fn merge(mut self, other: PillarAggregator) -> PillarAggregator {
        for (pillar, score) in other.pillars {
            self.pillars.entry(pillar).or_default().absorb(score);
        }
        self
    }

    pub fn finish(self) -> PillarReport {
        let mut pillars = self.pillars;
        for score in pillars.values_mut() {
            score.finalize();
        }
        PillarReport { pillars }
    }
}

impl<'a> FromIterator<&'a MarkerScore> for PillarAggregator {
    fn from_iter<I: IntoIterator<Item = &'a MarkerScore>>(iter: I) -> Self {
        let mut aggregator = PillarAggregator::new();
        for marker in iter {
            aggregator.add_marker(marker);
        }
        aggregator
    }
}

/// Share of each score source in a pillar's combined score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentWeights {
    pub markers: f64,
    pub survey: f64,
    pub education: f64,
}

impl ComponentWeights {
    pub const fn new(markers: f64, survey: f64, education: f64) -> Self {
        Self {
            markers,
            survey,
            education,
        }
    }

    fn sum(&self) -> f64 {
        self.markers + self.survey + self.education
    }
}

/// Per-pillar component weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositeWeights {
    pillars: BTreeMap<String, ComponentWeights>,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        let table = [
            (HEALTHFUL_NUTRITION, ComponentWeights::new(0.72, 0.18, 0.10)),
            (MOVEMENT_EXERCISE, ComponentWeights::new(0.54, 0.36, 0.10)),
            (RESTORATIVE_SLEEP, ComponentWeights::new(0.63, 0.27, 0.10)),
            (COGNITIVE_HEALTH, ComponentWeights::new(0.36, 0.54, 0.10)),
            (STRESS_MANAGEMENT, ComponentWeights::new(0.27, 0.63, 0.10)),
            (CONNECTION_PURPOSE, ComponentWeights::new(0.18, 0.72, 0.10)),
            (CORE_CARE, ComponentWeights::new(0.495, 0.405, 0.10)),
        ];
        Self {
            pillars: table
                .into_iter()
                .map(|(name, weights)| (name.to_string(), weights))
                .collect(),
        }
    }
}

/// Combined pillar scores and their mean
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub pillar_scores: BTreeMap<String, f64>,
    pub overall_score: f64,
}

impl CompositeWeights {
    pub fn new(pillars: BTreeMap<String, ComponentWeights>) -> Self {
        Self { pillars }
    }

    pub fn from_json(json: &str) -> Result<Self, ScoringError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let weights: CompositeWeights =
            serde_json::from_value(value).map_err(ScoringError::from_schema)?;
        weights.validate()?;
        Ok(weights)
    }

    pub fn validate(&self) -> Result<(), ScoringError> {
        for (pillar, weights) in &self.pillars {
            let parts = [weights.markers, weights.survey, weights.education];
            if parts.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(ScoringError::invalid(format!(
                    "{pillar} has a negative or non-finite component weight"
                )));
            }
            if (weights.sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
                return Err(ScoringError::invalid(format!(
                    "{pillar} component weights sum to {}, expected 1.0",
                    weights.sum()
                )));
            }
        }
        Ok(())
    }

    pub fn get(&self, pillar: &str) -> Option<&ComponentWeights> {
        self.pillars.get(pillar)
    }

    /// Blend marker, survey and education percentages per pillar.
    ///
    /// Pillars missing from a source count 0 for that source. Scores are rounded to
    /// two decimals; the overall score is the rounded mean of the pillar scores.
    pub fn combine(
        &self,
        markers: &PillarReport,
        survey: &BTreeMap<String, f64>,
        education: &BTreeMap<String, f64>,
    ) -> Result<CompositeScore, ScoringError> {
        self.validate()?;

        let pillar_scores: BTreeMap<String, f64> = self
            .pillars
            .iter()
            .map(|(pillar, weights)| {
                let combined = markers.percentage(pillar) * weights.markers
                    + survey.get(pillar).copied().unwrap_or(0.0) * weights.survey
                    + education.get(pillar).copied().unwrap_or(0.0) * weights.education;
                (pillar.clone(), round2(combined))
            })
            .collect();

        let overall_score = if pillar_scores.is_empty() {
            0.0
        } else {
            round2(pillar_scores.values().sum::<f64>() / pillar_scores.len() as f64)
        };

        Ok(CompositeScore {
            pillar_scores,
            overall_score,
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
