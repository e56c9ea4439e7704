//! Zone-based scoring
//!
//! Each value earns the score of the zone it lands in. With a `frequency_target` the
//! window is scored on how many days hit the optimal zone; otherwise on the mean zone
//! score.

use super::{clamp_day, empty_window, AdherenceAlgorithm};
use crate::config::{BoundaryHandling, Zone, ZoneBasedConfig};
use crate::error::ScoringError;
use crate::types::{
    AlgorithmType, DailyValueSeries, DualProgress, ScoreDetails, ScoreResult, ZoneBasedDetails,
};

impl ZoneBasedConfig {
    /// First zone (by lower bound) containing the value
    pub fn zone_for(&self, value: f64) -> Option<&Zone> {
        self.sorted_zones().into_iter().find(|z| z.contains(value))
    }

    /// Score a single value; 0 when it falls outside every zone
    pub fn calculate_score(&self, actual_value: f64) -> f64 {
        let graduated =
            self.grace_range && self.boundary_handling == BoundaryHandling::Graduated;
        match self.zone_for(actual_value) {
            Some(zone) if graduated => graduated_score(actual_value, zone),
            Some(zone) => zone.score,
            None => 0.0,
        }
    }

    pub fn calculate_progressive_scores(&self, series: &DailyValueSeries) -> Vec<Option<f64>> {
        series
            .iter()
            .map(|value| value.map(|v| self.calculate_score(v)))
            .collect()
    }

    fn is_optimal(&self, value: f64) -> bool {
        self.zone_for(value)
            .map(|zone| zone.score >= self.optimal_score())
            .unwrap_or(false)
    }

    fn optimal_days(&self, series: &DailyValueSeries, through_day: usize) -> usize {
        series
            .iter()
            .take(through_day)
            .flatten()
            .filter(|v| self.is_optimal(*v))
            .count()
    }

    fn result(&self, final_score: f64, series: &DailyValueSeries) -> ScoreResult {
        let max_potential_score = match self.frequency_target {
            Some(_) => 100.0,
            None => self.optimal_score(),
        };
        ScoreResult {
            algorithm: AlgorithmType::ZoneBased,
            final_score,
            max_potential_score,
            details: ScoreDetails::ZoneBased(ZoneBasedDetails {
                unit: self.unit.clone(),
                day_zones: series
                    .iter()
                    .map(|value| {
                        value.map(|v| {
                            self.zone_for(v)
                                .map(|z| z.label.clone())
                                .unwrap_or_else(|| "out_of_range".to_string())
                        })
                    })
                    .collect(),
                progressive_scores: self.calculate_progressive_scores(series),
                optimal_zone_days: self.optimal_days(series, series.len()),
                frequency_target: self.frequency_target,
            }),
        }
    }
}

/// 95% of the zone score at its lower edge rising to 100% at its upper edge
fn graduated_score(value: f64, zone: &Zone) -> f64 {
    let width = zone.max - zone.min;
    if width == 0.0 {
        return zone.score;
    }
    let position = (value - zone.min) / width;
    zone.score * (0.95 + 0.05 * position)
}

impl AdherenceAlgorithm for ZoneBasedConfig {
    fn algorithm_type(&self) -> AlgorithmType {
        AlgorithmType::ZoneBased
    }

    fn evaluate(&self, series: &DailyValueSeries) -> Result<ScoreResult, ScoringError> {
        if series.is_empty() {
            return Err(empty_window(self.result(0.0, series)));
        }

        let final_score = match self.frequency_target {
            Some(target) => {
                let optimal_days = self.optimal_days(series, series.len());
                if optimal_days >= target as usize {
                    100.0
                } else {
                    optimal_days as f64 / target as f64 * 100.0
                }
            }
            None => {
                let sum: f64 = self
                    .calculate_progressive_scores(series)
                    .into_iter()
                    .flatten()
                    .sum();
                sum / series.len() as f64
            }
        };

        Ok(self.result(final_score, series))
    }

    fn dual_progress(&self, series: &DailyValueSeries, current_day: usize) -> DualProgress {
        let current_day = clamp_day(series, current_day);
        let total_days = series.len();
        let optimal = self.optimal_score();
        if current_day == 0 {
            let potential = match self.frequency_target {
                Some(_) => 100.0,
                None => optimal,
            };
            return DualProgress::new(0.0, potential, 0, total_days);
        }

        let remaining = total_days - current_day;
        let scores: Vec<f64> = series
            .iter()
            .take(current_day)
            .map(|value| value.map(|v| self.calculate_score(v)).unwrap_or(0.0))
            .collect();

        match self.frequency_target {
            Some(target) => {
                let points_per_day = 100.0 / target as f64;
                let progress: f64 = scores
                    .iter()
                    .map(|score| score / optimal * points_per_day)
                    .sum::<f64>()
                    .min(100.0);
                let potential = (progress + remaining as f64 * points_per_day).min(100.0);
                DualProgress::new(progress, potential, current_day, total_days)
            }
            None => {
                let sum: f64 = scores.iter().sum();
                let average = sum / current_day as f64;
                let potential = if remaining > 0 {
                    (sum + remaining as f64 * optimal) / total_days as f64
                } else {
                    average
                };
                DualProgress::new(average, potential, current_day, total_days)
            }
        }
    }

    fn formula(&self) -> String {
        match self.frequency_target {
            Some(target) => format!(
                "frequency-based: optimal zone on {target} days per window"
            ),
            None => "score of the zone containing actual_value".to_string(),
        }
    }
}
