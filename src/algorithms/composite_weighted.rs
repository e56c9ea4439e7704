//! Composite weighted scoring
//!
//! A day's score is the weighted average of its component scores, each component
//! scored proportionally, against a binary threshold or by zone, then bounded by the
//! config's floor and cap. The window is scored as the total of its daily composites
//! against a perfect 100 per day.

use super::{clamp_day, empty_window, AdherenceAlgorithm};
use crate::config::{ComponentMethod, CompositeComponent, CompositeWeightedConfig};
use crate::error::ScoringError;
use crate::types::{
    AlgorithmType, CompositeWeightedDetails, DailyValueSeries, DualProgress, ScoreDetails,
    ScoreResult,
};
use std::collections::BTreeMap;

/// Composite score of a perfect day
const PERFECT_DAY: f64 = 100.0;

impl CompositeComponent {
    /// Score one measured value of this component
    pub fn calculate_score(&self, value: f64) -> f64 {
        let params = &self.parameters;
        match self.scoring_method {
            ComponentMethod::Proportional => {
                let percentage = value / self.target * 100.0;
                percentage
                    .min(params.maximum_cap)
                    .max(params.minimum_threshold)
            }
            ComponentMethod::Binary => {
                let threshold = params.threshold.unwrap_or(self.target);
                if params.comparison_operator.compare(value, threshold) {
                    params.success_value
                } else {
                    params.failure_value
                }
            }
            ComponentMethod::Zone => params
                .zones
                .iter()
                .find(|zone| zone.contains(value))
                .map(|zone| zone.score)
                .unwrap_or(0.0),
        }
    }
}

impl CompositeWeightedConfig {
    /// Composite score for one day's component values, keyed by `field_name`.
    ///
    /// `None` when any component has no value that day.
    pub fn calculate_score(&self, values: &BTreeMap<String, f64>) -> Option<f64> {
        let total_weight = self.total_weight();
        if total_weight <= 0.0 {
            return Some(0.0);
        }

        let mut weighted = 0.0;
        for component in &self.components {
            let value = values.get(&component.field_name)?;
            weighted += component.calculate_score(*value) * component.weight;
        }
        Some(
            (weighted / total_weight)
                .max(self.minimum_threshold)
                .min(self.maximum_cap),
        )
    }

    /// Reduce per-day component values to a series of daily composite scores
    pub fn composite_series(&self, days: &[Option<BTreeMap<String, f64>>]) -> DailyValueSeries {
        days.iter()
            .map(|day| day.as_ref().and_then(|values| self.calculate_score(values)))
            .collect::<Vec<_>>()
            .into()
    }

    fn window_total(series: &DailyValueSeries, through_day: usize) -> f64 {
        series.iter().take(through_day).flatten().sum()
    }

    fn result(&self, final_score: f64, series: &DailyValueSeries) -> ScoreResult {
        ScoreResult {
            algorithm: AlgorithmType::CompositeWeighted,
            final_score,
            max_potential_score: PERFECT_DAY,
            details: ScoreDetails::CompositeWeighted(CompositeWeightedDetails {
                components: self.components.iter().map(|c| c.name.clone()).collect(),
                progressive_scores: series.as_slice().to_vec(),
                window_total: Self::window_total(series, series.len()),
                window_target: series.len() as f64 * PERFECT_DAY,
                days_with_data: series.present_count(),
            }),
        }
    }
}

impl AdherenceAlgorithm for CompositeWeightedConfig {
    fn algorithm_type(&self) -> AlgorithmType {
        AlgorithmType::CompositeWeighted
    }

    /// Expects daily composite scores, as built by `composite_series`
    fn evaluate(&self, series: &DailyValueSeries) -> Result<ScoreResult, ScoringError> {
        if series.is_empty() {
            return Err(empty_window(self.result(0.0, series)));
        }

        let window_target = series.len() as f64 * PERFECT_DAY;
        let final_score =
            (Self::window_total(series, series.len()) / window_target * 100.0).min(PERFECT_DAY);
        Ok(self.result(final_score, series))
    }

    fn dual_progress(&self, series: &DailyValueSeries, current_day: usize) -> DualProgress {
        let current_day = clamp_day(series, current_day);
        let total_days = series.len();
        if total_days == 0 {
            return DualProgress::new(0.0, 100.0, 0, 0);
        }

        let window_target = total_days as f64 * PERFECT_DAY;
        let current_total = Self::window_total(series, current_day);
        let remaining = (total_days - current_day) as f64;
        let progress = (current_total / window_target * 100.0).min(100.0);
        let potential =
            ((current_total + remaining * PERFECT_DAY) / window_target * 100.0).min(100.0);
        DualProgress::new(progress, potential, current_day, total_days)
    }

    fn formula(&self) -> String {
        format!("weighted average of {} components", self.components.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ComponentParameters, ComponentZone};
    use crate::types::ComparisonOperator;
    use pretty_assertions::assert_eq;

    fn sleep_quality() -> CompositeWeightedConfig {
        let zone = |min: f64, max: f64, score: f64| ComponentZone {
            min: Some(min),
            max: Some(max),
            score,
            label: None,
        };
        CompositeWeightedConfig {
            components: vec![
                CompositeComponent {
                    name: "Sleep Duration".to_string(),
                    field_name: "sleep_duration".to_string(),
                    weight: 0.75,
                    target: 8.0,
                    unit: "hours".to_string(),
                    scoring_method: ComponentMethod::Zone,
                    parameters: ComponentParameters {
                        zones: vec![
                            zone(0.0, 5.0, 20.0),
                            zone(5.0, 6.0, 40.0),
                            zone(6.0, 7.0, 60.0),
                            zone(7.0, 9.0, 100.0),
                            zone(9.0, 12.0, 80.0),
                        ],
                        ..Default::default()
                    },
                },
                CompositeComponent {
                    name: "Schedule Consistency".to_string(),
                    field_name: "schedule_variance".to_string(),
                    weight: 0.25,
                    target: 60.0,
                    unit: "minutes".to_string(),
                    scoring_method: ComponentMethod::Binary,
                    parameters: ComponentParameters {
                        comparison_operator: ComparisonOperator::LessOrEqual,
                        ..Default::default()
                    },
                },
            ],
            minimum_threshold: 0.0,
            maximum_cap: 100.0,
            description: String::new(),
        }
    }

    fn day(hours: f64, variance: f64) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("sleep_duration".to_string(), hours),
            ("schedule_variance".to_string(), variance),
        ])
    }

    #[test]
    fn test_weighted_average_of_components() {
        let config = sleep_quality();
        assert_eq!(config.calculate_score(&day(8.0, 30.0)), Some(100.0));
        // 60 * 0.75 + 0 * 0.25
        assert_eq!(config.calculate_score(&day(6.5, 90.0)), Some(45.0));
    }

    #[test]
    fn test_missing_component_leaves_day_missing() {
        let config = sleep_quality();
        let partial = BTreeMap::from([("sleep_duration".to_string(), 8.0)]);
        assert_eq!(config.calculate_score(&partial), None);

        let series = config.composite_series(&[Some(day(8.0, 10.0)), Some(partial), None]);
        assert_eq!(series.as_slice(), &[Some(100.0), None, None]);
    }

    #[test]
    fn test_proportional_component_bounds() {
        let mut config = sleep_quality();
        config.components.truncate(1);
        let component = &mut config.components[0];
        component.scoring_method = ComponentMethod::Proportional;
        component.parameters.minimum_threshold = 10.0;

        assert_eq!(component.calculate_score(4.0), 50.0);
        assert_eq!(component.calculate_score(0.0), 10.0);
        assert_eq!(component.calculate_score(12.0), 100.0);
    }

    #[test]
    fn test_evaluate_against_perfect_window() {
        let config = sleep_quality();
        let series = DailyValueSeries::new(vec![Some(100.0), Some(40.0), None, Some(60.0)]);

        let result = config.evaluate(&series).unwrap();
        assert_eq!(result.final_score, 50.0);
        assert_eq!(result.max_potential_score, 100.0);
        match result.details {
            ScoreDetails::CompositeWeighted(details) => {
                assert_eq!(details.window_total, 200.0);
                assert_eq!(details.window_target, 400.0);
                assert_eq!(details.days_with_data, 3);
                assert_eq!(details.components.len(), 2);
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[test]
    fn test_dual_progress() {
        let config = sleep_quality();
        let series = DailyValueSeries::from_values(&[100.0, 50.0, 0.0, 0.0, 0.0, 0.0, 0.0]);

        let progress = config.dual_progress(&series, 2);
        assert!((progress.progress_toward_goal - 150.0 / 700.0 * 100.0).abs() < 1e-9);
        assert!((progress.max_potential_adherence - 650.0 / 700.0 * 100.0).abs() < 1e-9);
        assert_eq!(progress.remaining_days, 5);
    }

    #[test]
    fn test_formula() {
        assert_eq!(sleep_quality().formula(), "weighted average of 2 components");
    }
}
