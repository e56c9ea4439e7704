//! Proportional scoring
//!
//! Score is `(actual / target) * 100`, floored by `minimum_threshold` (the floor itself
//! with partial credit, else 0) and capped by `maximum_cap`.
//!
//! In daily mode every day is scored on its own. In rolling mode values accumulate
//! toward one target for the window, with `daily_limit` bounding what a single day can
//! contribute.

use super::{clamp_day, empty_window, AdherenceAlgorithm};
use crate::config::ProportionalConfig;
use crate::error::ScoringError;
use crate::types::{
    AlgorithmType, DailyValueSeries, DualProgress, EvaluationPeriod, ProportionalDetails,
    ScoreDetails, ScoreResult,
};

impl ProportionalConfig {
    /// Score a single value
    pub fn calculate_score(&self, actual_value: f64) -> f64 {
        self.clamp_percentage((actual_value / self.target) * 100.0)
    }

    /// Apply floor, partial credit and cap to a raw percentage
    fn clamp_percentage(&self, percentage: f64) -> f64 {
        if percentage < self.minimum_threshold {
            return if self.partial_credit {
                self.minimum_threshold
            } else {
                0.0
            };
        }
        percentage.min(self.maximum_cap)
    }

    fn limited(&self, value: f64) -> f64 {
        match self.daily_limit {
            Some(limit) => value.min(limit),
            None => value,
        }
    }

    /// Scores as the user sees them on each day of the window.
    ///
    /// Daily mode: that day's own score. Rolling mode: cumulative progress toward the
    /// window target. Days without data yield `None`; the length always matches the
    /// window.
    pub fn calculate_progressive_scores(&self, series: &DailyValueSeries) -> Vec<Option<f64>> {
        match self.evaluation_period {
            EvaluationPeriod::Daily => series
                .iter()
                .map(|value| value.map(|v| self.calculate_score(v)))
                .collect(),
            EvaluationPeriod::Rolling7Day => {
                let mut cumulative = 0.0;
                series
                    .iter()
                    .map(|value| {
                        let value = value?;
                        cumulative += self.limited(value);
                        Some(self.clamp_percentage((cumulative / self.target) * 100.0))
                    })
                    .collect()
            }
        }
    }

    /// Window total after daily limits, ignoring missing days
    fn window_total(&self, series: &DailyValueSeries, through_day: usize) -> f64 {
        series
            .iter()
            .take(through_day)
            .flatten()
            .map(|v| self.limited(v))
            .sum()
    }

    fn result(&self, final_score: f64, series: &DailyValueSeries) -> ScoreResult {
        let window_total = match self.evaluation_period {
            EvaluationPeriod::Daily => None,
            EvaluationPeriod::Rolling7Day => Some(self.window_total(series, series.len())),
        };
        ScoreResult {
            algorithm: AlgorithmType::Proportional,
            final_score,
            max_potential_score: self.maximum_cap,
            details: ScoreDetails::Proportional(ProportionalDetails {
                evaluation_period: self.evaluation_period,
                target: self.target,
                unit: self.unit.clone(),
                progressive_scores: self.calculate_progressive_scores(series),
                window_total,
                days_with_data: series.present_count(),
            }),
        }
    }
}

impl AdherenceAlgorithm for ProportionalConfig {
    fn algorithm_type(&self) -> AlgorithmType {
        AlgorithmType::Proportional
    }

    fn evaluate(&self, series: &DailyValueSeries) -> Result<ScoreResult, ScoringError> {
        if series.is_empty() {
            return Err(empty_window(self.result(0.0, series)));
        }

        let final_score = match self.evaluation_period {
            EvaluationPeriod::Daily => {
                // Missing days count as zero toward the window average
                let sum: f64 = self
                    .calculate_progressive_scores(series)
                    .into_iter()
                    .flatten()
                    .sum();
                sum / series.len() as f64
            }
            EvaluationPeriod::Rolling7Day => {
                let total = self.window_total(series, series.len());
                self.clamp_percentage((total / self.target) * 100.0)
            }
        };

        Ok(self.result(final_score, series))
    }

    fn dual_progress(&self, series: &DailyValueSeries, current_day: usize) -> DualProgress {
        let current_day = clamp_day(series, current_day);
        let total_days = series.len();
        if total_days == 0 {
            return DualProgress::new(0.0, 100.0, 0, 0);
        }
        let remaining_days = total_days - current_day;

        match self.evaluation_period {
            EvaluationPeriod::Rolling7Day => {
                let current_total = self.window_total(series, current_day);
                let progress = ((current_total / self.target) * 100.0).min(100.0);

                let potential = if current_total >= self.target || remaining_days > 0 {
                    100.0
                } else {
                    progress
                };
                DualProgress::new(progress, potential, current_day, total_days)
            }
            EvaluationPeriod::Daily => {
                let day_share = 1.0 / total_days as f64;
                let progress_sum: f64 = series
                    .iter()
                    .take(current_day)
                    .map(|value| {
                        let completion = value
                            .map(|v| (self.limited(v) / self.target).min(1.0))
                            .unwrap_or(0.0);
                        completion * day_share
                    })
                    .sum();

                let max_additional = remaining_days as f64 * day_share;
                DualProgress::new(
                    progress_sum * 100.0,
                    (progress_sum + max_additional) * 100.0,
                    current_day,
                    total_days,
                )
            }
        }
    }

    fn formula(&self) -> String {
        format!("(actual_value / {}) * 100", self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn daily(target: f64) -> ProportionalConfig {
        ProportionalConfig {
            target,
            unit: "servings".to_string(),
            evaluation_period: EvaluationPeriod::Daily,
            minimum_threshold: 0.0,
            maximum_cap: 100.0,
            partial_credit: true,
            daily_limit: None,
            description: String::new(),
        }
    }

    fn weekly(target: f64) -> ProportionalConfig {
        ProportionalConfig {
            evaluation_period: EvaluationPeriod::Rolling7Day,
            unit: "minutes".to_string(),
            ..daily(target)
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_calculate_score_clamp_law() {
        let mut config = daily(10.0);
        config.minimum_threshold = 20.0;
        config.maximum_cap = 120.0;

        for value in [0.0, 1.0, 1.9, 2.0, 5.0, 10.0, 11.0, 12.0, 30.0] {
            let raw: f64 = value / 10.0 * 100.0;
            let expected = if raw < 20.0 { 20.0 } else { raw.min(120.0) };
            assert!(approx(config.calculate_score(value), expected), "value {value}");
        }

        config.partial_credit = false;
        assert_eq!(config.calculate_score(1.0), 0.0);
        assert!(approx(config.calculate_score(5.0), 50.0));
        assert_eq!(config.calculate_score(50.0), 120.0);
    }

    #[test]
    fn test_daily_progressive_scores_are_per_day() {
        let config = daily(8.0);
        let series = DailyValueSeries::new(vec![
            Some(8.0),
            Some(4.0),
            None,
            Some(12.0),
            Some(0.0),
            Some(6.0),
            Some(2.0),
        ]);

        let scores = config.calculate_progressive_scores(&series);
        assert_eq!(scores.len(), series.len());
        for (day, score) in scores.iter().enumerate() {
            let expected = series.day(day + 1).map(|v| config.calculate_score(v));
            assert_eq!(*score, expected);
        }
        assert_eq!(scores[6], Some(config.calculate_score(2.0)));
    }

    #[test]
    fn test_daily_evaluate_averages_days() {
        let config = daily(10.0);
        let series = DailyValueSeries::new(vec![
            Some(10.0),
            Some(5.0),
            None,
            Some(10.0),
            Some(10.0),
            Some(20.0),
            Some(0.0),
        ]);

        let result = config.evaluate(&series).unwrap();
        // 100 + 50 + 0 + 100 + 100 + 100 + 0 over 7 days
        assert!(approx(result.final_score, 450.0 / 7.0));
        assert_eq!(result.max_potential_score, 100.0);
        match result.details {
            ScoreDetails::Proportional(details) => {
                assert_eq!(details.days_with_data, 6);
                assert_eq!(details.window_total, None);
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[test]
    fn test_rolling_evaluate_respects_daily_limit() {
        let mut config = weekly(150.0);
        config.daily_limit = Some(60.0);
        let series = DailyValueSeries::from_values(&[120.0, 0.0, 0.0, 30.0, 0.0, 0.0, 0.0]);

        let result = config.evaluate(&series).unwrap();
        // 120 capped to 60, plus 30 = 90 of 150
        assert!(approx(result.final_score, 60.0));
        match result.details {
            ScoreDetails::Proportional(details) => {
                assert_eq!(details.window_total, Some(90.0));
                assert_eq!(details.progressive_scores[0], Some(40.0));
                assert_eq!(details.progressive_scores[3], Some(60.0));
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[test]
    fn test_rolling_dual_progress_caps_once_target_met() {
        let config = weekly(150.0);
        let series = DailyValueSeries::from_values(&[100.0, 80.0, 0.0, 0.0, 0.0, 0.0, 0.0]);

        let progress = config.dual_progress(&series, 2);
        assert_eq!(progress.progress_toward_goal, 100.0);
        assert_eq!(progress.max_potential_adherence, 100.0);
        assert_eq!(progress.remaining_days, 5);
    }

    #[test]
    fn test_rolling_dual_progress_final_day_potential_is_progress() {
        let config = weekly(150.0);
        let series = DailyValueSeries::from_values(&[30.0, 0.0, 0.0, 0.0, 0.0, 0.0, 30.0]);

        let midweek = config.dual_progress(&series, 3);
        assert!(approx(midweek.progress_toward_goal, 20.0));
        assert_eq!(midweek.max_potential_adherence, 100.0);

        let last = config.dual_progress(&series, 7);
        assert!(approx(last.progress_toward_goal, 40.0));
        assert!(approx(last.max_potential_adherence, 40.0));
        assert_eq!(last.remaining_days, 0);
    }

    #[test]
    fn test_daily_dual_progress_weights_each_day() {
        let config = daily(10.0);
        let series = DailyValueSeries::new(vec![
            Some(10.0),
            Some(5.0),
            None,
            Some(30.0),
            None,
            None,
            None,
        ]);

        let progress = config.dual_progress(&series, 4);
        // (1.0 + 0.5 + 0 + 1.0) / 7, remaining 3 days assumed perfect
        assert!(approx(progress.progress_toward_goal, 2.5 / 7.0 * 100.0));
        assert!(approx(progress.max_potential_adherence, 5.5 / 7.0 * 100.0));
        assert_eq!(progress.current_day, 4);
    }

    #[test]
    fn test_dual_progress_clamps_current_day() {
        let config = daily(10.0);
        let series = DailyValueSeries::from_values(&[10.0, 10.0, 10.0]);
        let progress = config.dual_progress(&series, 9);
        assert_eq!(progress.current_day, 3);
        assert!(approx(progress.progress_toward_goal, 100.0));
        assert!(approx(progress.max_potential_adherence, 100.0));
    }

    #[test]
    fn test_last_progressive_score_matches_day_seven() {
        let config = daily(2000.0);
        let values = [1500.0, 1800.0, 2100.0, 900.0, 2000.0, 2500.0, 1700.0];
        let series = DailyValueSeries::from_values(&values);

        let scores = config.calculate_progressive_scores(&series);
        assert_eq!(scores.last().copied().flatten(), Some(config.calculate_score(values[6])));
    }

    #[test]
    fn test_empty_window_is_insufficient() {
        let err = daily(10.0).evaluate(&DailyValueSeries::default()).unwrap_err();
        let partial = err.partial_result().unwrap();
        assert_eq!(partial.final_score, 0.0);
        assert_eq!(partial.max_potential_score, 100.0);
    }
}
