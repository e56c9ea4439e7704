//! Binary threshold scoring
//!
//! A value either satisfies `value <op> threshold` (success value) or it does not
//! (failure value). In rolling mode the comparison applies to the window total; with a
//! `<`/`<=` operator that total is treated as a weekly allowance.

use super::{clamp_day, empty_window, AdherenceAlgorithm};
use crate::config::BinaryThresholdConfig;
use crate::error::ScoringError;
use crate::types::{
    AlgorithmType, BinaryThresholdDetails, DailyValueSeries, DualProgress, EvaluationPeriod,
    ScoreDetails, ScoreResult,
};

impl BinaryThresholdConfig {
    pub fn meets_threshold(&self, value: f64) -> bool {
        self.comparison_operator.compare(value, self.threshold)
    }

    /// Score a single value
    pub fn calculate_score(&self, actual_value: f64) -> f64 {
        if self.meets_threshold(actual_value) {
            self.success_value
        } else {
            self.failure_value
        }
    }

    fn is_weekly_allowance(&self) -> bool {
        self.evaluation_period == EvaluationPeriod::Rolling7Day
            && self.comparison_operator.is_upper_bound()
    }

    /// Daily mode: each day's own result. Rolling mode: the running total's result.
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
                        cumulative += value;
                        Some(self.calculate_score(cumulative))
                    })
                    .collect()
            }
        }
    }

    fn successful_days(&self, series: &DailyValueSeries, through_day: usize) -> usize {
        series
            .iter()
            .take(through_day)
            .flatten()
            .filter(|v| self.meets_threshold(*v))
            .count()
    }

    fn window_total(series: &DailyValueSeries, through_day: usize) -> f64 {
        series.iter().take(through_day).flatten().sum()
    }

    fn result(&self, final_score: f64, series: &DailyValueSeries) -> ScoreResult {
        let window_total = match self.evaluation_period {
            EvaluationPeriod::Daily => None,
            EvaluationPeriod::Rolling7Day => Some(Self::window_total(series, series.len())),
        };
        ScoreResult {
            algorithm: AlgorithmType::BinaryThreshold,
            final_score,
            max_potential_score: self.success_value,
            details: ScoreDetails::BinaryThreshold(BinaryThresholdDetails {
                evaluation_period: self.evaluation_period,
                threshold: self.threshold,
                comparison_operator: self.comparison_operator,
                successful_days: self.successful_days(series, series.len()),
                window_total,
                progressive_scores: self.calculate_progressive_scores(series),
            }),
        }
    }
}

impl AdherenceAlgorithm for BinaryThresholdConfig {
    fn algorithm_type(&self) -> AlgorithmType {
        AlgorithmType::BinaryThreshold
    }

    fn evaluate(&self, series: &DailyValueSeries) -> Result<ScoreResult, ScoringError> {
        if series.is_empty() {
            return Err(empty_window(self.result(self.failure_value, series)));
        }

        let final_score = match self.evaluation_period {
            EvaluationPeriod::Daily => {
                let sum: f64 = series
                    .iter()
                    .map(|value| {
                        value
                            .map(|v| self.calculate_score(v))
                            .unwrap_or(self.failure_value)
                    })
                    .sum();
                sum / series.len() as f64
            }
            EvaluationPeriod::Rolling7Day => {
                self.calculate_score(Self::window_total(series, series.len()))
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

        if self.is_weekly_allowance() {
            let weekly_total = Self::window_total(series, current_day);
            if !self.meets_threshold(weekly_total) {
                // Allowance already exceeded; nothing left to recover this window
                return DualProgress::new(0.0, 0.0, current_day, total_days);
            }
            let progress = current_day as f64 / total_days as f64 * 100.0;
            return DualProgress::new(progress, 100.0, current_day, total_days);
        }

        let successful = self.successful_days(series, current_day);
        let remaining = total_days - current_day;
        DualProgress::new(
            successful as f64 / total_days as f64 * 100.0,
            (successful + remaining) as f64 / total_days as f64 * 100.0,
            current_day,
            total_days,
        )
    }

    fn formula(&self) -> String {
        format!(
            "if (actual_value {} {}) then {} else {}",
            self.comparison_operator, self.threshold, self.success_value, self.failure_value
        )
    }
}
