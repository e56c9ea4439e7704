//! Weekend variance scoring
//!
//! The first `weekday_baseline_days` establish a baseline as their mean and earn no
//! progress. Each following weekend day earns `weekend_day_weight` when its distance
//! from that baseline satisfies the variance rule. Progress is capped at 100.

use super::{clamp_day, AdherenceAlgorithm};
use crate::baseline::leading_mean;
use crate::config::WeekendVarianceConfig;
use crate::error::ScoringError;
use crate::types::{
    AlgorithmType, DailyValueSeries, DayDetail, DualProgress, ScoreDetails, ScoreResult,
    WeekendVarianceDetails,
};
use tracing::debug;

/// Weekend variance always scores out of 100
const MAX_POTENTIAL: f64 = 100.0;

struct WeekendPass {
    progress_score: f64,
    successful_days: usize,
    available_days: usize,
    day_details: Vec<DayDetail>,
}

impl WeekendVarianceConfig {
    /// Score weekend days up to `through_day` against `baseline`
    fn score_weekend(
        &self,
        series: &DailyValueSeries,
        baseline: f64,
        through_day: usize,
    ) -> WeekendPass {
        let schema = &self.schema;
        let rule = schema.variance_rule();
        let first = schema.weekday_baseline_days + 1;
        let last = (schema.weekday_baseline_days + schema.weekend_days).min(through_day);

        let mut pass = WeekendPass {
            progress_score: 0.0,
            successful_days: 0,
            available_days: 0,
            day_details: Vec::new(),
        };

        for day in first..=last {
            let Some(value) = series.day(day) else {
                pass.day_details.push(DayDetail {
                    day,
                    value: None,
                    baseline: Some(baseline),
                    variance: None,
                    within_threshold: None,
                    score_earned: 0.0,
                    is_baseline_day: false,
                    missing: true,
                });
                continue;
            };

            let (variance, within) = rule.check(value, baseline);
            let score_earned = if within { schema.weekend_day_weight } else { 0.0 };
            pass.available_days += 1;
            pass.progress_score += score_earned;
            if within {
                pass.successful_days += 1;
            }
            pass.day_details.push(DayDetail {
                day,
                value: Some(value),
                baseline: Some(baseline),
                variance: Some(variance),
                within_threshold: Some(within),
                score_earned,
                is_baseline_day: false,
                missing: false,
            });
        }

        pass
    }

    fn result(
        &self,
        final_score: f64,
        baseline_value: Option<f64>,
        weekday_values: Vec<f64>,
        pass: WeekendPass,
    ) -> ScoreResult {
        let schema = &self.schema;
        ScoreResult {
            algorithm: AlgorithmType::WeekendVariance,
            final_score,
            max_potential_score: MAX_POTENTIAL,
            details: ScoreDetails::WeekendVariance(WeekendVarianceDetails {
                baseline_value,
                weekday_values,
                variance_threshold: schema.variance_threshold,
                comparison_operator: schema.comparison_operator,
                weekend_day_weight: schema.weekend_day_weight,
                successful_weekend_days: pass.successful_days,
                total_weekend_days: schema.weekend_days,
                available_weekend_days: pass.available_days,
                weekday_baseline_days: schema.weekday_baseline_days,
                progress_score: pass.progress_score,
                day_details: pass.day_details,
            }),
        }
    }
}

impl AdherenceAlgorithm for WeekendVarianceConfig {
    fn algorithm_type(&self) -> AlgorithmType {
        AlgorithmType::WeekendVariance
    }

    fn evaluate(&self, series: &DailyValueSeries) -> Result<ScoreResult, ScoringError> {
        let required = self.schema.weekday_baseline_days;
        let (baseline, weekday_values) = leading_mean(series, required);

        let baseline = match baseline {
            Some(baseline) if weekday_values.len() >= required => baseline,
            _ => {
                let available = weekday_values.len();
                let empty = WeekendPass {
                    progress_score: 0.0,
                    successful_days: 0,
                    available_days: 0,
                    day_details: Vec::new(),
                };
                return Err(ScoringError::InsufficientData {
                    required,
                    available,
                    partial: Box::new(self.result(0.0, None, weekday_values, empty)),
                });
            }
        };

        let window_end = required + self.schema.weekend_days;
        let mut pass = self.score_weekend(series, baseline, window_end);
        let final_score = pass.progress_score.min(MAX_POTENTIAL);
        debug!(
            baseline,
            successful_weekend_days = pass.successful_days,
            final_score,
            "weekend variance evaluated"
        );

        let mut day_details: Vec<DayDetail> = weekday_values
            .iter()
            .enumerate()
            .map(|(i, value)| DayDetail {
                day: i + 1,
                value: Some(*value),
                baseline: Some(baseline),
                variance: None,
                within_threshold: None,
                score_earned: 0.0,
                is_baseline_day: true,
                missing: false,
            })
            .collect();
        day_details.append(&mut pass.day_details);
        pass.day_details = day_details;

        Ok(self.result(final_score, Some(baseline), weekday_values, pass))
    }

    fn dual_progress(&self, series: &DailyValueSeries, current_day: usize) -> DualProgress {
        let current_day = clamp_day(series, current_day);
        let total_days = series.len();
        let baseline_days = self.schema.weekday_baseline_days;

        // Baseline establishment phase
        if current_day <= baseline_days {
            return DualProgress::new(0.0, MAX_POTENTIAL, current_day, total_days);
        }
        let (Some(baseline), _) = leading_mean(series, baseline_days) else {
            return DualProgress::new(0.0, MAX_POTENTIAL, current_day, total_days);
        };

        let pass = self.score_weekend(series, baseline, current_day);
        DualProgress::new(
            pass.progress_score.min(MAX_POTENTIAL),
            MAX_POTENTIAL,
            current_day,
            total_days,
        )
    }

    fn formula(&self) -> String {
        let schema = &self.schema;
        format!(
            "{} per weekend day with |value - mean(days 1..={})| {} {}, capped at 100",
            schema.weekend_day_weight,
            schema.weekday_baseline_days,
            schema.comparison_operator,
            schema.variance_threshold
        )
    }
}
