//! Baseline consistency scoring
//!
//! The baseline day's value becomes the reference and earns `daily_weight`
//! unconditionally. Every other evaluated day earns `daily_weight` when its distance
//! from the baseline satisfies the variance rule. With `weekdays_only`, days after 5
//! are ignored. The total is capped at `daily_weight * required_days`.

use super::{clamp_day, AdherenceAlgorithm};
use crate::baseline::day_baseline;
use crate::config::BaselineConsistencyConfig;
use crate::error::ScoringError;
use crate::types::{
    AlgorithmType, BaselineConsistencyDetails, DailyValueSeries, DayDetail, DualProgress,
    ScoreDetails, ScoreResult,
};
use tracing::debug;

/// Per-day outcome of a consistency pass
struct ConsistencyPass {
    earned_score: f64,
    successful_days: usize,
    evaluated_days: usize,
    day_details: Vec<DayDetail>,
}

impl BaselineConsistencyConfig {
    /// Observed days up to and including the baseline day
    fn days_through_baseline(&self, series: &DailyValueSeries) -> usize {
        series
            .iter()
            .take(self.schema.baseline_day)
            .flatten()
            .count()
    }

    /// Score days `1..=through_day` (bounded by the evaluation range) against `baseline`
    fn run(
        &self,
        series: &DailyValueSeries,
        baseline: f64,
        through_day: usize,
    ) -> ConsistencyPass {
        let schema = &self.schema;
        let rule = schema.variance_rule();
        let last_day = through_day
            .min(schema.last_evaluated_day())
            .min(series.len());

        let mut pass = ConsistencyPass {
            earned_score: 0.0,
            successful_days: 0,
            evaluated_days: 0,
            day_details: Vec::with_capacity(last_day),
        };

        for day in 1..=last_day {
            if day == schema.baseline_day {
                pass.earned_score += schema.daily_weight;
                pass.successful_days += 1;
                pass.evaluated_days += 1;
                pass.day_details.push(DayDetail {
                    day,
                    value: Some(baseline),
                    baseline: Some(baseline),
                    variance: Some(0.0),
                    within_threshold: Some(true),
                    score_earned: schema.daily_weight,
                    is_baseline_day: true,
                    missing: false,
                });
                continue;
            }

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
            let score_earned = if within { schema.daily_weight } else { 0.0 };
            pass.earned_score += score_earned;
            pass.evaluated_days += 1;
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
        pass: Option<ConsistencyPass>,
    ) -> ScoreResult {
        let schema = &self.schema;
        let pass = pass.unwrap_or(ConsistencyPass {
            earned_score: 0.0,
            successful_days: 0,
            evaluated_days: 0,
            day_details: Vec::new(),
        });
        ScoreResult {
            algorithm: AlgorithmType::BaselineConsistency,
            final_score,
            max_potential_score: schema.max_potential(),
            details: ScoreDetails::BaselineConsistency(BaselineConsistencyDetails {
                baseline_day: schema.baseline_day,
                baseline_value,
                variance_threshold: schema.variance_threshold,
                comparison_operator: schema.comparison_operator,
                weekdays_only: schema.weekdays_only,
                daily_weight: schema.daily_weight,
                successful_days: pass.successful_days,
                total_evaluated_days: pass.evaluated_days,
                required_days: schema.required_days(),
                earned_score: pass.earned_score,
                day_details: pass.day_details,
            }),
        }
    }
}

impl AdherenceAlgorithm for BaselineConsistencyConfig {
    fn algorithm_type(&self) -> AlgorithmType {
        AlgorithmType::BaselineConsistency
    }

    fn evaluate(&self, series: &DailyValueSeries) -> Result<ScoreResult, ScoringError> {
        let required = self.schema.baseline_day;
        let available = self.days_through_baseline(series);

        let baseline = match day_baseline(series, required) {
            Some(baseline) if available >= required => baseline,
            _ => {
                return Err(ScoringError::InsufficientData {
                    required,
                    available,
                    partial: Box::new(self.result(0.0, None, None)),
                });
            }
        };

        let pass = self.run(series, baseline, series.len());
        let final_score = pass.earned_score.min(self.schema.max_potential());
        debug!(
            baseline,
            successful_days = pass.successful_days,
            final_score,
            "baseline consistency evaluated"
        );

        Ok(self.result(final_score, Some(baseline), Some(pass)))
    }

    fn dual_progress(&self, series: &DailyValueSeries, current_day: usize) -> DualProgress {
        let current_day = clamp_day(series, current_day);
        let total_days = series.len();
        let max_potential = self.schema.max_potential();

        if current_day < self.schema.baseline_day {
            return DualProgress::new(0.0, max_potential, current_day, total_days);
        }
        let Some(baseline) = day_baseline(series, self.schema.baseline_day) else {
            return DualProgress::new(0.0, max_potential, current_day, total_days);
        };

        let pass = self.run(series, baseline, current_day);
        DualProgress::new(
            pass.earned_score.min(max_potential),
            max_potential,
            current_day,
            total_days,
        )
    }

    fn formula(&self) -> String {
        let schema = &self.schema;
        format!(
            "{} per day with |value - day {} baseline| {} {}, capped at {}",
            schema.daily_weight,
            schema.baseline_day,
            schema.comparison_operator,
            schema.variance_threshold,
            schema.max_potential()
        )
    }
}
