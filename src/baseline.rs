//! Baseline helpers
//!
//! Baseline-driven algorithms compare each evaluated day against a reference value
//! taken from the same window: either a single designated day or the mean of a run of
//! days. This module holds the shared pieces: baseline extraction and the variance check.

use crate::error::ScoringError;
use crate::types::{ComparisonOperator, DailyValueSeries};

/// Variance rule: `|value - baseline| <op> threshold`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarianceRule {
    pub threshold: f64,
    pub operator: ComparisonOperator,
}

impl VarianceRule {
    pub fn new(threshold: f64, operator: ComparisonOperator) -> Self {
        Self {
            threshold,
            operator,
        }
    }

    /// Reject rules that cannot be evaluated as a variance band
    pub fn validate(&self) -> Result<(), ScoringError> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(ScoringError::invalid(format!(
                "variance_threshold must be a non-negative number, got {}",
                self.threshold
            )));
        }
        if self.operator == ComparisonOperator::Equal {
            return Err(ScoringError::invalid(
                "comparison_operator for variance checks must be one of <=, <, >=, >",
            ));
        }
        Ok(())
    }

    /// Absolute distance from the baseline and whether it satisfies the rule
    pub fn check(&self, value: f64, baseline: f64) -> (f64, bool) {
        let variance = (value - baseline).abs();
        (variance, self.operator.compare(variance, self.threshold))
    }
}

/// Baseline taken from one designated (1-indexed) day
pub fn day_baseline(series: &DailyValueSeries, day: usize) -> Option<f64> {
    series.day(day)
}

/// Baseline as the mean of the observed values in days `1..=days`.
///
/// Returns the mean together with the values it was computed from.
pub fn leading_mean(series: &DailyValueSeries, days: usize) -> (Option<f64>, Vec<f64>) {
    let values: Vec<f64> = series.iter().take(days).flatten().collect();
    (mean(&values), values)
}

/// Arithmetic mean; `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().sum();
    Some(sum / values.len() as f64)
}
