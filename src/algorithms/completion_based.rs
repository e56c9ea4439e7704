//! Completion-based scoring
//!
//! For one-time tasks such as screenings. Each day carries a compliance flag from a
//! calculated metric: a positive value means the task has been done. Once done, the
//! window scores 100 for the rest of the cycle; until then it scores 0 and the task
//! can still be completed while days remain.

use super::{clamp_day, empty_window, AdherenceAlgorithm};
use crate::config::CompletionBasedConfig;
use crate::error::ScoringError;
use crate::types::{
    AlgorithmType, CompletionBasedDetails, CompletionStatus, DailyValueSeries, DualProgress,
    ScoreDetails, ScoreResult,
};

/// Compliance status that marks the task as done
pub const COMPLIANT: &str = "compliant";

const COMPLETED_SCORE: f64 = 100.0;

/// Convert daily compliance statuses into a flag series.
///
/// `compliant` becomes 1, any other status (`overdue`, `due_soon`, ...) becomes 0 and
/// days without a status stay missing.
pub fn status_series(statuses: &[Option<&str>]) -> DailyValueSeries {
    statuses
        .iter()
        .map(|status| {
            status.map(|s| {
                if s.trim().eq_ignore_ascii_case(COMPLIANT) {
                    1.0
                } else {
                    0.0
                }
            })
        })
        .collect::<Vec<_>>()
        .into()
}

impl CompletionBasedConfig {
    /// First 1-indexed day within `through_day` that reports completion
    pub fn completed_on_day(&self, series: &DailyValueSeries, through_day: usize) -> Option<usize> {
        series
            .iter()
            .take(through_day)
            .position(|value| value.is_some_and(|v| v > 0.0))
            .map(|index| index + 1)
    }

    fn result(
        &self,
        completion_status: CompletionStatus,
        completed_on_day: Option<usize>,
        series: &DailyValueSeries,
    ) -> ScoreResult {
        let final_score = match completion_status {
            CompletionStatus::Completed => COMPLETED_SCORE,
            CompletionStatus::Pending | CompletionStatus::NotCompleted => 0.0,
        };
        ScoreResult {
            algorithm: AlgorithmType::CompletionBased,
            final_score,
            max_potential_score: COMPLETED_SCORE,
            details: ScoreDetails::CompletionBased(CompletionBasedDetails {
                calculated_metric: self.calculated_metric.clone(),
                completion_status,
                completed_on_day,
                total_days_evaluated: series.len(),
            }),
        }
    }
}

impl AdherenceAlgorithm for CompletionBasedConfig {
    fn algorithm_type(&self) -> AlgorithmType {
        AlgorithmType::CompletionBased
    }

    fn evaluate(&self, series: &DailyValueSeries) -> Result<ScoreResult, ScoringError> {
        if series.is_empty() {
            return Err(empty_window(self.result(
                CompletionStatus::Pending,
                None,
                series,
            )));
        }

        let completed_on_day = self.completed_on_day(series, series.len());
        let status = if completed_on_day.is_some() {
            CompletionStatus::Completed
        } else {
            CompletionStatus::NotCompleted
        };
        Ok(self.result(status, completed_on_day, series))
    }

    fn dual_progress(&self, series: &DailyValueSeries, current_day: usize) -> DualProgress {
        let current_day = clamp_day(series, current_day);
        let total_days = series.len();
        if current_day == 0 {
            return DualProgress::new(0.0, COMPLETED_SCORE, 0, total_days);
        }

        if self.completed_on_day(series, current_day).is_some() {
            return DualProgress::new(COMPLETED_SCORE, COMPLETED_SCORE, current_day, total_days);
        }
        // Still overdue on the last day of the cycle
        let potential = if current_day >= total_days {
            0.0
        } else {
            COMPLETED_SCORE
        };
        DualProgress::new(0.0, potential, current_day, total_days)
    }

    fn formula(&self) -> String {
        "100 once completed within the cycle, else 0".to_string()
    }
}
